//! # tide-core
//!
//! Core identity types for Tidegate.
//!
//! This crate provides the data types shared across all Tidegate crates:
//! - `UserProfile`: the denormalized user snapshot attached to a session
//! - `Role`: the ordered permission hierarchy and its predicates
//!
//! No I/O, no auth logic — only data fields and pure derivations.

pub mod identity;
pub mod roles;

pub use identity::UserProfile;
pub use roles::Role;
