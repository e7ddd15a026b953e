//! Role hierarchy for dashboard authorization display.
//!
//! Roles serialize as `snake_case` strings matching the auth service wire
//! format. The hierarchy is strictly ordered: `super_admin` grants everything
//! `admin` does, which grants everything `editor` does, which grants
//! everything `viewer` does. Ordering derives from declaration order, so new
//! roles must be inserted in rank position.
//!
//! These predicates are display-layer derivations only — the auth service
//! remains authoritative for permission enforcement.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's role, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Viewer,
    Editor,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Whether this role grants at least the privileges of `required`.
    #[must_use]
    pub fn grants(self, required: Self) -> bool {
        self >= required
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
