//! Role model.
//!
//! Roles form a small closed hierarchy. Each role carries the set of roles it
//! may act as; that set is embedded into access tokens and trusted by
//! downstream authorization, so it must never grow past the caller's own role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Role assigned to users created on first login.
    pub const DEFAULT: Role = Role::Student;

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    /// Roles this role may assert, least privileged first.
    pub fn allowed_roles(self) -> Vec<Role> {
        match self {
            Role::Student => vec![Role::Student],
            Role::Admin => vec![Role::Student, Role::Admin],
        }
    }

    pub fn allowed_role_names(self) -> Vec<String> {
        self.allowed_roles()
            .into_iter()
            .map(|role| role.as_str().to_string())
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
