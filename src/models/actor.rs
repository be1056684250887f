// src/models/actor.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three roles the portal knows. Instructors and admins bypass every
/// gate; students are subject to enrollment and progress checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }

    /// Staff roles receive an unconditional `Allow` from every gate.
    pub fn bypasses_gates(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The already-authenticated identity on the current request. The engine
/// never authenticates; it only consumes what the identity middleware
/// extracted from the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles_bypass_gates() {
        assert!(!Role::Student.bypasses_gates());
        assert!(Role::Instructor.bypasses_gates());
        assert!(Role::Admin.bypasses_gates());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Student, Role::Instructor, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
