//! Role model for write operations
//!
//! Roles are assigned outside this crate; here they are only parsed and checked.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::SalesError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Data loader: manual entry only
    Cargador,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cargador => "cargador",
            Role::Viewer => "viewer",
        }
    }

    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::BulkImport => *self == Role::Admin,
            Action::ManualEntry => matches!(self, Role::Admin | Role::Cargador),
            Action::ViewReports => true,
        }
    }
}

impl FromStr for Role {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "cargador" => Ok(Role::Cargador),
            "viewer" => Ok(Role::Viewer),
            _ => Err(SalesError::ParseError(format!(
                "unknown role: '{}' (admin, cargador, viewer)",
                s
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    BulkImport,
    ManualEntry,
    ViewReports,
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::BulkImport => "bulk import sales",
            Action::ManualEntry => "add sales manually",
            Action::ViewReports => "view reports",
        }
    }
}

pub fn authorize(role: Role, action: Action) -> Result<(), SalesError> {
    if role.can(action) {
        Ok(())
    } else {
        Err(SalesError::AuthorizationDenied {
            role: role.to_string(),
            action: action.describe().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_imports() {
        assert!(authorize(Role::Admin, Action::BulkImport).is_ok());
        assert!(authorize(Role::Cargador, Action::BulkImport).is_err());
        assert!(authorize(Role::Viewer, Action::BulkImport).is_err());
    }

    #[test]
    fn loaders_can_add_manually() {
        assert!(authorize(Role::Admin, Action::ManualEntry).is_ok());
        assert!(authorize(Role::Cargador, Action::ManualEntry).is_ok());
        let err = authorize(Role::Viewer, Action::ManualEntry).unwrap_err();
        assert_eq!(
            err.to_string(),
            "role 'viewer' is not allowed to add sales manually"
        );
    }

    #[test]
    fn everyone_reads() {
        for role in [Role::Admin, Role::Cargador, Role::Viewer] {
            assert!(role.can(Action::ViewReports));
        }
    }

    #[test]
    fn role_names_parse_case_insensitively() {
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("CARGADOR".parse::<Role>().unwrap(), Role::Cargador);
        assert!("owner".parse::<Role>().is_err());
    }
}
