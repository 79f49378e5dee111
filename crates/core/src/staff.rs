//! Staff identities

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::CoreError;
use crate::role::Role;

/// An authenticated staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffIdentity {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl StaffIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// Identity known only by id and claimed role (no roster configured)
    pub fn anonymous(id: impl Into<String>, role: Role) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            role,
        }
    }
}

/// Known staff members, keyed by id
#[derive(Debug, Clone, Default)]
pub struct StaffRoster {
    staff: HashMap<String, StaffIdentity>,
}

impl StaffRoster {
    pub fn new(members: impl IntoIterator<Item = StaffIdentity>) -> Result<Self, CoreError> {
        let mut staff = HashMap::new();
        for member in members {
            if member.id.trim().is_empty() {
                return Err(CoreError::InvalidRoster("empty staff id".to_string()));
            }
            if staff.contains_key(&member.id) {
                return Err(CoreError::DuplicateStaff(member.id));
            }
            staff.insert(member.id.clone(), member);
        }
        Ok(Self { staff })
    }

    /// Parse a JSON array of `{id, name, role}`
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let members: Vec<StaffIdentity> =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidRoster(e.to_string()))?;
        Self::new(members)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::InvalidRoster(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn get(&self, id: &str) -> Option<&StaffIdentity> {
        self.staff.get(id)
    }

    pub fn len(&self) -> usize {
        self.staff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_from_json() {
        let json = r#"[
            {"id": "S001", "name": "Wang", "role": "L3"},
            {"id": "S002", "name": "Li", "role": "L2"}
        ]"#;
        let roster = StaffRoster::from_json(json).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("S001").unwrap().role, Role::L3);
        assert!(roster.get("S999").is_none());
    }

    #[test]
    fn test_roster_rejects_duplicates() {
        let result = StaffRoster::new(vec![
            StaffIdentity::new("S001", "A", Role::L1),
            StaffIdentity::new("S001", "B", Role::L2),
        ]);
        assert_eq!(result.unwrap_err(), CoreError::DuplicateStaff("S001".to_string()));
    }

    #[test]
    fn test_roster_rejects_unknown_role() {
        let json = r#"[{"id": "S001", "name": "Wang", "role": "ADMIN"}]"#;
        assert!(matches!(
            StaffRoster::from_json(json),
            Err(CoreError::InvalidRoster(_))
        ));
    }
}
