//! Versioned records

use chrono::{DateTime, Utc};
use onbehalf_core::TargetRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored record and the version it was read at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord {
    pub target: TargetRef,
    /// Starts at 1, bumped by every successful write
    pub version: u64,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

impl VersionedRecord {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// String value of a field, if present and a string
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn object(&self) -> Option<&Map<String, Value>> {
        self.data.as_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_access() {
        let record = VersionedRecord {
            target: TargetRef::proposal("P-1"),
            version: 1,
            data: json!({"paymentStatus": "UNPAID", "premium": 1200}),
            updated_at: Utc::now(),
        };

        assert_eq!(record.str_field("paymentStatus"), Some("UNPAID"));
        assert_eq!(record.str_field("premium"), None);
        assert_eq!(record.field("premium"), Some(&json!(1200)));
        assert!(record.field("missing").is_none());
    }
}
