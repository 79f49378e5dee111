//! Fixture loading

use onbehalf_core::{TargetRef, TargetType};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::repository::TargetRepository;

/// Fixture section name, record type and the field holding the record id
const SECTIONS: [(&str, TargetType, &str); 5] = [
    ("proposals", TargetType::Proposal, "proposalId"),
    ("policies", TargetType::Policy, "policyNo"),
    ("customers", TargetType::Customer, "customerId"),
    ("claims", TargetType::Claim, "claimId"),
    ("claimProcesses", TargetType::ClaimProcess, "processId"),
];

/// What a seed run wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: usize,
    /// Records that already existed and were left untouched
    pub skipped: usize,
}

/// Insert fixture records that do not exist yet.
///
/// ```json
/// {"proposals": [{"proposalId": "P-1", ...}], "policies": [{"policyNo": "6500001", ...}]}
/// ```
///
/// Each record needs its id field (or a plain `id`). Missing sections are fine.
pub fn seed(repo: &dyn TargetRepository, fixtures: &Value) -> StoreResult<SeedReport> {
    let root = fixtures
        .as_object()
        .ok_or_else(|| StoreError::InvalidFixture("fixtures must be a JSON object".into()))?;

    let mut report = SeedReport::default();

    for (section, target_type, id_field) in SECTIONS {
        let Some(items) = root.get(section) else {
            continue;
        };
        let items = items
            .as_array()
            .ok_or_else(|| StoreError::InvalidFixture(format!("'{section}' must be an array")))?;

        for item in items {
            let id = item
                .get(id_field)
                .or_else(|| item.get("id"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    StoreError::InvalidFixture(format!("record in '{section}' lacks '{id_field}'"))
                })?;
            let target = TargetRef::new(target_type, id);

            if repo.get(&target)?.is_some() {
                report.skipped += 1;
                continue;
            }
            repo.put_if_version(&target, None, item.clone())?;
            report.inserted += 1;
        }
    }

    info!(inserted = report.inserted, skipped = report.skipped, "fixtures seeded");
    Ok(report)
}
