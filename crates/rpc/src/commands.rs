//! CLI commands

use onbehalf_audit::{AuditLogEntry, AuditQuery};
use onbehalf_core::TargetType;
use std::path::Path;
use strum::IntoEnumIterator;

use crate::context::AppContext;

/// Load fixture records into the target store
pub fn seed(ctx: &AppContext, file: &Path) -> Result<(), anyhow::Error> {
    let content = std::fs::read_to_string(file)?;
    let fixtures: serde_json::Value = serde_json::from_str(&content)?;

    let report = onbehalf_store::seed(ctx.repo.as_ref(), &fixtures)?;

    println!(
        "✅ Seeded {} records ({} already present)",
        report.inserted, report.skipped
    );
    Ok(())
}

/// Verify the audit ledger hash chain
pub fn audit_verify(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let records = ctx.ledger.verify()?;

    println!("✅ Audit ledger verified: {} records, chain intact", records);
    Ok(())
}

/// List audit entries, newest first
pub fn audit_list(
    ctx: &AppContext,
    target: Option<String>,
    operator: Option<String>,
    limit: Option<usize>,
) -> Result<(), anyhow::Error> {
    let mut query = AuditQuery::new(ctx.config.query_limit(limit));
    if let Some(target) = target {
        query = query.target(target);
    }
    if let Some(operator) = operator {
        query = query.operator(operator);
    }

    let entries = ctx.ledger.query(&query);
    println!(
        "📜 Audit log ({} of {} matching entries)",
        entries.len(),
        ctx.ledger.count(&query)
    );
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

/// Entries awaiting one reviewer
pub fn reviews_pending(ctx: &AppContext, reviewer: &str) -> Result<(), anyhow::Error> {
    let pending = ctx.reviews.list_pending(reviewer);

    if pending.is_empty() {
        println!("No reviews pending for {}", reviewer);
        return Ok(());
    }

    println!("⏳ {} review(s) pending for {}", pending.len(), reviewer);
    for entry in &pending {
        print_entry(entry);
    }
    Ok(())
}

/// Entries pending longer than `hours` (or the configured threshold)
pub fn reviews_stale(ctx: &AppContext, hours: Option<i64>) -> Result<(), anyhow::Error> {
    let stale = match hours {
        Some(hours) => ctx
            .reviews
            .list_pending_older_than(chrono::Duration::hours(hours)),
        None => ctx.reviews.list_stale(),
    };

    if stale.is_empty() {
        println!("✅ No stale reviews");
        return Ok(());
    }

    println!("⚠️  {} stale review(s)", stale.len());
    for entry in &stale {
        print_entry(entry);
    }
    Ok(())
}

/// Ledger and store summary
pub fn stats(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let stats = ctx.ledger.stats();

    println!("📊 Audit ledger");
    println!("   Entries:   {}", stats.total);
    println!("   Immediate: {}", stats.immediate);
    println!("   Pending:   {}", stats.pending);
    println!("   Approved:  {}", stats.approved);
    println!("   Rejected:  {}", stats.rejected);
    println!("   Records:   {}", ctx.ledger.last_sequence());

    println!("🗂️  Target store");
    for target_type in TargetType::iter() {
        println!("   {:<14} {}", target_type, ctx.repo.list(target_type)?.len());
    }
    Ok(())
}

fn print_entry(entry: &AuditLogEntry) {
    println!(
        "   {} | {} | {} {} | {}:{} | {} | {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        entry.id,
        entry.operator_id,
        entry.operator_role,
        entry.target_type,
        entry.target_id,
        entry.action,
        entry.review_status,
    );
}
