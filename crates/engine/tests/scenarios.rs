//! End-to-end scenarios over an on-disk ledger and SQLite store

use onbehalf_audit::{AuditLedger, AuditQuery};
use onbehalf_core::{
    ReviewStatus, Role, StaffIdentity, SurrenderReason, TargetRef, VerificationMethod,
};
use onbehalf_engine::{
    ActionRequest, EngineConfig, EngineError, PowerActionExecutor, ReviewDecision, ReviewQueue,
};
use onbehalf_store::{SqliteRepository, TargetRepository};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    ledger: Arc<AuditLedger>,
    repo: Arc<SqliteRepository>,
    executor: PowerActionExecutor,
    reviews: ReviewQueue,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::default();
    let ledger = Arc::new(
        AuditLedger::open(dir.path().join("audit/ledger.jsonl"), config.ledger_policy()).unwrap(),
    );
    let repo = Arc::new(SqliteRepository::new(dir.path().join("state.db")).unwrap());

    repo.put_if_version(
        &TargetRef::proposal("P-100"),
        None,
        json!({
            "proposalId": "P-100",
            "mobile": "13800138000",
            "authStatus": "PENDING",
            "paymentStatus": "UNPAID",
            "premium": "5000",
        }),
    )
    .unwrap();
    repo.put_if_version(
        &TargetRef::policy("6500001"),
        None,
        json!({"policyNo": "6500001", "status": "ACTIVE", "holderName": "张三"}),
    )
    .unwrap();

    let executor = PowerActionExecutor::new(ledger.clone(), repo.clone(), config.clone());
    let reviews = ReviewQueue::new(ledger.clone(), repo.clone(), config);

    Harness {
        _dir: dir,
        ledger,
        repo,
        executor,
        reviews,
    }
}

fn operator_a() -> StaffIdentity {
    StaffIdentity::new("A", "操作员A", Role::L3)
}

fn reviewer_b() -> StaffIdentity {
    StaffIdentity::new("B", "复核员B", Role::L2)
}

fn payment(reviewer: &str) -> ActionRequest {
    ActionRequest::SubstitutePayment {
        proposal_id: "P-100".into(),
        amount: dec!(5000),
        payment_method: "BANK_TRANSFER".into(),
        evidence_url: "https://files.example.com/auth/p100.mp3".into(),
        reason: "客户授权代为缴纳首期保费".into(),
        reviewer_id: reviewer.into(),
    }
}

fn proposal_data(h: &Harness) -> serde_json::Value {
    h.repo.require(&TargetRef::proposal("P-100")).unwrap().data
}

#[test]
fn l1_completes_authentication_immediately() {
    let h = harness();

    let outcome = h
        .executor
        .execute(
            &StaffIdentity::new("S001", "李专员", Role::L1),
            ActionRequest::CompleteAuthentication {
                proposal_id: "P-100".into(),
                verification_method: VerificationMethod::Phone,
                reason: "帮助客户完成身份验证".into(),
            },
        )
        .unwrap();

    let entry = h.ledger.get(&outcome.audit_log_id).unwrap();
    assert_eq!(entry.review_status, ReviewStatus::None);
    assert_eq!(entry.verification_method, Some(VerificationMethod::Phone));
    assert_eq!(proposal_data(&h)["authStatus"], "VERIFIED");
}

#[test]
fn second_payment_conflicts_while_first_is_pending() {
    let h = harness();

    let first = h.executor.execute(&operator_a(), payment("B")).unwrap();
    assert_eq!(first.review_status, ReviewStatus::Pending);

    let other = StaffIdentity::new("C", "操作员C", Role::L3);
    let second = h.executor.execute(&other, payment("B"));
    assert!(matches!(second, Err(EngineError::Conflict(_))));

    let entries = h.ledger.query(&AuditQuery::new(10).target("P-100"));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, first.audit_log_id);
}

#[test]
fn rejection_leaves_proposal_exactly_as_before() {
    let h = harness();
    let before = proposal_data(&h);

    let staged = h.executor.execute(&operator_a(), payment("B")).unwrap();
    assert_eq!(proposal_data(&h), before);

    let entry = h
        .reviews
        .confirm(
            &reviewer_b(),
            &staged.audit_log_id,
            ReviewDecision::Reject {
                reason: Some("凭证不充分".into()),
            },
        )
        .unwrap();

    assert_eq!(entry.review_status, ReviewStatus::Rejected);
    assert_eq!(entry.reject_reason.as_deref(), Some("凭证不充分"));
    assert_eq!(proposal_data(&h), before);
    assert_eq!(h.repo.require(&TargetRef::proposal("P-100")).unwrap().version, 1);
}

#[test]
fn approval_commits_and_second_decision_fails() {
    let h = harness();
    let staged = h.executor.execute(&operator_a(), payment("B")).unwrap();

    h.reviews
        .confirm(&reviewer_b(), &staged.audit_log_id, ReviewDecision::Approve)
        .unwrap();
    let committed = proposal_data(&h);
    assert_eq!(committed["paymentStatus"], "PAID");
    assert_eq!(committed["paidAmount"], "5000");

    let again = h.reviews.confirm(
        &reviewer_b(),
        &staged.audit_log_id,
        ReviewDecision::Reject { reason: None },
    );
    assert!(matches!(again, Err(EngineError::ReviewState(_))));
    assert_eq!(
        h.ledger.get(&staged.audit_log_id).unwrap().review_status,
        ReviewStatus::Approved
    );
    assert_eq!(proposal_data(&h), committed);
}

#[test]
fn approved_surrender_terminates_the_policy() {
    let h = harness();
    let staged = h
        .executor
        .execute(
            &operator_a(),
            ActionRequest::SubstituteSurrender {
                policy_id: "6500001".into(),
                surrender_reason: SurrenderReason::FinancialHardship,
                refund_amount: Some(dec!(12000)),
                evidence_url: "https://files.example.com/auth/6500001.pdf".into(),
                reason: "客户书面申请退保并授权代办".into(),
                reviewer_id: "B".into(),
            },
        )
        .unwrap();
    let surrender_id = staged.surrender_id.clone().unwrap();

    let policy = || h.repo.require(&TargetRef::policy("6500001")).unwrap().data;
    assert_eq!(policy()["status"], "ACTIVE");

    let entry = h
        .reviews
        .confirm(&reviewer_b(), &staged.audit_log_id, ReviewDecision::Approve)
        .unwrap();
    assert_eq!(entry.review_status, ReviewStatus::Approved);

    let surrendered = policy();
    assert_eq!(surrendered["status"], "SURRENDERED");
    assert_eq!(surrendered["surrenderId"], surrender_id.as_str());
    assert_eq!(surrendered["refundAmount"], "12000");
    assert_eq!(surrendered["surrenderedBy"], "A");
    assert_eq!(surrendered["holderName"], "张三");
}

#[test]
fn cs_cannot_substitute_payment() {
    let h = harness();

    let result = h
        .executor
        .execute(&StaffIdentity::new("C001", "客服", Role::Cs), payment("B"));

    assert!(matches!(result, Err(EngineError::Authorization(_))));
    assert!(h.ledger.query(&AuditQuery::new(10).target("P-100")).is_empty());
}

#[test]
fn guarantee_action_proceeds_while_payment_is_pending() {
    let h = harness();
    let staged = h.executor.execute(&operator_a(), payment("B")).unwrap();

    h.executor
        .execute(
            &StaffIdentity::new("S001", "李专员", Role::L1),
            ActionRequest::CompleteAuthentication {
                proposal_id: "P-100".into(),
                verification_method: VerificationMethod::InPerson,
                reason: "客户到柜面完成身份核验".into(),
            },
        )
        .unwrap();

    h.reviews
        .confirm(&reviewer_b(), &staged.audit_log_id, ReviewDecision::Approve)
        .unwrap();

    let data = proposal_data(&h);
    assert_eq!(data["authStatus"], "VERIFIED");
    assert_eq!(data["paymentStatus"], "PAID");
}

#[test]
fn racing_reviews_have_one_outcome() {
    let h = Arc::new(harness());
    let staged = h.executor.execute(&operator_a(), payment("B")).unwrap();

    let handles: Vec<_> = [true, false, true, false]
        .into_iter()
        .map(|approved| {
            let h = Arc::clone(&h);
            let id = staged.audit_log_id.clone();
            thread::spawn(move || {
                h.reviews
                    .confirm(&reviewer_b(), &id, ReviewDecision::from_flag(approved, None))
                    .map(|entry| entry.review_status)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, EngineError::ReviewState(_))));

    let paid = proposal_data(&h)["paymentStatus"] == "PAID";
    match winners[0] {
        ReviewStatus::Approved => assert!(paid),
        ReviewStatus::Rejected => assert!(!paid),
        other => panic!("unexpected status {other}"),
    }
}

#[test]
fn reviewed_entries_never_name_their_operator() {
    let h = harness();
    h.executor.execute(&operator_a(), payment("B")).unwrap();
    let _ = h.executor.execute(&operator_a(), payment("A"));

    for entry in h.ledger.query(&AuditQuery::new(100)) {
        if entry.review_status != ReviewStatus::None {
            assert_ne!(entry.reviewer_id.as_deref(), Some(entry.operator_id.as_str()));
        }
    }
}

#[test]
fn ledger_survives_restart_with_pending_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let config = EngineConfig::default();
    let repo = Arc::new(SqliteRepository::new(dir.path().join("state.db")).unwrap());
    repo.put_if_version(
        &TargetRef::proposal("P-100"),
        None,
        json!({"proposalId": "P-100", "paymentStatus": "UNPAID"}),
    )
    .unwrap();

    let audit_log_id = {
        let ledger = Arc::new(AuditLedger::open(&path, config.ledger_policy()).unwrap());
        let executor = PowerActionExecutor::new(ledger, repo.clone(), config.clone());
        executor.execute(&operator_a(), payment("B")).unwrap().audit_log_id
    };

    let ledger = Arc::new(AuditLedger::open(&path, config.ledger_policy()).unwrap());
    let reviews = ReviewQueue::new(ledger.clone(), repo.clone(), config);
    assert_eq!(reviews.list_pending("B").len(), 1);

    reviews
        .confirm(&reviewer_b(), &audit_log_id, ReviewDecision::Approve)
        .unwrap();
    assert_eq!(
        repo.require(&TargetRef::proposal("P-100")).unwrap().str_field("paymentStatus"),
        Some("PAID")
    );
    assert_eq!(ledger.verify().unwrap(), 2);
}
