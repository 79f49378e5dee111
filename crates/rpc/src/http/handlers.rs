//! API request handlers
//!
//! The engine does blocking file and database I/O, so each handler moves its
//! work onto the blocking pool.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use onbehalf_audit::AuditQuery;
use onbehalf_claims::{ClaimProcess, StateMachine};
use onbehalf_core::StaffIdentity;
use onbehalf_engine::{ActionOutcome, EngineResult, ReviewDecision};
use serde_json::{json, Value};
use std::sync::Arc;

use super::dto::{
    parse_field, ActionBody, AuditLogQuery, ClaimDraftBody, ClaimMaterialBody, CorrectDataBody,
    OperatorFields, PendingReviewsQuery, ProcessAdvanceBody, QueryUnderwritingBody,
    ResendAuthCodeBody, ReviewConfirmBody, SubmitClaimBody, SubstituteAuthBody,
    SubstitutePaymentBody, SubstituteSurrenderBody, UploadMaterialBody,
};
use super::error::ApiError;
use crate::context::AppContext;

pub type ApiResult = Result<Json<Value>, ApiError>;
type Ctx = State<Arc<AppContext>>;

async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn run_action<B: ActionBody>(
    ctx: Arc<AppContext>,
    payload: Result<Json<B>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let outcome = blocking(move || {
        let role = body.operator().role()?;
        let operator = ctx.resolve_staff(&body.operator().operator_id, role)?;
        let request = body.into_request()?;
        ctx.executor.execute(&operator, request)
    })
    .await?;

    Ok(Json(outcome_body(&outcome)))
}

fn outcome_body(outcome: &ActionOutcome) -> Value {
    let mut body = serde_json::to_value(outcome).unwrap_or_else(|_| json!({}));
    body["success"] = json!(true);
    body
}

fn process_body(process: &ClaimProcess) -> Value {
    json!({
        "success": true,
        "process": process,
        "description": process.description(),
        "hint": process.hint(),
        "allowedActions": process.state.allowed_actions(),
    })
}

// === Health ===

pub async fn health(State(ctx): Ctx) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "auditEntries": ctx.ledger.len(),
    }))
}

// === Privileged actions ===

pub async fn resend_auth_code(
    State(ctx): Ctx,
    payload: Result<Json<ResendAuthCodeBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn query_underwriting(
    State(ctx): Ctx,
    payload: Result<Json<QueryUnderwritingBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn substitute_auth(
    State(ctx): Ctx,
    payload: Result<Json<SubstituteAuthBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn upload_material(
    State(ctx): Ctx,
    payload: Result<Json<UploadMaterialBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn correct_data(
    State(ctx): Ctx,
    payload: Result<Json<CorrectDataBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn submit_claim(
    State(ctx): Ctx,
    payload: Result<Json<SubmitClaimBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn substitute_payment(
    State(ctx): Ctx,
    payload: Result<Json<SubstitutePaymentBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

pub async fn substitute_surrender(
    State(ctx): Ctx,
    payload: Result<Json<SubstituteSurrenderBody>, JsonRejection>,
) -> ApiResult {
    run_action(ctx, payload).await
}

// === Review ===

pub async fn pending_reviews(
    State(ctx): Ctx,
    query: Result<Query<PendingReviewsQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let reviews = blocking(move || Ok(ctx.reviews.list_pending(&query.reviewer_id))).await?;

    Ok(Json(json!({
        "success": true,
        "total": reviews.len(),
        "reviews": reviews,
    })))
}

pub async fn review_confirm(
    State(ctx): Ctx,
    payload: Result<Json<ReviewConfirmBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let entry = blocking(move || {
        let role = parse_field("reviewerRole", &body.reviewer_role)?;
        let reviewer = ctx.resolve_staff(&body.reviewer_id, role)?;
        let decision = ReviewDecision::from_flag(body.approved, body.reject_reason);
        ctx.reviews.confirm(&reviewer, &body.audit_log_id, decision)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "auditLogId": entry.id,
        "reviewStatus": entry.review_status,
        "entry": entry,
    })))
}

// === Audit log ===

pub async fn audit_log(
    State(ctx): Ctx,
    query: Result<Query<AuditLogQuery>, QueryRejection>,
) -> ApiResult {
    let Query(params) = query?;

    let (logs, total) = blocking(move || {
        let mut query = AuditQuery::new(ctx.config.query_limit(params.limit));
        if let Some(target) = params.target_id.or(params.proposal_id) {
            query = query.target(target);
        }
        if let Some(operator) = params.operator_id {
            query = query.operator(operator);
        }
        Ok((ctx.ledger.query(&query), ctx.ledger.count(&query)))
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "logs": logs,
        "total": total,
    })))
}

// === Claims ===

fn resolve(ctx: &AppContext, operator: &OperatorFields) -> EngineResult<StaffIdentity> {
    ctx.resolve_staff(&operator.operator_id, operator.role()?)
}

pub async fn create_claim_draft(
    State(ctx): Ctx,
    payload: Result<Json<ClaimDraftBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let claim = blocking(move || {
        let actor = resolve(&ctx, &body.operator)?;
        ctx.desk.create_draft(&actor, body.draft())
    })
    .await?;

    Ok(Json(json!({ "success": true, "claim": claim })))
}

pub async fn mark_claim_ready(
    State(ctx): Ctx,
    Path(claim_id): Path<String>,
    payload: Result<Json<OperatorFields>, JsonRejection>,
) -> ApiResult {
    let Json(operator) = payload?;

    let claim = blocking(move || {
        let actor = resolve(&ctx, &operator)?;
        ctx.desk.mark_ready(&claim_id, &actor)
    })
    .await?;

    Ok(Json(json!({ "success": true, "claim": claim })))
}

pub async fn submit_claim_draft(
    State(ctx): Ctx,
    Path(claim_id): Path<String>,
    payload: Result<Json<OperatorFields>, JsonRejection>,
) -> ApiResult {
    let Json(operator) = payload?;

    let (claim, process) = blocking(move || {
        let actor = resolve(&ctx, &operator)?;
        ctx.desk.submit(&claim_id, &actor)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "claim": claim,
        "process": process,
        "description": process.description(),
        "hint": process.hint(),
    })))
}

pub async fn attach_claim_material(
    State(ctx): Ctx,
    Path(claim_id): Path<String>,
    payload: Result<Json<ClaimMaterialBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let claim = blocking(move || {
        let actor = resolve(&ctx, &body.operator)?;
        ctx.desk
            .attach_material(&claim_id, &body.material_type, body.note, &actor)
    })
    .await?;

    Ok(Json(json!({ "success": true, "claim": claim })))
}

pub async fn get_claim(State(ctx): Ctx, Path(claim_id): Path<String>) -> ApiResult {
    let claim = blocking(move || ctx.desk.get_claim(&claim_id)).await?;

    Ok(Json(json!({
        "success": true,
        "claim": claim,
        "allowedActions": claim.state.allowed_actions(),
    })))
}

pub async fn advance_claim_process(
    State(ctx): Ctx,
    Path(process_id): Path<String>,
    payload: Result<Json<ProcessAdvanceBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;

    let process = blocking(move || {
        let actor = resolve(&ctx, &body.operator)?;
        let to = body.target_state()?;
        ctx.desk.advance_process(
            &process_id,
            to,
            &body.action,
            &actor,
            body.note,
            body.required_materials,
        )
    })
    .await?;

    Ok(Json(process_body(&process)))
}

pub async fn get_claim_process(State(ctx): Ctx, Path(process_id): Path<String>) -> ApiResult {
    let process = blocking(move || ctx.desk.get_process(&process_id)).await?;
    Ok(Json(process_body(&process)))
}
