//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::context::AppContext;

pub fn create_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))

        // Privileged actions
        .route("/admin/resend-auth-code", post(handlers::resend_auth_code))
        .route("/admin/query-underwriting", post(handlers::query_underwriting))
        .route("/admin/substitute-auth", post(handlers::substitute_auth))
        .route("/admin/upload-material", post(handlers::upload_material))
        .route("/admin/correct-data", post(handlers::correct_data))
        .route("/admin/submit-claim", post(handlers::submit_claim))
        .route("/admin/substitute-payment", post(handlers::substitute_payment))
        .route("/admin/substitute-surrender", post(handlers::substitute_surrender))

        // Review and audit
        .route("/admin/pending-reviews", get(handlers::pending_reviews))
        .route("/admin/review-confirm", post(handlers::review_confirm))
        .route("/admin/audit-log", get(handlers::audit_log))

        // Claims
        .route("/claims/draft", post(handlers::create_claim_draft))
        .route("/claims/:id", get(handlers::get_claim))
        .route("/claims/:id/ready", post(handlers::mark_claim_ready))
        .route("/claims/:id/submit", post(handlers::submit_claim_draft))
        .route("/claims/:id/materials", post(handlers::attach_claim_material))
        .route("/claim-processes/:id", get(handlers::get_claim_process))
        .route("/claim-processes/:id/advance", post(handlers::advance_claim_process))

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
