//! OnBehalf RPC - HTTP API and CLI orchestrator
//!
//! The HTTP layer is a thin shell: it parses string fields into the engine's
//! closed enumerations, resolves the calling staff member, and maps engine
//! errors onto status codes.

pub mod commands;
pub mod config;
pub mod context;
pub mod http;

pub use config::ServerConfig;
pub use context::AppContext;
pub use http::{create_router, serve};
