//! HTTP surface of the bot
//!
//! Serves the signed Discord interactions webhook, a health check and,
//! unless disabled, the stand-in `/verify` endpoint.

mod interactions;
mod server;
mod signature;
mod verify_stub;

pub use server::{build_router, start_web_server, AppState, WebServerConfig};
