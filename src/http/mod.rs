//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, tracing, timeout, body limit, metrics)
//!     → /api/chat, /api/contact: CORS → origin guard → rate limit
//!     → handlers.rs (parse body, call the forwarder)
//!     → forward::ApiError renders failures as fixed JSON envelopes
//!     → Send to client
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
