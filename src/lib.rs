//! Lead-generation site gateway library.
//!
//! Server side: rate-limited, origin-checked proxy endpoints that hold the
//! completion and email provider credentials. Client side: the chat widget
//! and lead-capture form controllers that call those endpoints.

pub mod client;
pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod protocol;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
