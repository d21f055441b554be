//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming API request:
//!     → cors.rs (preflight answers, foreign Origin → 403)
//!     → rate_limit.rs (per-client fixed window → 429)
//!     → Pass to forwarder
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input, including X-Forwarded-For unless configured

pub mod cors;
pub mod rate_limit;

pub use cors::{origin_guard, OriginAllowList};
pub use rate_limit::{rate_limit_middleware, Admission, EndpointCategory, RateLimitGate, RateLimiter};
