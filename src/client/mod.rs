//! Browser-side controllers, runnable against any [`GatewayTransport`].
//!
//! # Data Flow
//! ```text
//! visitor action
//!     → chat.rs / form.rs (tagged state + pure transition)
//!     → validation.rs (form only: batch checks, sanitization)
//!     → transport.rs (same-origin call with deadline and cancellation)
//!     → outcome event → next state
//! ```
//!
//! # Design Decisions
//! - One network call in flight per controller; `submit` holds `&mut self`
//! - No automatic retries

pub mod chat;
pub mod form;
pub mod transport;
pub mod validation;

pub use chat::{ChatFailure, ChatSession, ChatSessionController, ChatState};
pub use form::{FormState, FormSubmissionController, SubmissionAttemptCounter};
pub use transport::{GatewayTransport, HttpGateway, TransportError};
pub use validation::{ContactFields, Field, FieldErrors};
