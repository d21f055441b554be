//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay PORT and provider secrets from the environment)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → each subsystem clones the sections it needs at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets only ever come from the environment

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    CompletionConfig, CorsConfig, EmailConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, SecretsConfig, WindowPolicy,
};
