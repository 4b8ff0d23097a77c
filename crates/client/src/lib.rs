//! HTTP access to the product backend.
//!
//! [`PainelApi`] talks to the meta-object, aggregation, dashboard and
//! published-widget endpoints and implements the service traits from
//! [`painel_core::services`], so the domain crate never sees HTTP.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
mod gateway;

pub use api::PainelApi;
pub use config::ClientConfig;
pub use credentials::{Anonymous, CredentialsProvider, EnvToken, StaticToken};
pub use error::ClientError;
