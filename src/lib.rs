//! A Kerberos v5 mechanism provider that stands in for the platform's own.
//!
//! The [`Provider`](provider::Provider) puts itself at the top of a mechanism registry and hands out
//! names, credentials and contexts that delegate to a [`MechanismEngine`](engine::MechanismEngine)
//! while reporting this provider as their owner. Login modules that need a readable ticket cache
//! get a decoy one.
use std::fmt::Display;

pub use error::{Error, GssErrorCode, MechanismErrorCode};

pub mod cache;
mod der;
pub mod element;
pub mod engine;
mod error;
pub mod factory;
pub mod login;
pub mod mediated;
pub mod oid;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod token;

/// How a provider identifies itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderInfo {
    name: String,
    version: String,
    description: String,
}
impl ProviderInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn version(&self) -> &str {
        &self.version
    }
    pub fn description(&self) -> &str {
        &self.description
    }
}
impl Default for ProviderInfo {
    fn default() -> Self {
        Self::new(
            provider::PROVIDER_NAME,
            env!("CARGO_PKG_VERSION"),
            provider::PROVIDER_DESCRIPTION,
        )
    }
}
impl Display for ProviderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}
