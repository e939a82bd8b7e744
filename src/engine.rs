use std::time::Duration;

use crate::{
    Error,
    element::{ContextElement, CredentialElement, CredentialsUsage, NameElement},
    oid::Oid,
};

/// The mechanism implementation doing the actual negotiation.
///
/// The mediator only calls these constructors and then forwards to the objects they return. Errors are
/// handed to the caller unchanged.
pub trait MechanismEngine: Send + Sync + 'static {
    type Name: NameElement + 'static;
    type Credential: CredentialElement + 'static;
    type Context: ContextElement + 'static;

    fn import_name(&self, name: &str, name_type: &Oid) -> Result<Self::Name, Error>;
    fn import_name_bytes(&self, name: &[u8], name_type: &Oid) -> Result<Self::Name, Error>;
    /// `name` is `None` for the default principal
    fn acquire_credential(
        &self,
        name: Option<&Self::Name>,
        init_lifetime: Option<Duration>,
        accept_lifetime: Option<Duration>,
        usage: CredentialsUsage,
    ) -> Result<Self::Credential, Error>;
    fn initiator_context(
        &self,
        peer: &Self::Name,
        credential: Option<&Self::Credential>,
        lifetime: Option<Duration>,
    ) -> Result<Self::Context, Error>;
    fn acceptor_context(&self, credential: Option<&Self::Credential>) -> Result<Self::Context, Error>;
    fn import_context(&self, exported: &[u8]) -> Result<Self::Context, Error>;
}
