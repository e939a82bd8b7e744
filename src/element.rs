//! The provider-facing contract shared by engine objects and their mediated wrappers.
use std::{
    any::Any,
    fmt::{Debug, Display},
    time::Duration,
};

use crate::{Error, ProviderInfo, oid::Oid};

bitflags::bitflags! {
    /// Context services, with the GSS-API flag values
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContextFlags: u32 {
        const DELEGATION = 1;
        const MUTUAL_AUTH = 2;
        const REPLAY_DETECTION = 4;
        const SEQUENCE_DETECTION = 8;
        const CONFIDENTIALITY = 16;
        const INTEGRITY = 32;
        const ANONYMITY = 64;
        const DELEGATION_POLICY = 32768;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The usage of a credentials handle
pub enum CredentialsUsage {
    /// Accept contexts only
    Inbound,
    /// Initiate contexts only
    Outbound,
    Both,
}
impl CredentialsUsage {
    /// Derive the usage from what a credential reports it can do
    pub fn from_capabilities(initiator: bool, acceptor: bool) -> Result<Self, Error> {
        match (initiator, acceptor) {
            (true, true) => Ok(Self::Both),
            (false, true) => Ok(Self::Inbound),
            (true, false) => Ok(Self::Outbound),
            (false, false) => Err(Error::DefectiveCredential(
                "provided credential is neither an initiator nor an acceptor".to_owned(),
            )),
        }
    }
    pub fn can_initiate(self) -> bool {
        matches!(self, Self::Outbound | Self::Both)
    }
    pub fn can_accept(self) -> bool {
        matches!(self, Self::Inbound | Self::Both)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageProp {
    pub qop: u32,
    pub confidential: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum InquireKind {
    SessionKey,
    Other(Oid),
}

/// A principal name
pub trait NameElement: Display + Debug + Send + Sync {
    fn provider(&self) -> &ProviderInfo;
    fn mechanism(&self) -> &Oid;
    /// The type of the string form returned by `Display`
    fn name_type(&self) -> &Oid;
    fn export(&self) -> Result<Vec<u8>, Error>;
    fn is_anonymous(&self) -> bool;
    fn equivalent(&self, other: &dyn NameElement) -> Result<bool, Error>;
    fn as_any(&self) -> &dyn Any;
}

/// A credentials handle. `None` lifetimes are indefinite.
pub trait CredentialElement: Debug + Send + Sync {
    fn provider(&self) -> &ProviderInfo;
    fn name(&self) -> Result<Box<dyn NameElement>, Error>;
    fn init_lifetime(&self) -> Result<Option<Duration>, Error>;
    fn accept_lifetime(&self) -> Result<Option<Duration>, Error>;
    fn is_initiator(&self) -> Result<bool, Error>;
    fn is_acceptor(&self) -> Result<bool, Error>;
    fn mechanism(&self) -> &Oid;
    /// A credential for `name`, obtained on its behalf with this one (S4U2self)
    fn impersonate(&self, name: &dyn NameElement) -> Result<Box<dyn CredentialElement>, Error> {
        Err(Error::Unavailable(format!("impersonating {name} is not supported")))
    }
    fn dispose(&mut self) -> Result<(), Error>;
    fn as_any(&self) -> &dyn Any;
}

/// A security context, either side, established or not
pub trait ContextElement: Debug + Send {
    fn provider(&self) -> &ProviderInfo;

    fn request_flags(&mut self, flags: ContextFlags, enabled: bool) -> Result<(), Error>;
    fn request_lifetime(&mut self, lifetime: Option<Duration>) -> Result<(), Error>;
    fn set_channel_bindings(&mut self, bindings: &[u8]) -> Result<(), Error>;

    /// The services in effect, or requested while the context is not established yet
    fn flags(&self) -> ContextFlags;
    fn lifetime(&self) -> Option<Duration>;
    fn is_established(&self) -> bool;
    fn is_initiator(&self) -> bool;
    fn is_prot_ready(&self) -> bool;
    fn is_transferable(&self) -> Result<bool, Error>;
    fn source_name(&self) -> Result<Option<Box<dyn NameElement>>, Error>;
    fn target_name(&self) -> Result<Option<Box<dyn NameElement>>, Error>;
    fn mechanism(&self) -> Result<Oid, Error>;
    fn delegated_credential(&self) -> Result<Option<Box<dyn CredentialElement>>, Error>;

    /// Consume the peer's token (empty on the first call) and produce the next one, if any
    fn init_sec_context(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error>;
    fn accept_sec_context(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    fn wrap_size_limit(&self, qop: u32, confidential: bool, max_token_size: usize) -> Result<usize, Error>;
    fn wrap(&mut self, message: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error>;
    fn unwrap(&mut self, token: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error>;
    fn get_mic(&mut self, message: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error>;
    fn verify_mic(&mut self, token: &[u8], message: &[u8], prop: &mut MessageProp) -> Result<(), Error>;

    fn export(&mut self) -> Result<Vec<u8>, Error>;
    fn inquire(&self, kind: &InquireKind) -> Result<Vec<u8>, Error> {
        Err(Error::Unavailable(format!("inquiry {kind:?} is not implemented")))
    }
    fn dispose(&mut self) -> Result<(), Error>;
}
