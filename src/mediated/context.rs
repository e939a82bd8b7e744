use std::{io::Read, sync::Arc, time::Duration};

use tracing::warn;

use super::MediatedCredential;
use crate::{
    Error, ProviderInfo,
    element::{ContextElement, ContextFlags, CredentialElement, InquireKind, MessageProp, NameElement},
    engine::MechanismEngine,
    oid::Oid,
    token::{self, TokenInput},
};

pub struct MediatedContext<E: MechanismEngine> {
    provider: Arc<ProviderInfo>,
    mechanism: Oid,
    delegate: E::Context,
    // a credential converted for this context lives as long as the context
    converted: Option<MediatedCredential<E>>,
    disposed: bool,
}
impl<E: MechanismEngine> MediatedContext<E> {
    pub(crate) fn new(
        provider: Arc<ProviderInfo>,
        mechanism: Oid,
        delegate: E::Context,
        converted: Option<MediatedCredential<E>>,
    ) -> Self {
        Self {
            provider,
            mechanism,
            delegate,
            converted,
            disposed: false,
        }
    }
    pub fn delegate(&self) -> &E::Context {
        &self.delegate
    }
    pub fn delegate_mut(&mut self) -> &mut E::Context {
        &mut self.delegate
    }
    /// The credential built from a foreign one when this context was created
    pub fn converted_credential(&self) -> Option<&MediatedCredential<E>> {
        self.converted.as_ref()
    }
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
    /// Read the peer's token from `input` and take the next initiator step.
    ///
    /// `token_len` is the inner token length when the caller already consumed the token header.
    pub fn init_sec_context_from<R: Read>(
        &mut self,
        input: TokenInput<'_, R>,
        token_len: Option<usize>,
    ) -> Result<Option<Vec<u8>>, Error> {
        let token = token::read_token(&self.mechanism, input, token_len)?;
        self.delegate.init_sec_context(&token)
    }
    pub fn accept_sec_context_from<R: Read>(
        &mut self,
        input: TokenInput<'_, R>,
        token_len: Option<usize>,
    ) -> Result<Option<Vec<u8>>, Error> {
        let token = token::read_token(&self.mechanism, input, token_len)?;
        self.delegate.accept_sec_context(&token)
    }
}
impl<E: MechanismEngine> ContextElement for MediatedContext<E> {
    fn provider(&self) -> &ProviderInfo {
        &self.provider
    }

    fn request_flags(&mut self, flags: ContextFlags, enabled: bool) -> Result<(), Error> {
        self.delegate.request_flags(flags, enabled)
    }
    fn request_lifetime(&mut self, lifetime: Option<Duration>) -> Result<(), Error> {
        self.delegate.request_lifetime(lifetime)
    }
    fn set_channel_bindings(&mut self, bindings: &[u8]) -> Result<(), Error> {
        self.delegate.set_channel_bindings(bindings)
    }

    fn flags(&self) -> ContextFlags {
        self.delegate.flags()
    }
    fn lifetime(&self) -> Option<Duration> {
        self.delegate.lifetime()
    }
    fn is_established(&self) -> bool {
        self.delegate.is_established()
    }
    fn is_initiator(&self) -> bool {
        self.delegate.is_initiator()
    }
    fn is_prot_ready(&self) -> bool {
        self.delegate.is_prot_ready()
    }
    fn is_transferable(&self) -> Result<bool, Error> {
        self.delegate.is_transferable()
    }
    fn source_name(&self) -> Result<Option<Box<dyn NameElement>>, Error> {
        self.delegate.source_name()
    }
    fn target_name(&self) -> Result<Option<Box<dyn NameElement>>, Error> {
        self.delegate.target_name()
    }
    fn mechanism(&self) -> Result<Oid, Error> {
        self.delegate.mechanism()
    }
    fn delegated_credential(&self) -> Result<Option<Box<dyn CredentialElement>>, Error> {
        self.delegate.delegated_credential()
    }

    fn init_sec_context(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.delegate.init_sec_context(token)
    }
    fn accept_sec_context(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.delegate.accept_sec_context(token)
    }

    fn wrap_size_limit(&self, qop: u32, confidential: bool, max_token_size: usize) -> Result<usize, Error> {
        self.delegate.wrap_size_limit(qop, confidential, max_token_size)
    }
    fn wrap(&mut self, message: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error> {
        self.delegate.wrap(message, prop)
    }
    fn unwrap(&mut self, token: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error> {
        self.delegate.unwrap(token, prop)
    }
    fn get_mic(&mut self, message: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error> {
        self.delegate.get_mic(message, prop)
    }
    fn verify_mic(&mut self, token: &[u8], message: &[u8], prop: &mut MessageProp) -> Result<(), Error> {
        self.delegate.verify_mic(token, message, prop)
    }

    fn export(&mut self) -> Result<Vec<u8>, Error> {
        self.delegate.export()
    }
    fn inquire(&self, kind: &InquireKind) -> Result<Vec<u8>, Error> {
        self.delegate.inquire(kind)
    }
    fn dispose(&mut self) -> Result<(), Error> {
        if std::mem::replace(&mut self.disposed, true) {
            return Ok(());
        }
        self.delegate.dispose()
    }
}
impl<E: MechanismEngine> Drop for MediatedContext<E> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(%err, "failed to dispose security context");
        }
    }
}
impl<E: MechanismEngine> std::fmt::Debug for MediatedContext<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatedContext")
            .field("provider", &self.provider.name())
            .field("mechanism", &self.mechanism)
            .field("delegate", &self.delegate)
            .field("disposed", &self.disposed)
            .finish()
    }
}
