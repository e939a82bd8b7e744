use std::{any::Any, sync::Arc, time::Duration};

use tracing::{trace, warn};

use super::{Adopted, MediatedName};
use crate::{
    Error, ProviderInfo,
    element::{CredentialElement, CredentialsUsage, NameElement},
    engine::MechanismEngine,
    oid::Oid,
};

pub struct MediatedCredential<E: MechanismEngine> {
    provider: Arc<ProviderInfo>,
    delegate: E::Credential,
    disposed: bool,
}
impl<E: MechanismEngine> MediatedCredential<E> {
    pub(crate) fn acquire(
        engine: &E,
        provider: Arc<ProviderInfo>,
        name: Option<&MediatedName<E>>,
        init_lifetime: Option<Duration>,
        accept_lifetime: Option<Duration>,
        usage: CredentialsUsage,
    ) -> Result<Self, Error> {
        let delegate =
            engine.acquire_credential(name.map(MediatedName::delegate), init_lifetime, accept_lifetime, usage)?;
        Ok(Self {
            provider,
            delegate,
            disposed: false,
        })
    }
    /// Re-acquire a credential of any provider from its name, lifetimes and usage
    pub(crate) fn convert(
        engine: &E,
        provider: Arc<ProviderInfo>,
        foreign: &dyn CredentialElement,
    ) -> Result<Self, Error> {
        trace!(from = %foreign.provider().name(), "converting foreign credential");
        let usage = CredentialsUsage::from_capabilities(foreign.is_initiator()?, foreign.is_acceptor()?)?;
        let foreign_name = foreign.name()?;
        let name = match MediatedName::<E>::from_element(foreign_name.as_ref()) {
            Some(name) => Adopted::Existing(name),
            None => Adopted::Converted(MediatedName::convert(engine, provider.clone(), foreign_name.as_ref())?),
        };
        Self::acquire(
            engine,
            provider,
            Some(&name),
            foreign.init_lifetime()?,
            foreign.accept_lifetime()?,
            usage,
        )
    }
    pub fn from_element(element: &dyn CredentialElement) -> Option<&Self> {
        element.as_any().downcast_ref()
    }
    pub fn delegate(&self) -> &E::Credential {
        &self.delegate
    }
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
impl<E: MechanismEngine> CredentialElement for MediatedCredential<E> {
    fn provider(&self) -> &ProviderInfo {
        &self.provider
    }
    fn name(&self) -> Result<Box<dyn NameElement>, Error> {
        self.delegate.name()
    }
    fn init_lifetime(&self) -> Result<Option<Duration>, Error> {
        self.delegate.init_lifetime()
    }
    fn accept_lifetime(&self) -> Result<Option<Duration>, Error> {
        self.delegate.accept_lifetime()
    }
    fn is_initiator(&self) -> Result<bool, Error> {
        self.delegate.is_initiator()
    }
    fn is_acceptor(&self) -> Result<bool, Error> {
        self.delegate.is_acceptor()
    }
    fn mechanism(&self) -> &Oid {
        self.delegate.mechanism()
    }
    fn impersonate(&self, name: &dyn NameElement) -> Result<Box<dyn CredentialElement>, Error> {
        match MediatedName::<E>::from_element(name) {
            Some(name) => self.delegate.impersonate(name.delegate()),
            None => self.delegate.impersonate(name),
        }
    }
    fn dispose(&mut self) -> Result<(), Error> {
        if std::mem::replace(&mut self.disposed, true) {
            return Ok(());
        }
        self.delegate.dispose()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}
impl<E: MechanismEngine> Drop for MediatedCredential<E> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(%err, "failed to dispose credential");
        }
    }
}
impl<E: MechanismEngine> std::fmt::Debug for MediatedCredential<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatedCredential")
            .field("provider", &self.provider.name())
            .field("delegate", &self.delegate)
            .field("disposed", &self.disposed)
            .finish()
    }
}
