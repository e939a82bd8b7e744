use std::{sync::Arc, time::Duration};

use crate::{
    Error, ProviderInfo,
    element::{CredentialElement, CredentialsUsage, NameElement},
    engine::MechanismEngine,
    mediated::{Adopted, MediatedContext, MediatedCredential, MediatedName},
    oid::{self, Oid},
};

/// Hands out mediated Kerberos v5 capability objects
pub struct MechanismFactory<E: MechanismEngine> {
    engine: Arc<E>,
    provider: Arc<ProviderInfo>,
}
impl<E: MechanismEngine> MechanismFactory<E> {
    pub fn new(engine: E, provider: Arc<ProviderInfo>) -> Self {
        Self {
            engine: Arc::new(engine),
            provider,
        }
    }
    pub fn mechanism(&self) -> &Oid {
        &oid::KRB5
    }
    pub fn name_types(&self) -> &[Oid] {
        &oid::KRB5_NAME_TYPES
    }
    pub fn provider(&self) -> &ProviderInfo {
        &self.provider
    }
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn name_element(&self, name: &str, name_type: &Oid) -> Result<MediatedName<E>, Error> {
        MediatedName::import(&self.engine, self.provider.clone(), name, name_type)
    }
    pub fn name_element_from_bytes(&self, name: &[u8], name_type: &Oid) -> Result<MediatedName<E>, Error> {
        MediatedName::import_bytes(&self.engine, self.provider.clone(), name, name_type)
    }
    /// `name` may come from any provider, `None` selects the default principal
    pub fn credential_element(
        &self,
        name: Option<&dyn NameElement>,
        init_lifetime: Option<Duration>,
        accept_lifetime: Option<Duration>,
        usage: CredentialsUsage,
    ) -> Result<MediatedCredential<E>, Error> {
        let name = name.map(|name| self.adopt_name(name)).transpose()?;
        MediatedCredential::acquire(
            &self.engine,
            self.provider.clone(),
            name.as_deref(),
            init_lifetime,
            accept_lifetime,
            usage,
        )
    }
    pub fn initiator_context(
        &self,
        peer: &dyn NameElement,
        credential: Option<&dyn CredentialElement>,
        lifetime: Option<Duration>,
    ) -> Result<MediatedContext<E>, Error> {
        let peer = self.adopt_name(peer)?;
        let credential = credential.map(|cred| self.adopt_credential(cred)).transpose()?;
        let delegate = self.engine.initiator_context(
            peer.delegate(),
            credential.as_deref().map(MediatedCredential::delegate),
            lifetime,
        )?;
        Ok(self.context(delegate, credential))
    }
    pub fn acceptor_context(&self, credential: Option<&dyn CredentialElement>) -> Result<MediatedContext<E>, Error> {
        let credential = credential.map(|cred| self.adopt_credential(cred)).transpose()?;
        let delegate = self
            .engine
            .acceptor_context(credential.as_deref().map(MediatedCredential::delegate))?;
        Ok(self.context(delegate, credential))
    }
    /// Impersonate `name` with `credential`, both may come from any provider
    pub fn impersonate(
        &self,
        credential: &dyn CredentialElement,
        name: &dyn NameElement,
    ) -> Result<Box<dyn CredentialElement>, Error> {
        let credential = self.adopt_credential(credential)?;
        let name = self.adopt_name(name)?;
        credential.impersonate(&*name)
    }
    pub fn import_context(&self, exported: &[u8]) -> Result<MediatedContext<E>, Error> {
        let delegate = self.engine.import_context(exported)?;
        Ok(MediatedContext::new(self.provider.clone(), oid::KRB5.clone(), delegate, None))
    }

    /// Use `name` as is when it was created here, otherwise rebuild it
    pub fn adopt_name<'a>(&self, name: &'a dyn NameElement) -> Result<Adopted<'a, MediatedName<E>>, Error> {
        Ok(match MediatedName::from_element(name) {
            Some(mediated) => Adopted::Existing(mediated),
            None => Adopted::Converted(MediatedName::<E>::convert(&self.engine, self.provider.clone(), name)?),
        })
    }
    pub fn adopt_credential<'a>(
        &self,
        credential: &'a dyn CredentialElement,
    ) -> Result<Adopted<'a, MediatedCredential<E>>, Error> {
        Ok(match MediatedCredential::from_element(credential) {
            Some(mediated) => Adopted::Existing(mediated),
            None => Adopted::Converted(MediatedCredential::<E>::convert(
                &self.engine,
                self.provider.clone(),
                credential,
            )?),
        })
    }

    fn context(
        &self,
        delegate: E::Context,
        credential: Option<Adopted<'_, MediatedCredential<E>>>,
    ) -> MediatedContext<E> {
        MediatedContext::new(
            self.provider.clone(),
            oid::KRB5.clone(),
            delegate,
            credential.and_then(Adopted::into_converted),
        )
    }
}
impl<E: MechanismEngine> std::fmt::Debug for MechanismFactory<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismFactory")
            .field("provider", &self.provider.name())
            .field("mechanism", self.mechanism())
            .finish()
    }
}
