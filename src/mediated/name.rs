use std::{any::Any, fmt::Display, sync::Arc};

use tracing::trace;

use crate::{Error, ProviderInfo, element::NameElement, engine::MechanismEngine, oid::Oid};

pub struct MediatedName<E: MechanismEngine> {
    provider: Arc<ProviderInfo>,
    delegate: E::Name,
}
impl<E: MechanismEngine> MediatedName<E> {
    pub(crate) fn import(engine: &E, provider: Arc<ProviderInfo>, name: &str, name_type: &Oid) -> Result<Self, Error> {
        let delegate = engine.import_name(name, name_type)?;
        Ok(Self { provider, delegate })
    }
    pub(crate) fn import_bytes(
        engine: &E,
        provider: Arc<ProviderInfo>,
        name: &[u8],
        name_type: &Oid,
    ) -> Result<Self, Error> {
        let delegate = engine.import_name_bytes(name, name_type)?;
        Ok(Self { provider, delegate })
    }
    /// Rebuild a name of any provider from its string form and type. `foreign` is left untouched.
    pub(crate) fn convert(engine: &E, provider: Arc<ProviderInfo>, foreign: &dyn NameElement) -> Result<Self, Error> {
        trace!(name = %foreign, from = %foreign.provider().name(), "converting foreign name");
        Self::import(engine, provider, &foreign.to_string(), foreign.name_type())
    }
    /// The one place asking whether an element already is one of ours
    pub fn from_element(element: &dyn NameElement) -> Option<&Self> {
        element.as_any().downcast_ref()
    }
    pub fn delegate(&self) -> &E::Name {
        &self.delegate
    }
}
impl<E: MechanismEngine> NameElement for MediatedName<E> {
    fn provider(&self) -> &ProviderInfo {
        &self.provider
    }
    fn mechanism(&self) -> &Oid {
        self.delegate.mechanism()
    }
    fn name_type(&self) -> &Oid {
        self.delegate.name_type()
    }
    fn export(&self) -> Result<Vec<u8>, Error> {
        self.delegate.export()
    }
    fn is_anonymous(&self) -> bool {
        self.delegate.is_anonymous()
    }
    fn equivalent(&self, other: &dyn NameElement) -> Result<bool, Error> {
        match Self::from_element(other) {
            Some(mediated) => self.delegate.equivalent(&mediated.delegate),
            None => self.delegate.equivalent(other),
        }
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}
impl<E: MechanismEngine> Display for MediatedName<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.delegate.fmt(f)
    }
}
impl<E: MechanismEngine> std::fmt::Debug for MediatedName<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatedName")
            .field("provider", &self.provider.name())
            .field("delegate", &self.delegate)
            .finish()
    }
}
