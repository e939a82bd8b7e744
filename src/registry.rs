//! The process-wide list of providers, ordered by preference.
use std::collections::BTreeSet;

use parking_lot::RwLock;

use crate::oid::{self, Oid};

/// The built-in provider of the platform
pub const DEFAULT_PROVIDER: &str = "PlatformGSS";
/// The platform provider backed by the native GSS library
pub const NATIVE_PROVIDER: &str = "PlatformNativeGSS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRecord {
    name: String,
    /// 1-based position, 1 is preferred over everything else
    priority: usize,
    mechanisms: BTreeSet<Oid>,
}
impl ProviderRecord {
    pub fn new(name: impl Into<String>, mechanisms: impl IntoIterator<Item = Oid>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            mechanisms: mechanisms.into_iter().collect(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The position assigned by the registry, 0 while not registered
    pub fn priority(&self) -> usize {
        self.priority
    }
    pub fn mechanisms(&self) -> impl Iterator<Item = &Oid> {
        self.mechanisms.iter()
    }
    pub fn supports(&self, mechanism: &Oid) -> bool {
        self.mechanisms.contains(mechanism)
    }
}

/// Mutations the installer performs on a registry
pub trait ProviderRegistry: Send + Sync {
    /// Insert at the 1-based `position`, shifting later records down. Positions past the end append.
    ///
    /// Returns the position taken, or `None` if a provider of that name is registered already.
    fn insert_at(&self, record: ProviderRecord, position: usize) -> Option<usize>;
    fn remove(&self, name: &str) -> Option<ProviderRecord>;
    fn get(&self, name: &str) -> Option<ProviderRecord>;
}

#[derive(Debug, Default)]
pub struct MechanismRegistry {
    providers: RwLock<Vec<ProviderRecord>>,
}
impl MechanismRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    /// A registry holding what a fresh process starts with
    pub fn with_platform_defaults() -> Self {
        let registry = Self::new();
        registry.insert_at(ProviderRecord::new(DEFAULT_PROVIDER, [oid::KRB5.clone(), oid::SPNEGO.clone()]), 1);
        registry.insert_at(ProviderRecord::new(NATIVE_PROVIDER, [oid::KRB5.clone(), oid::SPNEGO.clone()]), 2);
        registry
    }
    /// All records, most preferred first
    pub fn providers(&self) -> Vec<ProviderRecord> {
        self.providers.read().clone()
    }
    /// The most preferred provider supporting `mechanism`
    pub fn resolve(&self, mechanism: &Oid) -> Option<ProviderRecord> {
        self.providers.read().iter().find(|p| p.supports(mechanism)).cloned()
    }
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}
impl ProviderRegistry for MechanismRegistry {
    fn insert_at(&self, record: ProviderRecord, position: usize) -> Option<usize> {
        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.name == record.name) {
            return None;
        }
        let index = position.saturating_sub(1).min(providers.len());
        providers.insert(index, record);
        renumber(&mut providers);
        Some(index + 1)
    }
    fn remove(&self, name: &str) -> Option<ProviderRecord> {
        let mut providers = self.providers.write();
        let index = providers.iter().position(|p| p.name == name)?;
        let mut removed = providers.remove(index);
        removed.priority = 0;
        renumber(&mut providers);
        Some(removed)
    }
    fn get(&self, name: &str) -> Option<ProviderRecord> {
        self.providers.read().iter().find(|p| p.name == name).cloned()
    }
}

fn renumber(providers: &mut [ProviderRecord]) {
    for (index, record) in providers.iter_mut().enumerate() {
        record.priority = index + 1;
    }
}
