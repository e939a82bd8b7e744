use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::cache::CachePaths;

pub const KRB5_LOGIN_MODULE: &str = "Krb5LoginModule";
pub const TICKET_CACHE_OPTION: &str = "ticketCache";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlFlag {
    Required,
    Requisite,
    Sufficient,
    Optional,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginModuleEntry {
    pub module_name: String,
    pub control_flag: ControlFlag,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}
impl LoginModuleEntry {
    pub fn new(module_name: impl Into<String>, control_flag: ControlFlag) -> Self {
        Self {
            module_name: module_name.into(),
            control_flag,
            options: BTreeMap::new(),
        }
    }
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
    /// Whether this entry is the Kerberos login module, by simple or qualified name
    pub fn is_kerberos(&self) -> bool {
        self.module_name == KRB5_LOGIN_MODULE
            || self
                .module_name
                .strip_suffix(KRB5_LOGIN_MODULE)
                .is_some_and(|qualifier| qualifier.ends_with('.'))
    }
}

/// Login module entries per application name
pub trait LoginConfiguration: Send + Sync {
    fn entries(&self, application: &str) -> Option<Vec<LoginModuleEntry>>;
}

impl<C: LoginConfiguration + ?Sized> LoginConfiguration for Arc<C> {
    fn entries(&self, application: &str) -> Option<Vec<LoginModuleEntry>> {
        (**self).entries(application)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticConfiguration {
    applications: BTreeMap<String, Vec<LoginModuleEntry>>,
}
impl StaticConfiguration {
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn with_entry(mut self, application: impl Into<String>, entry: LoginModuleEntry) -> Self {
        self.applications.entry(application.into()).or_default().push(entry);
        self
    }
}
impl LoginConfiguration for StaticConfiguration {
    fn entries(&self, application: &str) -> Option<Vec<LoginModuleEntry>> {
        self.applications.get(application).cloned()
    }
}

/// Points Kerberos login modules at the cache bound in [`CachePaths`] at the time of each lookup
pub struct DecoratedConfiguration<C> {
    inner: C,
    paths: Arc<CachePaths>,
}
impl<C: LoginConfiguration> DecoratedConfiguration<C> {
    pub fn new(inner: C, paths: Arc<CachePaths>) -> Self {
        Self { inner, paths }
    }
    pub fn inner(&self) -> &C {
        &self.inner
    }
}
impl<C: LoginConfiguration> LoginConfiguration for DecoratedConfiguration<C> {
    fn entries(&self, application: &str) -> Option<Vec<LoginModuleEntry>> {
        let mut entries = self.inner.entries(application)?;
        let Some(cache) = self.paths.login_cache() else {
            return Some(entries);
        };
        for entry in entries.iter_mut().filter(|entry| entry.is_kerberos()) {
            entry.options.insert(TICKET_CACHE_OPTION.to_owned(), cache.clone());
        }
        Some(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration() -> StaticConfiguration {
        StaticConfiguration::new()
            .with_entry(
                "app",
                LoginModuleEntry::new("com.example.Krb5LoginModule", ControlFlag::Required)
                    .option(TICKET_CACHE_OPTION, "/old")
                    .option("useTicketCache", "true"),
            )
            .with_entry(
                "app",
                LoginModuleEntry::new("com.example.LdapLoginModule", ControlFlag::Optional).option("url", "ldap://x"),
            )
    }

    #[test]
    fn kerberos_module_names() {
        assert!(LoginModuleEntry::new("Krb5LoginModule", ControlFlag::Required).is_kerberos());
        assert!(LoginModuleEntry::new("a.b.Krb5LoginModule", ControlFlag::Required).is_kerberos());
        assert!(!LoginModuleEntry::new("MyKrb5LoginModule", ControlFlag::Required).is_kerberos());
    }

    #[test]
    fn overwrites_only_kerberos_entries() {
        let paths = Arc::new(CachePaths::new(Some("/tmp/cc1".to_owned())));
        let decorated = DecoratedConfiguration::new(configuration(), paths.clone());
        let entries = decorated.entries("app").unwrap();
        assert_eq!(entries[0].options[TICKET_CACHE_OPTION], "/tmp/cc1");
        assert_eq!(entries[0].options["useTicketCache"], "true");
        assert_eq!(entries[1], configuration().entries("app").unwrap()[1]);

        paths.bind_login_cache(Some("/tmp/cc2".to_owned()));
        assert_eq!(decorated.entries("app").unwrap()[0].options[TICKET_CACHE_OPTION], "/tmp/cc2");
    }

    #[test]
    fn unbound_passes_through() {
        let decorated = DecoratedConfiguration::new(configuration(), Arc::new(CachePaths::new(None)));
        assert_eq!(decorated.entries("app"), configuration().entries("app"));
        assert_eq!(decorated.entries("other"), None);
    }
}
