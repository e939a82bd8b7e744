//! Installation of the mediated provider into a [`ProviderRegistry`].
//!
//! Installing happens at most once per [`Provider`]. Concurrent first calls serialize on the
//! installation lock, the outcome is published in a write-once cell and every later call reads it
//! from there, including a failure.
use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::{
    Error, ProviderInfo,
    cache::{self, CacheError, CachePaths, LoginCache},
    engine::MechanismEngine,
    factory::MechanismFactory,
    login::{DecoratedConfiguration, LoginConfiguration},
    oid,
    registry::{DEFAULT_PROVIDER, NATIVE_PROVIDER, ProviderRecord, ProviderRegistry},
    settings::Settings,
};

pub const PROVIDER_NAME: &str = "MediatedGSS";
pub const PROVIDER_DESCRIPTION: &str = "Mediated GSS (Kerberos v5, SPNEGO)";

type EngineInit<E> = Box<dyn FnOnce() -> Result<E, Error> + Send>;

#[derive(Debug, thiserror::Error)]
pub enum InstallFailure {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to initialize the mechanism engine")]
    Engine(#[source] Error),
    #[error("the mechanism engine was already taken by an earlier attempt")]
    EngineConsumed,
}

/// A failed installation. Every call after the first failure returns a clone sharing the same cause.
#[derive(Clone, Debug, thiserror::Error)]
#[error("failed to install provider {provider}")]
pub struct InstallError {
    provider: String,
    #[source]
    cause: Arc<InstallFailure>,
}
impl InstallError {
    pub fn provider(&self) -> &str {
        &self.provider
    }
    pub fn cause(&self) -> &Arc<InstallFailure> {
        &self.cause
    }
}

#[derive(Clone, Debug)]
pub enum InstallState {
    NotAttempted,
    Installing,
    /// This instance put its record at the top of the registry
    InstalledSelf,
    /// The registry listed the provider before this instance got to it
    InstalledExternally,
    Failed(InstallError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Registered,
    External,
}

struct Installation<E: MechanismEngine> {
    factory: Arc<MechanismFactory<E>>,
    mode: Mode,
    // keeps a temporary decoy alive
    _login_cache: LoginCache,
}

pub struct Provider<E: MechanismEngine> {
    info: Arc<ProviderInfo>,
    registry: Arc<dyn ProviderRegistry>,
    settings: Settings,
    paths: Arc<CachePaths>,
    engine_init: Mutex<Option<EngineInit<E>>>,
    installing: AtomicBool,
    outcome: OnceLock<Result<Installation<E>, InstallError>>,
}
impl<E: MechanismEngine> Provider<E> {
    /// `engine_init` runs at most once, during the first installation attempt
    pub fn new<F>(registry: Arc<dyn ProviderRegistry>, settings: Settings, engine_init: F) -> Self
    where
        F: FnOnce() -> Result<E, Error> + Send + 'static,
    {
        Self {
            info: Arc::new(ProviderInfo::default()),
            registry,
            paths: Arc::new(CachePaths::new(settings.ticket_cache.clone())),
            settings,
            engine_init: Mutex::new(Some(Box::new(engine_init))),
            installing: AtomicBool::new(false),
            outcome: OnceLock::new(),
        }
    }
    /// Settings are taken from the environment
    pub fn from_env<F>(registry: Arc<dyn ProviderRegistry>, engine_init: F) -> Self
    where
        F: FnOnce() -> Result<E, Error> + Send + 'static,
    {
        Self::new(registry, Settings::from_env(), engine_init)
    }
    #[must_use]
    pub fn with_info(self, info: ProviderInfo) -> Self {
        Self {
            info: Arc::new(info),
            ..self
        }
    }
    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn paths(&self) -> &Arc<CachePaths> {
        &self.paths
    }
    /// The record put into the registry
    pub fn record(&self) -> ProviderRecord {
        ProviderRecord::new(self.info.name(), [oid::KRB5.clone(), oid::SPNEGO.clone()])
    }

    /// Install this provider, unless that happened already
    pub fn install(&self) -> Result<(), InstallError> {
        self.installation().map(|_| ())
    }
    /// The factory of an installed provider, installing first if needed
    pub fn instance(&self) -> Result<Arc<MechanismFactory<E>>, InstallError> {
        self.installation().map(|installation| installation.factory.clone())
    }
    pub fn is_installed(&self) -> bool {
        matches!(self.outcome.get(), Some(Ok(_))) || self.installed_externally()
    }
    pub fn state(&self) -> InstallState {
        match self.outcome.get() {
            Some(Ok(Installation {
                mode: Mode::Registered, ..
            })) => InstallState::InstalledSelf,
            Some(Ok(Installation { mode: Mode::External, .. })) => InstallState::InstalledExternally,
            Some(Err(err)) => InstallState::Failed(err.clone()),
            None if self.installing.load(Ordering::Acquire) => InstallState::Installing,
            None => InstallState::NotAttempted,
        }
    }
    /// Wrap a login configuration so Kerberos login modules use the cache this provider bound
    pub fn login_configuration<C: LoginConfiguration>(&self, inner: C) -> DecoratedConfiguration<C> {
        DecoratedConfiguration::new(inner, self.paths.clone())
    }

    fn installation(&self) -> Result<&Installation<E>, InstallError> {
        if let Some(outcome) = self.outcome.get() {
            debug!(provider = self.info.name(), "installation already attempted");
            return outcome.as_ref().map_err(Clone::clone);
        }
        let mut engine_init = self.engine_init.lock();
        let outcome = self.outcome.get_or_init(|| {
            let _installing = InstallingFlag::raise(&self.installing);
            self.perform_install(engine_init.take()).map_err(|cause| {
                error!(provider = self.info.name(), error = %cause, "failed to install provider");
                InstallError {
                    provider: self.info.name().to_owned(),
                    cause: Arc::new(cause),
                }
            })
        });
        outcome.as_ref().map_err(Clone::clone)
    }

    fn perform_install(&self, engine_init: Option<EngineInit<E>>) -> Result<Installation<E>, InstallFailure> {
        let login_cache = cache::prepare_login_cache(&self.settings, &self.paths)?;
        let engine_init = engine_init.ok_or(InstallFailure::EngineConsumed)?;
        let engine = engine_init().map_err(InstallFailure::Engine)?;
        let factory = Arc::new(MechanismFactory::new(engine, self.info.clone()));

        let name = self.info.name();
        if self.installed_externally() {
            login_cache.bind(&self.paths);
            info!(provider = name, "skipped installing provider, it was installed externally");
            return Ok(Installation {
                factory,
                mode: Mode::External,
                _login_cache: login_cache,
            });
        }
        for displaced in [DEFAULT_PROVIDER, NATIVE_PROVIDER, name] {
            if self.registry.remove(displaced).is_some() {
                debug!(provider = displaced, "removed from registry");
            }
        }
        // nothing else holds our name after removing it
        self.registry.insert_at(self.record(), 1);
        login_cache.bind(&self.paths);
        info!(
            provider = name,
            login_cache = login_cache.path().unwrap_or("platform default"),
            "installed provider"
        );
        Ok(Installation {
            factory,
            mode: Mode::Registered,
            _login_cache: login_cache,
        })
    }

    fn installed_externally(&self) -> bool {
        self.registry.get(self.info.name()).is_some() && self.registry.get(DEFAULT_PROVIDER).is_none()
    }
}
/// Set while an attempt runs, cleared on return and on unwind
struct InstallingFlag<'a>(&'a AtomicBool);
impl<'a> InstallingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}
impl Drop for InstallingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<E: MechanismEngine> std::fmt::Debug for Provider<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("info", &self.info)
            .field("settings", &self.settings)
            .field("paths", &self.paths)
            .field("state", &self.state())
            .finish()
    }
}
