#![allow(dead_code)]

use std::{
    any::Any,
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use gss_mediator::{
    Error, GssErrorCode, ProviderInfo,
    element::{ContextElement, ContextFlags, CredentialElement, CredentialsUsage, MessageProp, NameElement},
    engine::MechanismEngine,
    oid::{self, Oid},
    registry::{MechanismRegistry, ProviderRecord, ProviderRegistry},
    settings::{Platform, Settings},
};
use parking_lot::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Settings that neither touch the environment nor write a cache
pub fn quiet_settings() -> Settings {
    Settings::default()
        .platform(Platform::Unix)
        .user("alice")
        .realm("EXAMPLE.ORG")
}

pub fn engine_info() -> Arc<ProviderInfo> {
    Arc::new(ProviderInfo::new("EngineGSS", "1.0", "test engine"))
}

pub fn foreign_info() -> Arc<ProviderInfo> {
    Arc::new(ProviderInfo::new("ForeignGSS", "1.0", "some other provider"))
}

#[derive(Debug, Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub disposed_credentials: AtomicUsize,
    pub disposed_contexts: AtomicUsize,
}
impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acquisition {
    pub name: Option<String>,
    pub init_lifetime: Option<Duration>,
    pub accept_lifetime: Option<Duration>,
    pub usage: CredentialsUsage,
}

pub struct MockEngine {
    pub info: Arc<ProviderInfo>,
    pub counters: Arc<Counters>,
    pub acquisitions: Arc<Mutex<Vec<Acquisition>>>,
}
impl MockEngine {
    pub fn new() -> Self {
        Self {
            info: engine_info(),
            counters: Arc::default(),
            acquisitions: Arc::default(),
        }
    }
    pub fn new_ok() -> Result<Self, Error> {
        Ok(Self::new())
    }
}

#[derive(Clone, Debug)]
pub struct MockName {
    pub info: Arc<ProviderInfo>,
    pub name: String,
    pub name_type: Oid,
}
impl MockName {
    pub fn foreign(name: &str) -> Self {
        Self {
            info: foreign_info(),
            name: name.to_owned(),
            name_type: oid::NT_KRB5_PRINCIPAL.clone(),
        }
    }
}
impl Display for MockName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
impl NameElement for MockName {
    fn provider(&self) -> &ProviderInfo {
        &self.info
    }
    fn mechanism(&self) -> &Oid {
        &oid::KRB5
    }
    fn name_type(&self) -> &Oid {
        &self.name_type
    }
    fn export(&self) -> Result<Vec<u8>, Error> {
        Ok(self.name.as_bytes().to_vec())
    }
    fn is_anonymous(&self) -> bool {
        false
    }
    fn equivalent(&self, other: &dyn NameElement) -> Result<bool, Error> {
        Ok(other.to_string() == self.name && other.name_type() == &self.name_type)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockCredential {
    pub info: Arc<ProviderInfo>,
    pub name: MockName,
    pub init_lifetime: Option<Duration>,
    pub accept_lifetime: Option<Duration>,
    pub initiator: bool,
    pub acceptor: bool,
    pub counters: Arc<Counters>,
}
impl MockCredential {
    pub fn foreign(initiator: bool, acceptor: bool) -> Self {
        Self {
            info: foreign_info(),
            name: MockName::foreign("bob@EXAMPLE.ORG"),
            init_lifetime: Some(Duration::from_secs(600)),
            accept_lifetime: None,
            initiator,
            acceptor,
            counters: Arc::default(),
        }
    }
}
impl CredentialElement for MockCredential {
    fn provider(&self) -> &ProviderInfo {
        &self.info
    }
    fn name(&self) -> Result<Box<dyn NameElement>, Error> {
        Ok(Box::new(self.name.clone()))
    }
    fn init_lifetime(&self) -> Result<Option<Duration>, Error> {
        Ok(self.init_lifetime)
    }
    fn accept_lifetime(&self) -> Result<Option<Duration>, Error> {
        Ok(self.accept_lifetime)
    }
    fn is_initiator(&self) -> Result<bool, Error> {
        Ok(self.initiator)
    }
    fn is_acceptor(&self) -> Result<bool, Error> {
        Ok(self.acceptor)
    }
    fn mechanism(&self) -> &Oid {
        &oid::KRB5
    }
    fn impersonate(&self, name: &dyn NameElement) -> Result<Box<dyn CredentialElement>, Error> {
        let Some(name) = name.as_any().downcast_ref::<MockName>() else {
            return Err(Error::engine(GssErrorCode::BAD_NAME, "not an engine name"));
        };
        if !self.initiator {
            return Err(GssErrorCode::NO_CRED.into());
        }
        Ok(Box::new(MockCredential {
            info: self.info.clone(),
            name: name.clone(),
            init_lifetime: self.init_lifetime,
            accept_lifetime: None,
            initiator: true,
            acceptor: false,
            counters: self.counters.clone(),
        }))
    }
    fn dispose(&mut self) -> Result<(), Error> {
        self.counters.disposed_credentials.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Answers every token with `reply:` and the token, established after two steps
#[derive(Debug)]
pub struct MockContext {
    pub info: Arc<ProviderInfo>,
    pub initiator: bool,
    pub peer: Option<MockName>,
    pub received: Vec<Vec<u8>>,
    pub flags: ContextFlags,
    pub bindings: Option<Vec<u8>>,
    pub counters: Arc<Counters>,
}
impl MockContext {
    fn step(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        if token == b"bad".as_slice() {
            return Err(Error::engine(GssErrorCode::DEFECTIVE_TOKEN, "mock rejects this token"));
        }
        self.received.push(token.to_vec());
        let mut reply = b"reply:".to_vec();
        reply.extend_from_slice(token);
        Ok(Some(reply))
    }
}
impl ContextElement for MockContext {
    fn provider(&self) -> &ProviderInfo {
        &self.info
    }
    fn request_flags(&mut self, flags: ContextFlags, enabled: bool) -> Result<(), Error> {
        self.flags.set(flags, enabled);
        Ok(())
    }
    fn request_lifetime(&mut self, _lifetime: Option<Duration>) -> Result<(), Error> {
        Ok(())
    }
    fn set_channel_bindings(&mut self, bindings: &[u8]) -> Result<(), Error> {
        self.bindings = Some(bindings.to_vec());
        Ok(())
    }
    fn flags(&self) -> ContextFlags {
        self.flags
    }
    fn lifetime(&self) -> Option<Duration> {
        Some(Duration::from_secs(3600))
    }
    fn is_established(&self) -> bool {
        self.received.len() >= 2
    }
    fn is_initiator(&self) -> bool {
        self.initiator
    }
    fn is_prot_ready(&self) -> bool {
        self.is_established()
    }
    fn is_transferable(&self) -> Result<bool, Error> {
        Ok(true)
    }
    fn source_name(&self) -> Result<Option<Box<dyn NameElement>>, Error> {
        Ok(None)
    }
    fn target_name(&self) -> Result<Option<Box<dyn NameElement>>, Error> {
        Ok(self.peer.clone().map(|peer| Box::new(peer) as Box<dyn NameElement>))
    }
    fn mechanism(&self) -> Result<Oid, Error> {
        Ok(oid::KRB5.clone())
    }
    fn delegated_credential(&self) -> Result<Option<Box<dyn CredentialElement>>, Error> {
        Ok(None)
    }
    fn init_sec_context(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.step(token)
    }
    fn accept_sec_context(&mut self, token: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.step(token)
    }
    fn wrap_size_limit(&self, _qop: u32, _confidential: bool, max_token_size: usize) -> Result<usize, Error> {
        Ok(max_token_size.saturating_sub(16))
    }
    fn wrap(&mut self, message: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error> {
        prop.confidential = true;
        Ok(message.iter().rev().copied().collect())
    }
    fn unwrap(&mut self, token: &[u8], prop: &mut MessageProp) -> Result<Vec<u8>, Error> {
        prop.confidential = true;
        Ok(token.iter().rev().copied().collect())
    }
    fn get_mic(&mut self, message: &[u8], _prop: &mut MessageProp) -> Result<Vec<u8>, Error> {
        Ok(vec![message.len() as u8])
    }
    fn verify_mic(&mut self, token: &[u8], message: &[u8], _prop: &mut MessageProp) -> Result<(), Error> {
        if token == [message.len() as u8] {
            Ok(())
        } else {
            Err(GssErrorCode::BAD_MIC.into())
        }
    }
    fn export(&mut self) -> Result<Vec<u8>, Error> {
        Ok(b"exported".to_vec())
    }
    fn dispose(&mut self) -> Result<(), Error> {
        self.counters.disposed_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MechanismEngine for MockEngine {
    type Name = MockName;
    type Credential = MockCredential;
    type Context = MockContext;

    fn import_name(&self, name: &str, name_type: &Oid) -> Result<MockName, Error> {
        if name.is_empty() {
            return Err(GssErrorCode::BAD_NAME.into());
        }
        Ok(MockName {
            info: self.info.clone(),
            name: name.to_owned(),
            name_type: name_type.clone(),
        })
    }
    fn import_name_bytes(&self, name: &[u8], name_type: &Oid) -> Result<MockName, Error> {
        let name = std::str::from_utf8(name).map_err(|_| Error::from(GssErrorCode::BAD_NAME))?;
        self.import_name(name, name_type)
    }
    fn acquire_credential(
        &self,
        name: Option<&MockName>,
        init_lifetime: Option<Duration>,
        accept_lifetime: Option<Duration>,
        usage: CredentialsUsage,
    ) -> Result<MockCredential, Error> {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        self.acquisitions.lock().push(Acquisition {
            name: name.map(ToString::to_string),
            init_lifetime,
            accept_lifetime,
            usage,
        });
        let name = match name {
            Some(name) => name.clone(),
            None => self.import_name("alice@EXAMPLE.ORG", &oid::NT_KRB5_PRINCIPAL)?,
        };
        Ok(MockCredential {
            info: self.info.clone(),
            name,
            init_lifetime,
            accept_lifetime,
            initiator: usage.can_initiate(),
            acceptor: usage.can_accept(),
            counters: self.counters.clone(),
        })
    }
    fn initiator_context(
        &self,
        peer: &MockName,
        _credential: Option<&MockCredential>,
        _lifetime: Option<Duration>,
    ) -> Result<MockContext, Error> {
        Ok(self.context(true, Some(peer.clone())))
    }
    fn acceptor_context(&self, _credential: Option<&MockCredential>) -> Result<MockContext, Error> {
        Ok(self.context(false, None))
    }
    fn import_context(&self, exported: &[u8]) -> Result<MockContext, Error> {
        if exported != b"exported".as_slice() {
            return Err(GssErrorCode::NO_CONTEXT.into());
        }
        Ok(self.context(false, None))
    }
}
impl MockEngine {
    fn context(&self, initiator: bool, peer: Option<MockName>) -> MockContext {
        MockContext {
            info: self.info.clone(),
            initiator,
            peer,
            received: Vec::new(),
            flags: ContextFlags::empty(),
            bindings: None,
            counters: self.counters.clone(),
        }
    }
}

/// Counts registry mutations on top of a [`MechanismRegistry`]
#[derive(Default)]
pub struct CountingRegistry {
    pub inner: MechanismRegistry,
    pub inserts: AtomicUsize,
    pub removes: AtomicUsize,
}
impl CountingRegistry {
    pub fn with_platform_defaults() -> Self {
        Self {
            inner: MechanismRegistry::with_platform_defaults(),
            ..Self::default()
        }
    }
}
impl ProviderRegistry for CountingRegistry {
    fn insert_at(&self, record: ProviderRecord, position: usize) -> Option<usize> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_at(record, position)
    }
    fn remove(&self, name: &str) -> Option<ProviderRecord> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(name)
    }
    fn get(&self, name: &str) -> Option<ProviderRecord> {
        self.inner.get(name)
    }
}
