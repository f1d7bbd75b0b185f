//! Stub plugins and channels shared by the dispatcher's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use auth_dispatcher_sdk::{
    AuthMethod, AuthPlugin, AuthPluginError, Credentials, InitializationError, LogFacility,
    PluginConfig, PluginContext, SaslChannel, SaslConversation, SaslError,
};

pub enum Behavior {
    /// Return the authzid when present, the authcid otherwise.
    Accept,
    /// Return this identity regardless of input.
    Return(String),
    Reject,
    Sleep(Duration),
    Panic,
}

pub struct StubPlugin {
    methods: Mutex<Vec<AuthMethod>>,
    behavior: Behavior,
    init_fails: bool,
    init_calls: AtomicUsize,
    implements_calls: AtomicUsize,
    auth_calls: AtomicUsize,
    last_claimed: Mutex<Option<(String, Option<String>)>>,
}

impl StubPlugin {
    fn build(methods: &[AuthMethod], behavior: Behavior, init_fails: bool) -> Arc<Self> {
        Arc::new(Self {
            methods: Mutex::new(methods.to_vec()),
            behavior,
            init_fails,
            init_calls: AtomicUsize::new(0),
            implements_calls: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
            last_claimed: Mutex::new(None),
        })
    }

    pub fn accepting(methods: &[AuthMethod]) -> Arc<Self> {
        Self::build(methods, Behavior::Accept, false)
    }

    pub fn returning(methods: &[AuthMethod], identity: &str) -> Arc<Self> {
        Self::build(methods, Behavior::Return(identity.to_owned()), false)
    }

    pub fn rejecting(methods: &[AuthMethod]) -> Arc<Self> {
        Self::build(methods, Behavior::Reject, false)
    }

    pub fn sleeping(methods: &[AuthMethod], delay: Duration) -> Arc<Self> {
        Self::build(methods, Behavior::Sleep(delay), false)
    }

    pub fn panicking(methods: &[AuthMethod]) -> Arc<Self> {
        Self::build(methods, Behavior::Panic, false)
    }

    pub fn failing_init(methods: &[AuthMethod]) -> Arc<Self> {
        Self::build(methods, Behavior::Accept, true)
    }

    pub fn set_methods(&self, methods: &[AuthMethod]) {
        *self.methods.lock().unwrap() = methods.to_vec();
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn implements_calls(&self) -> usize {
        self.implements_calls.load(Ordering::SeqCst)
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    /// `(authcid, authzid)` of the last credentials the plugin saw.
    pub fn last_claimed(&self) -> Option<(String, Option<String>)> {
        self.last_claimed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthPlugin for StubPlugin {
    async fn initialize(&self, _ctx: &PluginContext) -> Result<(), InitializationError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.init_fails {
            return Err(InitializationError::Backend("directory unreachable".to_owned()));
        }
        Ok(())
    }

    fn implements(&self) -> Vec<AuthMethod> {
        self.implements_calls.fetch_add(1, Ordering::SeqCst);
        self.methods.lock().unwrap().clone()
    }

    async fn auth_basic_username_password(
        &self,
        credentials: &Credentials,
    ) -> Result<String, AuthPluginError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_claimed.lock().unwrap() = Some((
            credentials.authcid().to_owned(),
            credentials.authzid().map(str::to_owned),
        ));

        match &self.behavior {
            Behavior::Accept => Ok(credentials
                .authzid()
                .unwrap_or(credentials.authcid())
                .to_owned()),
            Behavior::Return(identity) => Ok(identity.clone()),
            Behavior::Reject => Err(AuthPluginError::InvalidCredentials),
            Behavior::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(credentials.authcid().to_owned())
            }
            Behavior::Panic => panic!("stub plugin exploded"),
        }
    }
}

pub fn plugin_ctx(name: &str) -> PluginContext {
    PluginContext::new("discodove", name, LogFacility::Mail, PluginConfig::empty())
}

/// Conversation replaying canned client responses.
pub struct ScriptedChannel {
    initial: Option<Vec<u8>>,
    responses: Vec<Vec<u8>>,
    challenges: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ScriptedChannel {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            initial: None,
            responses: responses.iter().rev().map(|r| r.as_bytes().to_vec()).collect(),
            challenges: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_initial(mut self, initial: &[u8]) -> Self {
        self.initial = Some(initial.to_vec());
        self
    }

    /// Handle to the challenges the server sent, readable after the channel is moved.
    pub fn challenges(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.challenges)
    }

    pub fn boxed(self) -> SaslChannel {
        Box::new(self)
    }
}

#[async_trait]
impl SaslConversation for ScriptedChannel {
    async fn exchange(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        self.challenges.lock().unwrap().push(challenge.to_vec());
        self.responses.pop().ok_or(SaslError::Aborted)
    }

    fn take_initial_response(&mut self) -> Option<Vec<u8>> {
        self.initial.take()
    }
}
