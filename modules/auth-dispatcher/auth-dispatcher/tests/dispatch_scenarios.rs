#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end scenarios over the auth channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use auth_dispatcher::{AuthDispatcher, AuthDispatcherConfig, AuthDispatcherHandle, PluginEntry};
use auth_dispatcher_sdk::sasl::{IMAP_PROMPT, SMTP_PROMPT};
use auth_dispatcher_sdk::{
    AuthDispatcherClient, AuthMethod, AuthOutcome, AuthPayload, AuthPlugin, AuthPluginError,
    AuthRequest, AuthResponse, Credentials, InitializationError, LineConversation, PluginContext,
    ResponseSink,
};
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Accepts `alice`/`secret`, and lets `admin` act as anyone.
struct Directory {
    methods: Vec<AuthMethod>,
    calls: AtomicUsize,
    delay: Duration,
}

impl Directory {
    fn new(methods: &[AuthMethod]) -> Arc<Self> {
        Arc::new(Self {
            methods: methods.to_vec(),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    fn slow(methods: &[AuthMethod], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            methods: methods.to_vec(),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthPlugin for Directory {
    async fn initialize(&self, _ctx: &PluginContext) -> Result<(), InitializationError> {
        Ok(())
    }

    fn implements(&self) -> Vec<AuthMethod> {
        self.methods.clone()
    }

    async fn auth_basic_username_password(
        &self,
        credentials: &Credentials,
    ) -> Result<String, AuthPluginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let valid = matches!(
            (credentials.authcid(), credentials.password().expose_secret()),
            ("alice", "secret") | ("admin", "root")
        );
        if !valid {
            return Err(AuthPluginError::InvalidCredentials);
        }

        match credentials.authzid() {
            Some(authzid) if credentials.authcid() == "admin" => Ok(authzid.to_owned()),
            Some(authzid) if authzid != credentials.authcid() => {
                Err(AuthPluginError::DelegationDenied {
                    authcid: credentials.authcid().to_owned(),
                    authzid: authzid.to_owned(),
                })
            }
            _ => Ok(credentials.authcid().to_owned()),
        }
    }
}

async fn start_with(plugins: Vec<(&str, Arc<Directory>)>) -> AuthDispatcherHandle {
    let mut dispatcher = AuthDispatcher::new(AuthDispatcherConfig::default());
    for (name, plugin) in plugins {
        dispatcher = dispatcher.with_plugin(name, plugin);
    }
    dispatcher.start().await.unwrap()
}

async fn round_trip(
    handle: &AuthDispatcherHandle,
    build: impl FnOnce(ResponseSink) -> AuthRequest,
) -> AuthResponse {
    let (tx, mut rx) = mpsc::channel(1);
    let request = build(ResponseSink::new(&tx));
    let id = request.id;
    handle.sender().send(request).await.unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("dispatcher answered")
        .expect("response channel open");
    assert_eq!(response.request_id(), id);
    response
}

async fn authenticate(
    handle: &AuthDispatcherHandle,
    method: AuthMethod,
    payload: AuthPayload,
) -> AuthOutcome {
    let response = round_trip(handle, |sink| {
        AuthRequest::authenticate(method, payload, sink)
    })
    .await;
    match response {
        AuthResponse::Authentication { outcome, .. } => outcome,
        other => panic!("unexpected response: {other:?}"),
    }
}

fn password(authcid: &str, password: &str) -> AuthPayload {
    AuthPayload::Credentials(Credentials::new(authcid, password))
}

#[tokio::test]
async fn query_implements_adds_derived_login() {
    let handle = start_with(vec![(
        "a",
        Directory::new(&[AuthMethod::UsernameAndPassword]),
    )])
    .await;

    let response = round_trip(&handle, AuthRequest::query_implements).await;

    assert!(matches!(
        response,
        AuthResponse::Implements { methods, .. }
            if methods == [AuthMethod::UsernameAndPassword, AuthMethod::SaslLogin]
    ));
    handle.shutdown().await;
}

#[tokio::test]
async fn alice_authenticates_and_wrong_password_fails() {
    let handle = start_with(vec![(
        "a",
        Directory::new(&[AuthMethod::UsernameAndPassword]),
    )])
    .await;

    let ok = authenticate(
        &handle,
        AuthMethod::UsernameAndPassword,
        password("alice", "secret"),
    )
    .await;
    let fail = authenticate(
        &handle,
        AuthMethod::UsernameAndPassword,
        password("alice", "nope"),
    )
    .await;

    assert_eq!(ok, AuthOutcome::ok("alice"));
    assert_eq!(fail, AuthOutcome::Fail);
    handle.shutdown().await;
}

#[tokio::test]
async fn zero_plugins_fail_sasl_plain() {
    let handle = start_with(Vec::new()).await;
    let (client_side, server_side) = tokio::io::duplex(256);
    let (reader, writer) = tokio::io::split(server_side);
    let channel = LineConversation::new(BufReader::new(reader), writer, IMAP_PROMPT);

    let outcome = authenticate(
        &handle,
        AuthMethod::SaslPlain,
        AuthPayload::Channel(Box::new(channel)),
    )
    .await;

    assert_eq!(outcome, AuthOutcome::Fail);
    drop(client_side);
    handle.shutdown().await;
}

#[tokio::test]
async fn delegation_is_left_to_the_plugin() {
    let handle = start_with(vec![(
        "a",
        Directory::new(&[AuthMethod::UsernameAndPassword]),
    )])
    .await;

    let admin_as_bob = authenticate(
        &handle,
        AuthMethod::UsernameAndPassword,
        AuthPayload::Credentials(Credentials::new("admin", "root").with_authzid("bob")),
    )
    .await;
    let alice_as_bob = authenticate(
        &handle,
        AuthMethod::UsernameAndPassword,
        AuthPayload::Credentials(Credentials::new("alice", "secret").with_authzid("bob")),
    )
    .await;

    assert_eq!(admin_as_bob.authed_user(), Some("bob"));
    assert_eq!(alice_as_bob, AuthOutcome::Fail);
    handle.shutdown().await;
}

#[tokio::test]
async fn login_over_a_line_conversation() {
    let handle = start_with(vec![(
        "a",
        Directory::new(&[AuthMethod::UsernameAndPassword]),
    )])
    .await;
    let (client_side, server_side) = tokio::io::duplex(256);
    let (reader, writer) = tokio::io::split(server_side);
    let channel = LineConversation::new(BufReader::new(reader), writer, SMTP_PROMPT);

    let client = tokio::spawn(async move {
        let (client_reader, mut client_writer) = tokio::io::split(client_side);
        let mut lines = BufReader::new(client_reader).lines();

        let first = lines.next_line().await.unwrap().unwrap();
        client_writer.write_all(b"YWxpY2U=\r\n").await.unwrap();
        let second = lines.next_line().await.unwrap().unwrap();
        client_writer.write_all(b"c2VjcmV0\r\n").await.unwrap();
        (first, second)
    });

    let outcome = authenticate(
        &handle,
        AuthMethod::SaslLogin,
        AuthPayload::Channel(Box::new(channel)),
    )
    .await;
    let (first, second) = client.await.unwrap();

    assert_eq!(outcome, AuthOutcome::ok("alice"));
    assert_eq!(first, "334 VXNlcm5hbWU6");
    assert_eq!(second, "334 UGFzc3dvcmQ6");
    handle.shutdown().await;
}

#[tokio::test]
async fn concurrent_requests_each_get_one_answer() {
    let directory = Directory::slow(
        &[AuthMethod::UsernameAndPassword],
        Duration::from_millis(50),
    );
    let handle = start_with(vec![("a", directory.clone())]).await;
    let (tx, mut rx) = mpsc::channel(32);

    let mut ids = Vec::new();
    for i in 0..16 {
        let secret = if i % 2 == 0 { "secret" } else { "wrong" };
        let request = AuthRequest::authenticate(
            AuthMethod::UsernameAndPassword,
            password("alice", secret),
            ResponseSink::new(&tx),
        );
        ids.push(request.id);
        handle.sender().send(request).await.unwrap();
    }

    let mut answered = Vec::new();
    for _ in 0..16 {
        let response = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        answered.push(response.request_id());
    }
    answered.sort_unstable();
    ids.sort_unstable();

    assert_eq!(answered, ids);
    assert!(rx.try_recv().is_err());
    assert_eq!(directory.calls(), 16);
    handle.shutdown().await;
}

#[tokio::test]
async fn request_deadline_fails_a_slow_plugin() {
    let handle = start_with(vec![(
        "slow",
        Directory::slow(&[AuthMethod::UsernameAndPassword], Duration::from_secs(10)),
    )])
    .await;

    let response = round_trip(&handle, |sink| {
        AuthRequest::authenticate(
            AuthMethod::UsernameAndPassword,
            password("alice", "secret"),
            sink,
        )
        .with_deadline(Duration::from_millis(20))
    })
    .await;

    assert!(matches!(
        response,
        AuthResponse::Authentication {
            outcome: AuthOutcome::Fail,
            ..
        }
    ));
    handle.shutdown().await;
}

#[tokio::test]
async fn first_configured_plugin_services_the_method() {
    let primary = Directory::new(&[AuthMethod::UsernameAndPassword]);
    let secondary = Directory::new(&[AuthMethod::UsernameAndPassword]);
    let cfg = AuthDispatcherConfig {
        plugins: vec![
            PluginEntry::new("secondary", Value::Null),
            PluginEntry::new("primary", Value::Null),
        ],
        ..AuthDispatcherConfig::default()
    };
    let handle = AuthDispatcher::new(cfg)
        .with_plugin("primary", primary.clone())
        .with_plugin("secondary", secondary.clone())
        .start()
        .await
        .unwrap();

    for _ in 0..3 {
        authenticate(
            &handle,
            AuthMethod::UsernameAndPassword,
            password("alice", "secret"),
        )
        .await;
    }

    assert_eq!(secondary.calls(), 3);
    assert_eq!(primary.calls(), 0);
    handle.shutdown().await;
}

#[tokio::test]
async fn local_client_matches_the_channel() {
    let handle = start_with(vec![(
        "a",
        Directory::new(&[AuthMethod::UsernameAndPassword]),
    )])
    .await;
    let client = handle.client();

    assert_eq!(
        client.implements(),
        vec![AuthMethod::UsernameAndPassword, AuthMethod::SaslLogin]
    );
    let outcome = client
        .authenticate(AuthMethod::UsernameAndPassword, password("alice", "secret"))
        .await;
    assert_eq!(outcome.authed_user(), Some("alice"));
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_answers_in_flight_and_queued_requests() {
    let directory = Directory::slow(
        &[AuthMethod::UsernameAndPassword],
        Duration::from_millis(50),
    );
    let handle = start_with(vec![("a", directory.clone())]).await;
    let sender = handle.sender();
    let (tx, mut rx) = mpsc::channel(16);

    let mut ids = Vec::new();
    for _ in 0..2 {
        let request = AuthRequest::authenticate(
            AuthMethod::UsernameAndPassword,
            password("alice", "secret"),
            ResponseSink::new(&tx),
        );
        ids.push(request.id);
        sender.send(request).await.unwrap();
    }
    // Let the loop pick these up so they are in flight at shutdown.
    tokio::task::yield_now().await;
    for _ in 0..3 {
        let request = AuthRequest::query_implements(ResponseSink::new(&tx));
        ids.push(request.id);
        sender.try_send(request).unwrap();
    }

    handle.shutdown().await;

    let mut answered = Vec::new();
    for _ in 0..ids.len() {
        let response = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("every accepted request is answered")
            .unwrap();
        if let AuthResponse::Authentication { outcome, .. } = &response {
            assert_eq!(outcome.authed_user(), Some("alice"));
        }
        answered.push(response.request_id());
    }
    answered.sort_unstable();
    ids.sort_unstable();

    assert_eq!(answered, ids);
    assert!(rx.try_recv().is_err());
    assert_eq!(directory.calls(), 2);

    let late = AuthRequest::query_implements(ResponseSink::new(&tx));
    assert!(sender.send(late).await.is_err());
}
