//! Subcommands, run against a started dispatcher through its auth channel.

use anyhow::{Context, bail};
use auth_dispatcher::AuthDispatcherHandle;
use auth_dispatcher_sdk::{
    AuthMethod, AuthOutcome, AuthPayload, AuthRequest, AuthResponse, Credentials,
    LineConversation, ResponseSink,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tokio::sync::mpsc;

/// Sends one request and waits for its response.
async fn request(
    handle: &AuthDispatcherHandle,
    build: impl FnOnce(ResponseSink) -> AuthRequest,
) -> anyhow::Result<AuthResponse> {
    let (tx, mut rx) = mpsc::channel(1);
    let request = build(ResponseSink::new(&tx));
    // The sink holds the only sender left, so a dropped request ends `recv`.
    drop(tx);

    handle
        .sender()
        .send(request)
        .await
        .map_err(|_| anyhow::anyhow!("auth dispatcher is not running"))?;
    rx.recv()
        .await
        .context("auth dispatcher dropped the request")
}

async fn authenticate(
    handle: &AuthDispatcherHandle,
    method: AuthMethod,
    payload: AuthPayload,
) -> anyhow::Result<AuthOutcome> {
    match request(handle, |sink| AuthRequest::authenticate(method, payload, sink)).await? {
        AuthResponse::Authentication { outcome, .. } => Ok(outcome),
        AuthResponse::Implements { .. } => {
            bail!("unexpected response to an authentication request")
        }
    }
}

/// Methods the dispatcher can offer.
pub async fn implements(handle: &AuthDispatcherHandle) -> anyhow::Result<Vec<AuthMethod>> {
    match request(handle, AuthRequest::query_implements).await? {
        AuthResponse::Implements { methods, .. } => Ok(methods),
        AuthResponse::Authentication { .. } => bail!("unexpected response to an implements query"),
    }
}

/// Checks `user` with the password on the first line of `input`.
pub async fn check<R>(
    handle: &AuthDispatcherHandle,
    user: String,
    authzid: Option<String>,
    mut input: R,
) -> anyhow::Result<AuthOutcome>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if input
        .read_line(&mut line)
        .await
        .context("failed to read password")?
        == 0
    {
        bail!("no password on stdin");
    }
    let password = line.trim_end_matches(['\r', '\n']).to_owned();

    let credentials = Credentials::new(user, password).with_authzid(authzid.unwrap_or_default());
    authenticate(
        handle,
        AuthMethod::UsernameAndPassword,
        AuthPayload::Credentials(credentials),
    )
    .await
}

/// Runs a SASL exchange with a client speaking over `reader` and `writer`.
pub async fn sasl<R, W>(
    handle: &AuthDispatcherHandle,
    method: AuthMethod,
    prompt: &str,
    initial_response: Option<&str>,
    reader: R,
    writer: W,
) -> anyhow::Result<AuthOutcome>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut conversation = LineConversation::new(reader, writer, prompt);
    if let Some(encoded) = initial_response {
        conversation = conversation
            .with_initial_response(encoded)
            .context("invalid initial response")?;
    }

    authenticate(handle, method, AuthPayload::Channel(Box::new(conversation))).await
}

/// One-line result as printed by `check` and `sasl`.
#[must_use]
pub fn render(outcome: &AuthOutcome) -> String {
    match outcome.authed_user() {
        Some(user) => format!("OK {user}"),
        None => "FAIL".to_owned(),
    }
}
