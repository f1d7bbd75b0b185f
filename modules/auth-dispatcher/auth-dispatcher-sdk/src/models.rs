//! Domain models for the auth dispatcher.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::PostError;
use crate::sasl::SaslChannel;

/// Authentication methods a plugin can service.
///
/// The numeric codes follow the order the methods were first published in
/// and are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Plain username and password check.
    ///
    /// Declaring it also makes the plugin available for [`AuthMethod::SaslLogin`].
    #[serde(alias = "basic")]
    UsernameAndPassword,
    /// SASL `LOGIN` mechanism.
    #[serde(alias = "login", alias = "LOGIN")]
    SaslLogin,
    /// SASL `PLAIN` mechanism (RFC 4616). Must be declared explicitly.
    #[serde(alias = "plain", alias = "PLAIN")]
    SaslPlain,
}

impl AuthMethod {
    /// All methods, in code order.
    pub const ALL: [Self; 3] = [Self::UsernameAndPassword, Self::SaslLogin, Self::SaslPlain];

    /// Stable numeric code of the method.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::UsernameAndPassword => 0,
            Self::SaslLogin => 1,
            Self::SaslPlain => 2,
        }
    }

    /// Configuration name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsernameAndPassword => "username_and_password",
            Self::SaslLogin => "sasl_login",
            Self::SaslPlain => "sasl_plain",
        }
    }

    /// SASL mechanism name as advertised to clients, if this is a SASL method.
    #[must_use]
    pub const fn sasl_mechanism(self) -> Option<&'static str> {
        match self {
            Self::UsernameAndPassword => None,
            Self::SaslLogin => Some("LOGIN"),
            Self::SaslPlain => Some("PLAIN"),
        }
    }

    /// Whether requests for this method carry a SASL channel rather than credentials.
    #[must_use]
    pub const fn is_sasl(self) -> bool {
        self.sasl_mechanism().is_some()
    }

    /// Looks a method up by its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::UsernameAndPassword),
            1 => Some(Self::SaslLogin),
            2 => Some(Self::SaslPlain),
            _ => None,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known [`AuthMethod`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown authentication method '{0}'")]
pub struct ParseAuthMethodError(String);

impl FromStr for AuthMethod {
    type Err = ParseAuthMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "username_and_password" | "basic" => Ok(Self::UsernameAndPassword),
            "sasl_login" | "login" => Ok(Self::SaslLogin),
            "sasl_plain" | "plain" => Ok(Self::SaslPlain),
            _ => Err(ParseAuthMethodError(s.to_owned())),
        }
    }
}

/// Username/password credentials.
///
/// `authcid` is the identity whose password is checked; `authzid`, when
/// present, is the identity the session should run as.
#[derive(Debug, Clone)]
pub struct Credentials {
    authcid: String,
    authzid: Option<String>,
    /// Wrapped in `SecretString` so `Debug` redacts the value automatically.
    password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(authcid: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            authcid: authcid.into(),
            authzid: None,
            password: password.into(),
        }
    }

    /// Sets the authorization identity. An empty string clears it.
    #[must_use]
    pub fn with_authzid(mut self, authzid: impl Into<String>) -> Self {
        let authzid = authzid.into();
        self.authzid = (!authzid.is_empty()).then_some(authzid);
        self
    }

    #[must_use]
    pub fn authcid(&self) -> &str {
        &self.authcid
    }

    #[must_use]
    pub fn authzid(&self) -> Option<&str> {
        self.authzid.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// True when the session should run as someone other than `authcid`.
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        self.authzid().is_some_and(|authzid| authzid != self.authcid)
    }
}

/// What a caller hands over to be authenticated.
///
/// Credential methods carry [`Credentials`]; SASL methods carry a channel
/// over which the exchange with the client runs.
pub enum AuthPayload {
    Credentials(Credentials),
    Channel(SaslChannel),
}

impl AuthPayload {
    /// Whether this payload is the right shape for `method`.
    #[must_use]
    pub fn suits(&self, method: AuthMethod) -> bool {
        match self {
            Self::Credentials(_) => !method.is_sasl(),
            Self::Channel(_) => method.is_sasl(),
        }
    }
}

impl fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials(credentials) => {
                f.debug_tuple("Credentials").field(credentials).finish()
            }
            Self::Channel(_) => f.write_str("Channel(..)"),
        }
    }
}

/// What the caller wants from the dispatcher.
#[derive(Debug)]
pub enum AuthRequestKind {
    /// List the methods that can be offered to clients.
    QueryImplements,
    /// Authenticate using `method`.
    PerformAuthentication {
        method: AuthMethod,
        payload: AuthPayload,
    },
}

/// A request sent down the dispatcher's auth channel.
#[derive(Debug)]
pub struct AuthRequest {
    /// Correlates the response with this request.
    pub id: Uuid,
    pub kind: AuthRequestKind,
    /// Overrides the dispatcher's default plugin timeout for this request.
    pub deadline: Option<Duration>,
    /// Where the single response is posted.
    pub reply: ResponseSink,
}

impl AuthRequest {
    #[must_use]
    pub fn query_implements(reply: ResponseSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: AuthRequestKind::QueryImplements,
            deadline: None,
            reply,
        }
    }

    #[must_use]
    pub fn authenticate(method: AuthMethod, payload: AuthPayload, reply: ResponseSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: AuthRequestKind::PerformAuthentication { method, payload },
            deadline: None,
            reply,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Response destination attached to a request.
///
/// Wraps a clone of the caller's sender. Posting consumes the sink, so at
/// most one response is ever delivered per request. The caller keeps its
/// own sender, so the channel is never closed from the dispatcher side.
#[derive(Debug)]
pub struct ResponseSink {
    tx: mpsc::Sender<AuthResponse>,
}

impl ResponseSink {
    #[must_use]
    pub fn new(tx: &mpsc::Sender<AuthResponse>) -> Self {
        Self { tx: tx.clone() }
    }

    /// Posts the response without waiting.
    ///
    /// # Errors
    ///
    /// - `Full` if the caller's buffer has no free slot
    /// - `Closed` if the caller dropped its receiver
    pub fn post(self, response: AuthResponse) -> Result<(), PostError> {
        self.tx.try_send(response).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PostError::Full,
            mpsc::error::TrySendError::Closed(_) => PostError::Closed,
        })
    }
}

/// Result of an authentication attempt.
///
/// A failed attempt carries no identity and no reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Start the session as `authed_user`.
    Ok { authed_user: String },
    Fail,
}

impl AuthOutcome {
    #[must_use]
    pub fn ok(authed_user: impl Into<String>) -> Self {
        Self::Ok {
            authed_user: authed_user.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The user the session is for, if authentication succeeded.
    #[must_use]
    pub fn authed_user(&self) -> Option<&str> {
        match self {
            Self::Ok { authed_user } => Some(authed_user),
            Self::Fail => None,
        }
    }
}

/// The dispatcher's answer to an [`AuthRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// Answer to [`AuthRequestKind::QueryImplements`].
    Implements {
        request_id: Uuid,
        methods: Vec<AuthMethod>,
    },
    /// Answer to [`AuthRequestKind::PerformAuthentication`].
    Authentication {
        request_id: Uuid,
        outcome: AuthOutcome,
    },
}

impl AuthResponse {
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::Implements { request_id, .. } | Self::Authentication { request_id, .. } => {
                *request_id
            }
        }
    }
}
