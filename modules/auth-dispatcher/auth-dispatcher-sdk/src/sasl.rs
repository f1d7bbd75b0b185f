//! SASL exchange helpers.
//!
//! The dispatcher never speaks a mail protocol itself. The calling server
//! wraps its connection in a [`SaslConversation`] and the plugin (or the
//! dispatcher, for derived `LOGIN` support) drives the challenge/response
//! exchange through it.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::SaslError;
use crate::models::Credentials;

/// Maximum length of a single client response line, terminator included.
pub const MAX_RESPONSE_LINE: usize = 8 * 1024;

/// IMAP continuation prompt.
pub const IMAP_PROMPT: &str = "+ ";

/// SMTP `AUTH` continuation prompt.
pub const SMTP_PROMPT: &str = "334 ";

const LOGIN_USERNAME_CHALLENGE: &[u8] = b"Username:";
const LOGIN_PASSWORD_CHALLENGE: &[u8] = b"Password:";

/// Boxed conversation carried by SASL requests.
pub type SaslChannel = Box<dyn SaslConversation>;

/// One side of a SASL challenge/response exchange with a client.
#[async_trait]
pub trait SaslConversation: Send {
    /// Sends `challenge` to the client and returns its decoded response.
    ///
    /// # Errors
    ///
    /// - `Aborted` if the client cancels the exchange
    /// - `Malformed` if the response cannot be decoded
    /// - `Io` if the connection fails
    async fn exchange(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError>;

    /// Takes the initial response the client sent along with the mechanism
    /// name, if any. Returns `None` on every later call.
    fn take_initial_response(&mut self) -> Option<Vec<u8>>;
}

/// [`SaslConversation`] over a line-oriented text connection.
///
/// Challenges go out as `<prompt><base64>\r\n`; each client line is
/// base64-decoded. A line holding a single `*` aborts the exchange.
pub struct LineConversation<R, W> {
    reader: R,
    writer: W,
    prompt: String,
    initial_response: Option<Vec<u8>>,
}

impl<R, W> LineConversation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(reader: R, writer: W, prompt: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            prompt: prompt.into(),
            initial_response: None,
        }
    }

    /// Attaches the base64 initial response the client sent with the
    /// mechanism name. `=` stands for an empty response.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if `encoded` is not valid base64.
    pub fn with_initial_response(mut self, encoded: &str) -> Result<Self, SaslError> {
        self.initial_response = Some(decode_line(encoded)?);
        Ok(self)
    }

    /// Gives the underlying reader and writer back.
    #[must_use]
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    async fn read_line(&mut self) -> Result<String, SaslError> {
        let mut line = Vec::new();
        let limit = MAX_RESPONSE_LINE as u64;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await?;

        if read == 0 {
            return Err(SaslError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        if line.last() != Some(&b'\n') {
            if line.len() >= MAX_RESPONSE_LINE {
                self.skip_line().await?;
                return Err(SaslError::LineTooLong {
                    limit: MAX_RESPONSE_LINE,
                });
            }
            return Err(SaslError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }

        let text = String::from_utf8(line)
            .map_err(|_| SaslError::Malformed("response is not valid UTF-8".to_owned()))?;
        Ok(text.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Discards input up to and including the next `\n`, so the next read
    /// starts on a fresh line.
    async fn skip_line(&mut self) -> Result<(), SaslError> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            let (consumed, done) = match available.iter().position(|b| *b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            };
            self.reader.consume(consumed);
            if done {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl<R, W> SaslConversation for LineConversation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn exchange(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        let line = format!("{}{}\r\n", self.prompt, BASE64.encode(challenge));
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let response = self.read_line().await?;
        if response == "*" {
            return Err(SaslError::Aborted);
        }
        decode_line(&response)
    }

    fn take_initial_response(&mut self) -> Option<Vec<u8>> {
        self.initial_response.take()
    }
}

fn decode_line(encoded: &str) -> Result<Vec<u8>, SaslError> {
    let encoded = encoded.trim();
    if encoded.is_empty() || encoded == "=" {
        return Ok(Vec::new());
    }
    BASE64
        .decode(encoded)
        .map_err(|e| SaslError::Malformed(format!("invalid base64: {e}")))
}

fn utf8_field(bytes: &[u8], field: &str) -> Result<String, SaslError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| SaslError::Malformed(format!("{field} is not valid UTF-8")))
}

/// Parses an RFC 4616 `PLAIN` message: `[authzid] NUL authcid NUL passwd`.
///
/// # Errors
///
/// Returns `Malformed` unless the message has exactly three fields, valid
/// UTF-8, and a non-empty authcid and password.
pub fn parse_plain_message(message: &[u8]) -> Result<Credentials, SaslError> {
    let fields: Vec<&[u8]> = message.split(|b| *b == 0).collect();
    let [authzid, authcid, password] = fields.as_slice() else {
        return Err(SaslError::Malformed(format!(
            "expected 3 NUL-separated fields, got {}",
            fields.len()
        )));
    };

    if authcid.is_empty() {
        return Err(SaslError::Malformed("empty authcid".to_owned()));
    }
    if password.is_empty() {
        return Err(SaslError::Malformed("empty password".to_owned()));
    }

    let authzid = utf8_field(authzid, "authzid")?;
    let authcid = utf8_field(authcid, "authcid")?;
    let password = utf8_field(password, "password")?;

    Ok(Credentials::new(authcid, password).with_authzid(authzid))
}

/// Runs the server side of a `PLAIN` exchange and returns the client's credentials.
///
/// # Errors
///
/// Propagates conversation failures and [`parse_plain_message`] errors.
pub async fn run_plain_exchange(
    conversation: &mut dyn SaslConversation,
) -> Result<Credentials, SaslError> {
    let message = match conversation.take_initial_response() {
        Some(initial) => initial,
        None => conversation.exchange(b"").await?,
    };
    parse_plain_message(&message)
}

/// Runs the server side of a `LOGIN` exchange and returns the client's credentials.
///
/// `LOGIN` carries no authorization identity.
///
/// # Errors
///
/// Propagates conversation failures; returns `Malformed` for an empty
/// username or non-UTF-8 input.
pub async fn run_login_exchange(
    conversation: &mut dyn SaslConversation,
) -> Result<Credentials, SaslError> {
    let username = match conversation.take_initial_response() {
        Some(initial) if !initial.is_empty() => initial,
        _ => conversation.exchange(LOGIN_USERNAME_CHALLENGE).await?,
    };
    let username = utf8_field(&username, "username")?;
    if username.is_empty() {
        return Err(SaslError::Malformed("empty username".to_owned()));
    }

    let password = conversation.exchange(LOGIN_PASSWORD_CHALLENGE).await?;
    let password = utf8_field(&password, "password")?;

    Ok(Credentials::new(username, password))
}
