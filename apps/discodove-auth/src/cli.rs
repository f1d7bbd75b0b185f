//! Command-line interface.

use std::path::PathBuf;

use auth_dispatcher_sdk::AuthMethod;
use auth_dispatcher_sdk::sasl::IMAP_PROMPT;
use clap::{Parser, Subcommand, ValueEnum};

/// discodove authentication dispatcher
#[derive(Debug, Parser)]
#[command(name = "discodove-auth", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the methods that can be offered to clients, one per line
    Implements,

    /// Check a password read from stdin; prints `OK <user>` or `FAIL`
    Check {
        /// Authentication identity
        #[arg(long)]
        user: String,

        /// Identity the session should run as, if not the user itself
        #[arg(long)]
        authzid: Option<String>,
    },

    /// Run a SASL exchange with a client on stdin/stdout
    Sasl {
        #[arg(long, value_enum, ignore_case = true)]
        mechanism: Mechanism,

        /// Prefix written before every challenge: `+ ` for IMAP, `334 ` for SMTP
        #[arg(long, default_value = IMAP_PROMPT)]
        prompt: String,

        /// Base64 initial response sent along with the mechanism (`=` for empty)
        #[arg(long, value_name = "B64")]
        initial_response: Option<String>,
    },
}

/// SASL mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mechanism {
    Login,
    Plain,
}

impl Mechanism {
    #[must_use]
    pub fn method(self) -> AuthMethod {
        match self {
            Self::Login => AuthMethod::SaslLogin,
            Self::Plain => AuthMethod::SaslPlain,
        }
    }
}
