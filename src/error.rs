//! Error type shared by the library and the `inkpost` binary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML in '{}': {source}", path.display())]
    TomlDecode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("toml serialization error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A key binding string such as `"Ctrl+H"` could not be understood.
    #[error("invalid key binding '{binding}': {reason}")]
    InvalidKeyBinding { binding: String, reason: String },

    #[error("unknown replace strategy '{0}' (expected 'markup' or 'text-nodes')")]
    UnknownStrategy(String),

    /// Tokens such as `""`, `"null"` or `"undefined"` cannot start a session.
    #[error("session token is missing or unusable")]
    InvalidToken,

    #[error("you must be signed in to {0}")]
    NotSignedIn(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("no block at index {0}")]
    InvalidBlock(usize),

    #[error("search pattern could not be compiled: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
