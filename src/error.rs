//! Error type shared by the stores, the sheet backends and the web layer.

use thiserror::Error;

/// Errors raised while talking to the spreadsheet service or loading config
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[cfg(feature = "web")]
    #[error("request to spreadsheet service failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("spreadsheet service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The service answered with something we could not interpret
    #[error("malformed response from spreadsheet service: {0}")]
    Malformed(String),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "web")]
    #[error("xlsx export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, Error>;
