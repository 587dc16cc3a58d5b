use std::path::PathBuf;
use thiserror::Error;

/// Failures while building a notification archive. Each variant names the step and,
/// where relevant, the entry that failed.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// One of the token maps could not be rendered as JSON.
    #[error("failed to serialize {category}: {source}")]
    Serialize {
        category: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to create archive file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create archive entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to write archive entry {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Central directory could not be written or flushed.
    #[error("failed to finalize archive {}: {source}", path.display())]
    Finish {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Size/checksum of the finished file could not be read back.
    #[error("failed to inspect archive {}: {source}", path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures raised by a single channel send.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("missing {0} in configuration")]
    MissingCredential(&'static str),

    #[error("failed to read attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered but refused the request.
    #[error("{service} API returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid mail address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("failed to build mail: {0}")]
    MailBuild(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
