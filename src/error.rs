use std::path::PathBuf;

/// Failures that stop a run before or while the baseline is established.
/// Per-probe and per-candidate failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid domain '{0}': expected <label>.<extension> without a scheme")]
    InvalidDomain(String),

    #[error("failed to fetch content from {0} over http or https")]
    BaselineContent(String),

    #[error("failed to fetch IP address for {0}")]
    BaselineAddress(String),

    #[error("failed to read brand dictionary {}", path.display())]
    BrandDictionaryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse brand dictionary {}", path.display())]
    BrandDictionaryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
