use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Failure of a whole XML to JSON conversion.
///
/// Every variant renders as "XML conversion failed: ..." so callers can treat
/// them as a single kind while still seeing the underlying cause.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("XML conversion failed: empty XML document")]
    EmptyInput,
    #[error("XML conversion failed: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("XML conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading a replacement extension set.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("failed to read extension file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid extension file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
