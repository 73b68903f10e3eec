use thiserror::Error;

use weft_core::FlowError;

/// Errors raised while parsing, validating or assembling a flow document.
#[derive(Debug, Error)]
pub enum DslError {
    /// The YAML could not be parsed into a document
    #[error("failed to parse flow document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document declares a version this crate does not understand
    #[error("unsupported flow document version '{0}'")]
    UnsupportedVersion(String),

    /// The document is structurally invalid
    #[error("invalid flow document: {0}")]
    Validation(String),

    /// A referenced service could not be resolved or the definition failed
    /// to freeze
    #[error("failed to assemble flow '{flow}'")]
    Assembly {
        /// The flow being assembled
        flow: String,
        /// The underlying engine error
        #[source]
        source: FlowError,
    },
}
