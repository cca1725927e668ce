use thiserror::Error;

/// Top-level error type for the cvgate intake pipeline.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("upload contains no file data")]
    EmptyUpload,

    #[error("no file field present in the request")]
    MissingFile,

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("scanner error: {0}")]
    Scanner(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("stored object {name} missing from container {container} after write")]
    StorageVerify { container: String, name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntakeError {
    /// Whether this error was caused by the client's request rather than
    /// a fault in the service or its dependencies.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IntakeError::UnsupportedContentType(_)
                | IntakeError::EmptyUpload
                | IntakeError::MissingFile
                | IntakeError::MalformedBody(_)
        )
    }
}
