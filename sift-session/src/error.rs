use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Deleting assets failed")]
    DeletionFailed { ids: Vec<String> },
    #[error("Encoding persisted state failed")]
    EncodingFailed(#[from] crate::store::codec::CodecError),
    #[error("File operation failed")]
    FileOperationFailed(#[from] std::io::Error),
    #[error("Library path is invalid")]
    InvalidLibraryPath,
    #[error("Asset source is unavailable")]
    SourceUnavailable,
    #[error("State directory could not be resolved")]
    StateDirUnresolved,
}
