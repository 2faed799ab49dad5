use crate::risk::FlowError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to create state directory: {0}")]
    StateDirCreation(std::io::Error),
    #[error("failed to read session storage: {0}")]
    StorageRead(std::io::Error),
    #[error("failed to write session storage: {0}")]
    StorageWrite(std::io::Error),
    #[error("failed to serialize session: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize session: {0}")]
    Deserialization(serde_json::Error),

    #[error("assessment flow error: {0}")]
    Flow(#[from] FlowError),
}

impl From<hrc_types::TextError> for ConsoleError {
    fn from(err: hrc_types::TextError) -> Self {
        ConsoleError::InvalidInput(err.to_string())
    }
}

pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;
