use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputRelayError {
    #[error("Failed to dispatch input message: {0}")]
    Dispatch(String),

    #[error("Input stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input relay task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, InputRelayError>;
