use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Payload(#[from] feint_payload::PayloadError),
}

pub type EngineResult<T> = Result<T, EngineError>;
