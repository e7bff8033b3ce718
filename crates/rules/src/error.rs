use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with status {status}")]
    NonZeroExit { program: &'static str, status: i32 },
}

pub type RulesResult<T> = Result<T, RulesError>;
