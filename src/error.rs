use thiserror::Error;

/// Failures reported by the symbol oracle or by the engine while walking an
/// expression. Any of them aborts the top-level call that observed it.
#[derive(Debug, Error)]
pub enum PneError {
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),

    #[error("`{0}` is not an identifier")]
    NotAnIdentifier(String),

    #[error("cannot type `{0}`: {1}")]
    IllTyped(String, String),

    #[error("unsupported construct `{0}`")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = PneError> = std::result::Result<T, E>;
