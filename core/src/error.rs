use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Fitting was attempted on zero documents.
    #[error("cannot fit vectorizer on an empty corpus")]
    EmptyCorpus,
    #[error("record store: {0}")]
    Store(#[from] sled::Error),
    #[error("record encoding: {0}")]
    Codec(#[from] bincode::Error),
    #[error("content storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("unknown content storage backend: {0}")]
    UnknownBackend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
