use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("record not found")]
    NotFound,

    #[error("password unmatch")]
    PasswordMismatch,

    #[error("email address is already used")]
    EmailTaken,

    #[error("start transaction failed")]
    Begin(#[source] rusqlite::Error),

    #[error("transaction: operation failed")]
    TransactionFailed(#[source] Box<Error>),

    #[error("transaction panicked: {0}")]
    TransactionPanicked(String),

    #[error("transaction already committed")]
    AlreadyCommitted,

    #[error("transaction returned without commit")]
    Uncommitted,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// The innermost cause, looking through `TransactionFailed` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::TransactionFailed(inner) => inner.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_nested_transaction_failures() {
        let err = Error::TransactionFailed(Box::new(Error::TransactionFailed(Box::new(
            Error::EmailTaken,
        ))));
        assert!(matches!(err.root(), Error::EmailTaken));
        assert!(!err.is_not_found());
        assert!(Error::TransactionFailed(Box::new(Error::NotFound)).is_not_found());
    }
}
