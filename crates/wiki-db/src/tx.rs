use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rusqlite::{Connection, Params, Transaction};
use tracing::{error, warn};

use crate::{Database, Error, Result};

/// An open write transaction handed to a unit of work.
///
/// The work must call [`Tx::commit`] itself; anything not committed when the
/// unit of work returns is rolled back.
pub struct Tx<'conn> {
    inner: Option<Transaction<'conn>>,
}

impl<'conn> Tx<'conn> {
    pub fn connection(&self) -> Result<&Connection> {
        self.inner.as_deref().ok_or(Error::AlreadyCommitted)
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.connection()?.execute(sql, params)?)
    }

    pub fn last_insert_rowid(&self) -> Result<i64> {
        Ok(self.connection()?.last_insert_rowid())
    }

    pub fn commit(&mut self) -> Result<()> {
        let tx = self.inner.take().ok_or(Error::AlreadyCommitted)?;
        tx.commit()?;
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.inner.is_none()
    }
}

impl Database {
    /// Run `work` inside a single transaction.
    ///
    /// - `Ok` after `tx.commit()`: the writes are visible, the value is returned.
    /// - `Ok` without a commit: rolled back, `TransactionFailed(Uncommitted)`.
    /// - `Err(e)`: rolled back, `TransactionFailed(e)`.
    /// - panic: caught, rolled back, `TransactionPanicked`.
    ///
    /// The connection lock is held for the whole call, so transactions never
    /// nest or interleave.
    pub fn run_in_transaction<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let mut tx = Tx {
            inner: Some(conn.transaction().map_err(Error::Begin)?),
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&mut tx)));
        let committed = tx.is_committed();
        // Dropping an uncommitted rusqlite transaction rolls it back.
        drop(tx);

        match outcome {
            Ok(Ok(value)) if committed => Ok(value),
            Ok(Ok(_)) => {
                warn!("Transaction returned without commit, rolled back");
                Err(Error::TransactionFailed(Box::new(Error::Uncommitted)))
            }
            Ok(Err(e)) => {
                if !committed {
                    warn!("Rollback operation: {}", e);
                }
                Err(Error::TransactionFailed(Box::new(e)))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Transaction panicked, rollback operation: {}", message);
                Err(Error::TransactionPanicked(message))
            }
        }
    }
}

/// Text of a caught panic payload, for logging.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM articles", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn committed_work_is_visible() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .run_in_transaction(|tx| {
                tx.execute("INSERT INTO articles (title, body) VALUES ('a', 'b')", [])?;
                let id = tx.last_insert_rowid()?;
                tx.commit()?;
                Ok(id)
            })
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn uncommitted_work_is_rolled_back() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .run_in_transaction(|tx| {
                tx.execute("INSERT INTO articles (title, body) VALUES ('a', 'b')", [])?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err.root(), Error::Uncommitted));
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn use_after_commit_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .run_in_transaction(|tx| {
                tx.commit()?;
                tx.execute("INSERT INTO articles (title, body) VALUES ('a', 'b')", [])?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err.root(), Error::AlreadyCommitted));
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let s: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(s.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
