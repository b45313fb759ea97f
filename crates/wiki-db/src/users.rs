use rusqlite::{ErrorCode, OptionalExtension, Row};
use wiki_crypto::SALT_LEN;
use wiki_types::User;

use crate::{Database, Error, Result, Tx};

const USER_COLUMNS: &str = "user_id, name, email, salt, salted, created, updated";

/// Salt stretched against when the email matches no user.
const UNKNOWN_USER_SALT: &str = "unknown-user-timing-equalizer-salt";

impl Database {
    pub fn user(&self, id: i64) -> Result<User> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                [id],
                user_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
        })
    }

    /// Email is the unique key for users.
    pub fn user_by_email(&self, email: &str) -> Result<User> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                user_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
        })
    }

    pub fn user_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |row| row.get(0),
            )?)
        })
    }

    pub fn user_count(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
    }

    /// Look up the user by email and check the password against the stored digest.
    /// An unknown email still pays for one stretch, so both failures take
    /// about as long.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.user_by_email(email) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                wiki_crypto::stretch(password, UNKNOWN_USER_SALT)?;
                return Err(Error::NotFound);
            }
            Err(e) => return Err(e),
        };
        if !wiki_crypto::verify(password, &user.salt, &user.salted)? {
            return Err(Error::PasswordMismatch);
        }
        Ok(user)
    }
}

/// Insert a new user with a fresh salt. A duplicate email surfaces as `EmailTaken`.
pub fn insert_user(tx: &Tx<'_>, name: &str, email: &str, password: &str) -> Result<i64> {
    let salt = wiki_crypto::salt(SALT_LEN);
    let salted = wiki_crypto::stretch(password, &salt)?;

    match tx.execute(
        "INSERT INTO users (name, email, salt, salted) VALUES (?1, ?2, ?3, ?4)",
        (name, email, &salt, &salted),
    ) {
        Err(Error::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            Err(Error::EmailTaken)
        }
        Err(e) => Err(e),
        Ok(_) => tx.last_insert_rowid(),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        salt: row.get(3)?,
        salted: row.get(4)?,
        created: row.get(5)?,
        updated: row.get(6)?,
    })
}
