/// Wiki credential codec.
///
/// Passwords are never stored. Each user gets a random salt and the database
/// keeps `stretch(password, salt)`; verification recomputes the digest and
/// compares it in constant time.

pub mod password;
pub mod token;

pub use password::{SALT_LEN, salt, stretch, verify};
pub use token::{random_token, tokens_match};
