pub mod models;

pub use models::{Article, User};
