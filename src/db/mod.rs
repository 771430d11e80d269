mod balance;
pub mod connection;
pub mod error;
mod trades;

pub use connection::{Database, DB_PATH_ENV, DEFAULT_DB_PATH};
pub use error::StoreError;
