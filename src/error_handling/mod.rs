//! Error handling.

mod types;

pub use types::{DatabaseError, InitializationError};
