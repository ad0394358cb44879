pub mod decode_error;

/// Legacy import path kept for modules written against the older
/// `err::DecodeError::ReError` path; re-exports the canonical types.
#[allow(non_snake_case)]
pub mod DecodeError {
    pub use super::decode_error::{Needed, ReError};
}

pub use decode_error::ReError;

pub type CResult<T> = Result<T, ReError>;
