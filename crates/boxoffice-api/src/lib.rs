//! Wire types shared by every boxoffice endpoint.

mod envelope;
mod error;

pub use envelope::{ApiResponse, Reply};
pub use error::{ApiError, INTERNAL_ERROR_MESSAGE};

pub type ApiResult<T> = Result<Reply<T>, ApiError>;
