pub mod error;
pub mod router;

pub use error::ApiError;
pub use router::{router, AppState};
