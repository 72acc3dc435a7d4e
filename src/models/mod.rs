pub mod encounter;
pub mod enums;
pub mod protocol;
pub mod triage;

pub use encounter::*;
pub use enums::*;
pub use protocol::*;
pub use triage::*;
