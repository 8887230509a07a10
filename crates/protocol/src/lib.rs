//! Typed request/response surface for the broker RPCs the consumer core
//! issues.
//!
//! Framing, correlation, API versioning, and authentication live in the
//! connection layer; this crate only defines the message shapes and the
//! per-partition error taxonomy that the core classifies against.

pub mod error_code;
pub mod isolation;
pub mod messages;

pub use error_code::ErrorCode;
pub use isolation::IsolationLevel;
pub use messages::*;
