//! Streamgate-Common: Shared identifiers and error types.
//!
//! This crate provides functionality used across streamgate:
//!
//! - **Stream IDs**: A validated identifier that is safe to use as a
//!   directory name and URL path segment
//! - **Error Handling**: The registry error taxonomy plus launcher and kill
//!   errors, with a result alias
//!
//! # Examples
//!
//! ```
//! use streamgate_common::{Error, Result, StreamId};
//!
//! let id = StreamId::parse("cam1").unwrap();
//! assert_eq!(id.as_str(), "cam1");
//!
//! fn example(id: &StreamId) -> Result<()> {
//!     Err(Error::not_found(id))
//! }
//! assert!(example(&id).is_err());
//! ```

pub mod error;
pub mod ids;

pub use error::{Error, KillError, LaunchError, Result};
pub use ids::StreamId;
