//! Utility types.
//!
//! - [`PlainOldDataType`] - Enum of basic element types
//! - [`DataType`] - POD + extent
//! - [`Dimensions`] - Dataset shapes
//! - [`Error`] / [`Result`] - Error handling

mod pod;
mod data_type;
mod error;
mod dimensions;

pub use pod::*;
pub use data_type::*;
pub use error::*;
pub use dimensions::*;
