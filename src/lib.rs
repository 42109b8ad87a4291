//! # h5object
//!
//! Metadata-driven serializer that writes arbitrary object graphs into a
//! hierarchical container of groups, datasets and attributes.
//!
//! Each member of a value is classified by its runtime type and stored with
//! one of four strategies: scalar dataset, primitive array dataset, compound
//! dataset (arrays of structures), or subgroup (nested objects, recursively).
//! Naming, skipping and attributes are declared with `#[h5(...)]`.
//!
//! ## Modules
//!
//! - [`util`] - Element types, shapes, errors
//! - [`core`] - Value model, type metadata, the [`H5Object`] trait
//! - [`container`] - Backend trait and the in-memory container
//! - [`serialize`] - The walker and the compound registry
//!
//! ## Example
//!
//! ```ignore
//! use h5object::prelude::*;
//!
//! #[derive(H5Object)]
//! #[h5(group = "eit", attr(name = "unit", value = "V"))]
//! struct Eit {
//!     count: i32,
//!     samples: Vec<[f32; 3]>,
//! }
//!
//! let mut file = MemoryContainer::new();
//! let eit = Eit { count: 42, samples: vec![[0.0; 3]; 2] };
//! serialize(&mut file, NodeId::ROOT, &eit, None)?;
//! assert!(file.get("/eit/count").is_some());
//! ```

extern crate self as h5object;

pub mod util;
pub mod core;
pub mod container;
pub mod serialize;

pub use h5object_derive::H5Object;

// Re-export commonly used types
pub use util::{DataType, Dimensions, Error, PlainOldDataType, Result};
pub use crate::core::{
    Attributes, CompoundArray, Element, H5Object, IntoValue, Member, MemberMeta, ScalarValue,
    ToValue, TypeClass, TypeMeta, Value,
};
pub use container::{BackendError, Container, MemoryContainer, NodeId};
pub use serialize::{register_compound, serialize, CompoundRegistry, SerializeOptions, Serializer};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::container::{Container, MemoryContainer, NodeId};
    pub use crate::core::{Attributes, H5Object, ToValue, Value};
    pub use crate::serialize::{register_compound, serialize, SerializeOptions, Serializer};
    pub use crate::util::{DataType, Error, Result};
    pub use h5object_derive::H5Object;
}
