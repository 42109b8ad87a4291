//! Container backend interface.
//!
//! The serializer only talks to a [`Container`]: it creates and closes
//! groups, writes datasets and attaches attributes. How nodes are stored is
//! entirely the backend's business. [`MemoryContainer`] is the in-memory
//! reference backend.

mod memory;

pub use memory::{MemoryContainer, Node, NodeKind};

use std::fmt;
use thiserror::Error;

use crate::core::{ArrayData, Attributes, CompoundTable, ScalarValue};

/// Handle of a group or dataset inside a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The container's root group. Always open.
    pub const ROOT: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure reported by a container backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Handle does not name a node
    #[error("Invalid handle {0}")]
    InvalidHandle(NodeId),

    /// Group handle used after its close call
    #[error("Group {0} is closed")]
    GroupClosed(NodeId),

    /// Name is empty or contains a path separator
    #[error("Invalid node name {0:?}")]
    InvalidName(String),

    /// A node or attribute with this name is already present
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Handle names a dataset where a group is required
    #[error("Node {0} is not a group")]
    NotAGroup(NodeId),

    /// Any other refusal (I/O, type mismatch, policy)
    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// Result of a backend call.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Hierarchical group/dataset store the serializer writes into.
///
/// A group handle is valid from `create_group` until its `close_group`.
/// Every dataset is written in one call.
pub trait Container {
    /// Create a child group and return its handle.
    fn create_group(&mut self, parent: NodeId, name: &str) -> BackendResult<NodeId>;

    /// Close a group previously returned by `create_group`.
    fn close_group(&mut self, group: NodeId) -> BackendResult<()>;

    /// Write a scalar dataset.
    fn write_scalar(
        &mut self,
        group: NodeId,
        name: &str,
        value: &ScalarValue,
        attributes: &Attributes,
    ) -> BackendResult<NodeId>;

    /// Write an array dataset with the array's own shape.
    fn write_array(
        &mut self,
        group: NodeId,
        name: &str,
        array: &ArrayData,
        attributes: &Attributes,
    ) -> BackendResult<NodeId>;

    /// Write one compound dataset, one row per element.
    fn write_compound_array(
        &mut self,
        group: NodeId,
        name: &str,
        table: &CompoundTable,
        attributes: &Attributes,
    ) -> BackendResult<NodeId>;

    /// Attach an attribute to a group or dataset.
    fn write_attribute(&mut self, target: NodeId, name: &str, values: &[String]) -> BackendResult<()>;
}

impl<C: Container + ?Sized> Container for &mut C {
    fn create_group(&mut self, parent: NodeId, name: &str) -> BackendResult<NodeId> {
        (**self).create_group(parent, name)
    }

    fn close_group(&mut self, group: NodeId) -> BackendResult<()> {
        (**self).close_group(group)
    }

    fn write_scalar(
        &mut self,
        group: NodeId,
        name: &str,
        value: &ScalarValue,
        attributes: &Attributes,
    ) -> BackendResult<NodeId> {
        (**self).write_scalar(group, name, value, attributes)
    }

    fn write_array(
        &mut self,
        group: NodeId,
        name: &str,
        array: &ArrayData,
        attributes: &Attributes,
    ) -> BackendResult<NodeId> {
        (**self).write_array(group, name, array, attributes)
    }

    fn write_compound_array(
        &mut self,
        group: NodeId,
        name: &str,
        table: &CompoundTable,
        attributes: &Attributes,
    ) -> BackendResult<NodeId> {
        (**self).write_compound_array(group, name, table, attributes)
    }

    fn write_attribute(&mut self, target: NodeId, name: &str, values: &[String]) -> BackendResult<()> {
        (**self).write_attribute(target, name, values)
    }
}
