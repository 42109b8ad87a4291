//! In-memory reference container.

use std::fmt;
use std::path::Path;

use serde_json::{json, Map, Value as Json};

use super::{BackendError, BackendResult, Container, NodeId};
use crate::core::{ArrayData, Attributes, CompoundTable, FieldValue, ScalarValue};
use crate::util::{DataType, Dimensions, Result};

/// Payload of a node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Group { children: Vec<NodeId>, open: bool },
    Scalar(ScalarValue),
    Array(ArrayData),
    Compound(CompoundTable),
}

/// A group or dataset stored in a [`MemoryContainer`].
#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    attributes: Attributes,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    /// Child handles in creation order; empty for datasets.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// Element type of a dataset; groups have none.
    pub fn data_type(&self) -> Option<DataType> {
        match &self.kind {
            NodeKind::Group { .. } | NodeKind::Compound(_) => None,
            NodeKind::Scalar(s) => Some(s.data_type()),
            NodeKind::Array(a) => Some(a.data_type()),
        }
    }

    /// Shape of a dataset: scalars are rank 0, compounds one row per element.
    pub fn dims(&self) -> Option<Dimensions> {
        match &self.kind {
            NodeKind::Group { .. } => None,
            NodeKind::Scalar(_) => Some(Dimensions::scalar()),
            NodeKind::Array(a) => Some(a.dims().clone()),
            NodeKind::Compound(t) => Some(Dimensions::d1(t.len())),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayData> {
        match &self.kind {
            NodeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundTable> {
        match &self.kind {
            NodeKind::Compound(t) => Some(t),
            _ => None,
        }
    }
}

/// Container keeping the whole node tree in memory.
///
/// Enforces the handle rules every backend must honor: writes need an open
/// group, names are non-empty, unique among siblings and free of `/`, and a
/// group cannot be closed while one of its child groups is still open.
#[derive(Clone, Debug)]
pub struct MemoryContainer {
    nodes: Vec<Node>,
}

impl Default for MemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContainer {
    /// Create a container holding only the open root group.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: String::new(),
                parent: None,
                attributes: Attributes::new(),
                kind: NodeKind::Group {
                    children: Vec::new(),
                    open: true,
                },
            }],
        }
    }

    /// Handle of the root group.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing but the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Resolve a `/`-separated path from the root.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            current = self.child_by_name(current, part)?;
        }
        Some(current)
    }

    /// Node at a `/`-separated path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.lookup(path).and_then(|id| self.node(id))
    }

    /// Child of a group by name.
    pub fn child_by_name(&self, group: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(group)?;
        node.children()
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].name == name)
    }

    /// Names of a group's children in creation order.
    pub fn child_names(&self, group: NodeId) -> Vec<&str> {
        self.node(group)
            .map(|n| {
                n.children()
                    .iter()
                    .map(|c| self.nodes[c.0].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full path of a node.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node(cur)?;
            if node.parent.is_some() {
                parts.push(node.name.as_str());
            }
            current = node.parent;
        }
        parts.reverse();
        Some(format!("/{}", parts.join("/")))
    }

    /// Whether a group handle is still open.
    pub fn is_open(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::Group { open: true, .. })
        )
    }

    /// Number of open groups other than the root.
    pub fn open_groups(&self) -> usize {
        self.nodes
            .iter()
            .skip(1)
            .filter(|n| matches!(n.kind, NodeKind::Group { open: true, .. }))
            .count()
    }

    fn open_group(&self, id: NodeId) -> BackendResult<&Node> {
        let node = self.node(id).ok_or(BackendError::InvalidHandle(id))?;
        match node.kind {
            NodeKind::Group { open: true, .. } => Ok(node),
            NodeKind::Group { open: false, .. } => Err(BackendError::GroupClosed(id)),
            _ => Err(BackendError::NotAGroup(id)),
        }
    }

    fn check_name(&self, parent: NodeId, name: &str) -> BackendResult<()> {
        if name.trim().is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(BackendError::InvalidName(name.to_string()));
        }
        if self.child_by_name(parent, name).is_some() {
            let base = self.path_of(parent).unwrap_or_default();
            let path = if base == "/" {
                format!("/{name}")
            } else {
                format!("{base}/{name}")
            };
            return Err(BackendError::AlreadyExists(path));
        }
        Ok(())
    }

    fn insert(&mut self, parent: NodeId, name: &str, attributes: Attributes, kind: NodeKind) -> BackendResult<NodeId> {
        self.open_group(parent)?;
        self.check_name(parent, name)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            attributes,
            kind,
        });
        if let NodeKind::Group { children, .. } = &mut self.nodes[parent.0].kind {
            children.push(id);
        }
        Ok(id)
    }

    // === Export ===

    /// JSON rendering of the whole tree.
    pub fn to_json(&self) -> Json {
        self.node_json(NodeId::ROOT)
    }

    /// Write the JSON rendering to a file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn node_json(&self, id: NodeId) -> Json {
        let node = &self.nodes[id.0];
        let mut obj = Map::new();
        obj.insert("name".into(), json!(node.name));
        if !node.attributes.is_empty() {
            let attrs: Map<String, Json> = node
                .attributes
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            obj.insert("attributes".into(), Json::Object(attrs));
        }
        match &node.kind {
            NodeKind::Group { children, .. } => {
                obj.insert("kind".into(), json!("group"));
                let children: Vec<Json> = children.iter().map(|c| self.node_json(*c)).collect();
                obj.insert("children".into(), Json::Array(children));
            }
            NodeKind::Scalar(s) => {
                obj.insert("kind".into(), json!("scalar"));
                obj.insert("type".into(), json!(s.data_type().to_string()));
                obj.insert("value".into(), scalar_json(s));
            }
            NodeKind::Array(a) => {
                obj.insert("kind".into(), json!("array"));
                obj.insert("type".into(), json!(a.data_type().to_string()));
                obj.insert("shape".into(), json!(a.dims().sizes()));
                obj.insert("values".into(), array_json(a));
            }
            NodeKind::Compound(t) => {
                obj.insert("kind".into(), json!("compound"));
                obj.insert("element".into(), json!(t.type_name()));
                let fields: Vec<Json> = t
                    .fields()
                    .iter()
                    .map(|f| json!({ "name": f.name, "type": f.data_type.to_string() }))
                    .collect();
                obj.insert("fields".into(), Json::Array(fields));
                let rows: Vec<Json> = t
                    .rows()
                    .iter()
                    .map(|row| {
                        Json::Array(
                            row.iter()
                                .map(|cell| match cell {
                                    FieldValue::Scalar(s) => scalar_json(s),
                                    FieldValue::Array(a) => array_json(a),
                                })
                                .collect(),
                        )
                    })
                    .collect();
                obj.insert("rows".into(), Json::Array(rows));
            }
        }
        Json::Object(obj)
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.nodes[id.0];
        let indent = "  ".repeat(depth);
        let attrs = if node.attributes.is_empty() {
            String::new()
        } else {
            format!(" {:?}", node.attributes)
        };
        match &node.kind {
            NodeKind::Group { children, .. } => {
                writeln!(f, "{indent}{}/{attrs}", node.name)?;
                for child in children {
                    self.fmt_node(f, *child, depth + 1)?;
                }
                Ok(())
            }
            NodeKind::Scalar(s) => writeln!(f, "{indent}{}: {} = {s}{attrs}", node.name, s.data_type()),
            NodeKind::Array(a) => writeln!(f, "{indent}{}: {a:?}{attrs}", node.name),
            NodeKind::Compound(t) => {
                let layout: Vec<String> = t
                    .fields()
                    .iter()
                    .map(|c| format!("{}: {}", c.name, c.data_type))
                    .collect();
                writeln!(
                    f,
                    "{indent}{}: compound {}[{}] {{{}}}{attrs}",
                    node.name,
                    t.type_name(),
                    t.len(),
                    layout.join(", ")
                )
            }
        }
    }
}

impl fmt::Display for MemoryContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, NodeId::ROOT, 0)
    }
}

fn scalar_json(s: &ScalarValue) -> Json {
    match s {
        ScalarValue::Bool(v) => json!(v),
        ScalarValue::Int8(v) => json!(v),
        ScalarValue::Uint8(v) => json!(v),
        ScalarValue::Int16(v) => json!(v),
        ScalarValue::Uint16(v) => json!(v),
        ScalarValue::Int32(v) => json!(v),
        ScalarValue::Uint32(v) => json!(v),
        ScalarValue::Int64(v) => json!(v),
        ScalarValue::Uint64(v) => json!(v),
        ScalarValue::Float16(v) => json!(v.to_f64()),
        ScalarValue::Float32(v) => json!(v),
        ScalarValue::Float64(v) => json!(v),
        ScalarValue::Char(c) => json!(c.to_string()),
        ScalarValue::String(v) => json!(v),
        ScalarValue::Duration(d) => json!(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
    }
}

fn array_json(a: &ArrayData) -> Json {
    Json::Array((0..a.len()).filter_map(|i| a.get(i)).map(|s| scalar_json(&s)).collect())
}

impl Container for MemoryContainer {
    fn create_group(&mut self, parent: NodeId, name: &str) -> BackendResult<NodeId> {
        self.insert(
            parent,
            name,
            Attributes::new(),
            NodeKind::Group {
                children: Vec::new(),
                open: true,
            },
        )
    }

    fn close_group(&mut self, group: NodeId) -> BackendResult<()> {
        if group == NodeId::ROOT {
            return Err(BackendError::rejected("the root group cannot be closed"));
        }
        let node = self.open_group(group)?;
        let has_open_child = node.children().iter().any(|c| self.is_open(*c));
        if has_open_child {
            return Err(BackendError::rejected(format!(
                "group {group} still has open child groups"
            )));
        }
        if let NodeKind::Group { open, .. } = &mut self.nodes[group.0].kind {
            *open = false;
        }
        Ok(())
    }

    fn write_scalar(
        &mut self,
        group: NodeId,
        name: &str,
        value: &ScalarValue,
        attributes: &Attributes,
    ) -> BackendResult<NodeId> {
        self.insert(group, name, attributes.clone(), NodeKind::Scalar(value.clone()))
    }

    fn write_array(
        &mut self,
        group: NodeId,
        name: &str,
        array: &ArrayData,
        attributes: &Attributes,
    ) -> BackendResult<NodeId> {
        if !array.data_type().is_valid() {
            return Err(BackendError::rejected(format!(
                "array '{name}' has no valid element type"
            )));
        }
        self.insert(group, name, attributes.clone(), NodeKind::Array(array.clone()))
    }

    fn write_compound_array(
        &mut self,
        group: NodeId,
        name: &str,
        table: &CompoundTable,
        attributes: &Attributes,
    ) -> BackendResult<NodeId> {
        self.insert(group, name, attributes.clone(), NodeKind::Compound(table.clone()))
    }

    fn write_attribute(&mut self, target: NodeId, name: &str, values: &[String]) -> BackendResult<()> {
        let node = self.node(target).ok_or(BackendError::InvalidHandle(target))?;
        if let NodeKind::Group { open: false, .. } = node.kind {
            return Err(BackendError::GroupClosed(target));
        }
        if name.trim().is_empty() {
            return Err(BackendError::InvalidName(name.to_string()));
        }
        let node = &mut self.nodes[target.0];
        if !node.attributes.insert_many(name, values.iter().cloned()) {
            return Err(BackendError::AlreadyExists(format!("attribute {name}")));
        }
        Ok(())
    }
}
