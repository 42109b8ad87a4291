//! Compound writers and the registry that dispatches to them.
//!
//! An array of structured elements is stored as one compound dataset. The
//! writer for an element type is looked up at runtime by `TypeId`; each
//! writer is monomorphized for its element type and checks every item
//! against it before laying the rows out. Derived types carry their own
//! writer in the array, so a registry entry only overrides it.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;
use tracing::trace;

use crate::core::meta::{is_skipped, resolve_entry_name};
use crate::core::{
    properties_with_inherited, CompoundArray, CompoundField, CompoundTable, CompoundWriter,
    FieldValue, H5Object, Value,
};
use crate::util::{Error, Result};

#[derive(Clone, Copy)]
struct Entry {
    type_name: &'static str,
    writer: CompoundWriter,
}

/// Dispatch table from element `TypeId` to compound writer.
#[derive(Clone, Default)]
pub struct CompoundRegistry {
    writers: HashMap<TypeId, Entry>,
}

impl CompoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the writer for element type `T`. Re-registering is a no-op.
    pub fn register<T: H5Object>(&mut self) -> &mut Self {
        self.register_writer(TypeId::of::<T>(), short_type_name(std::any::type_name::<T>()), write_table::<T>)
    }

    /// Register a custom writer for an element type.
    pub fn register_writer(&mut self, type_id: TypeId, type_name: &'static str, writer: CompoundWriter) -> &mut Self {
        self.writers
            .entry(type_id)
            .or_insert(Entry { type_name, writer });
        self
    }

    /// Writer for an element type, if registered.
    pub fn resolve(&self, type_id: TypeId) -> Option<CompoundWriter> {
        self.writers.get(&type_id).map(|e| e.writer)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.writers.contains_key(&TypeId::of::<T>())
    }

    /// Names of all registered element types, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.writers.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl std::fmt::Debug for CompoundRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.type_names()).finish()
    }
}

/// The process-wide registry used by serializers without their own.
pub fn global_registry() -> &'static RwLock<CompoundRegistry> {
    static GLOBAL: OnceLock<RwLock<CompoundRegistry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(CompoundRegistry::new()))
}

/// Register `T` in the process-wide registry.
pub fn register_compound<T: H5Object>() {
    global_registry().write().register::<T>();
}

/// Last path segment of a type name, generic arguments kept.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Default writer: one row per element, columns from the element's members.
///
/// Columns follow the order a standalone object is written in: properties
/// (own, then inherited through `base`), then own fields. Nested objects
/// are flattened into `.`-joined columns. Null members are left out of the
/// row, so every row must end up with the same columns.
pub fn write_table<T: H5Object>(array: &CompoundArray<'_>) -> Result<CompoundTable> {
    let type_name = short_type_name(std::any::type_name::<T>());
    let mut table: Option<CompoundTable> = None;

    for (row, item) in array.items().iter().enumerate() {
        let typed: &T = item
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| Error::layout(type_name, row, "element has a different type"))?;

        let mut cells = Vec::new();
        flatten(typed, "", type_name, row, &mut cells)?;

        let table = table.get_or_insert_with(|| {
            let layout = cells
                .iter()
                .map(|(name, cell)| CompoundField::new(name.clone(), cell.data_type()))
                .collect();
            CompoundTable::new(type_name, layout)
        });
        let names_match = table.fields().len() == cells.len()
            && table.fields().iter().zip(&cells).all(|(f, (n, _))| f.name == *n);
        if !names_match {
            return Err(Error::layout(type_name, row, "columns differ from the first row"));
        }
        table
            .push_row(cells.into_iter().map(|(_, cell)| cell).collect())
            .map_err(|reason| Error::layout(type_name, row, reason))?;
    }

    trace!(type_name, rows = array.len(), "compound table built");
    Ok(table.unwrap_or_else(|| CompoundTable::new(type_name, Vec::new())))
}

fn flatten(
    object: &dyn H5Object,
    prefix: &str,
    type_name: &str,
    row: usize,
    cells: &mut Vec<(String, FieldValue)>,
) -> Result<()> {
    let members = properties_with_inherited(object).into_iter().chain(object.fields());
    for member in members {
        let meta = member.meta();
        if meta.is_skipped() {
            continue;
        }
        let value = member.value();
        let runtime = match &value {
            Value::Object(o) => Some(o.type_meta()),
            _ => None,
        };
        if is_skipped(meta, runtime) {
            continue;
        }
        let column = format!("{prefix}{}", resolve_entry_name(meta));
        match value {
            Value::Null => {}
            Value::Scalar(s) => cells.push((column, FieldValue::Scalar(s))),
            Value::Array(a) => cells.push((column, FieldValue::Array(a))),
            Value::Object(o) => flatten(o, &format!("{column}."), type_name, row, cells)?,
            Value::CompoundArray(_) => {
                return Err(Error::layout(
                    type_name,
                    row,
                    format!("member '{column}' is an array of structures"),
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Member, MemberMeta, ScalarValue, TypeMeta};
    use crate::util::DataType;
    use std::any::Any;

    struct Pair {
        a: i32,
        b: f32,
    }

    fn pair_meta() -> &'static TypeMeta {
        static META: OnceLock<TypeMeta> = OnceLock::new();
        META.get_or_init(|| {
            TypeMeta::new("Pair")
                .with_field(MemberMeta::new("a"))
                .with_field(MemberMeta::new("b"))
        })
    }

    impl H5Object for Pair {
        fn type_meta(&self) -> &TypeMeta {
            pair_meta()
        }

        fn fields(&self) -> Vec<Member<'_>> {
            let m = pair_meta().fields();
            vec![Member::field(&m[0], &self.a), Member::field(&m[1], &self.b)]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_registry_resolve() {
        let mut reg = CompoundRegistry::new();
        assert!(reg.resolve(TypeId::of::<Pair>()).is_none());
        reg.register::<Pair>().register::<Pair>();
        assert_eq!(reg.len(), 1);
        assert!(reg.contains::<Pair>());
        assert_eq!(reg.type_names(), ["Pair"]);
    }

    #[test]
    fn test_table_layout() -> Result<()> {
        let items = [Pair { a: 1, b: 0.5 }, Pair { a: 2, b: 1.5 }, Pair { a: 3, b: 2.5 }];
        let table = write_table::<Pair>(&CompoundArray::new(&items))?;

        assert_eq!(table.len(), 3);
        assert_eq!(table.type_name(), "Pair");
        assert_eq!(
            table.fields(),
            [
                CompoundField::new("a", DataType::INT32),
                CompoundField::new("b", DataType::FLOAT32)
            ]
        );
        let a: Vec<_> = table.column("a").unwrap_or_default().into_iter().cloned().collect();
        assert_eq!(a[2], FieldValue::Scalar(ScalarValue::Int32(3)));
        Ok(())
    }

    #[test]
    fn test_empty_table() -> Result<()> {
        let items: [Pair; 0] = [];
        let table = write_table::<Pair>(&CompoundArray::new(&items))?;
        assert!(table.is_empty());
        assert!(table.fields().is_empty());
        Ok(())
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Pair"), "Pair");
        assert_eq!(short_type_name("Pair"), "Pair");
        assert_eq!(short_type_name("a::Wrap<b::C>"), "Wrap<b::C>");
    }
}
