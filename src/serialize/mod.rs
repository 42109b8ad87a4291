//! The object-graph walker.
//!
//! [`Serializer::serialize`] maps a value onto groups, datasets and
//! attributes of a [`Container`]:
//!
//! ```text
//! serialize(parent, value, name)
//!   resolve group name -> open group (optional)
//!   properties (own, then inherited) -> fields (own only)
//!     scalar          -> write_scalar / group attribute
//!     primitive array -> write_array
//!     compound array  -> registry -> write_compound_array
//!     nested object   -> serialize(group, member, member name)
//!   group attributes -> close group
//! ```
//!
//! Every group opened by a frame is closed by that frame, on the error path
//! too.

mod compound;
mod config;

pub use compound::{global_registry, register_compound, write_table, CompoundRegistry};
pub use crate::core::CompoundWriter;
pub use config::SerializeOptions;

use std::any::{Any, TypeId};

use tracing::{debug, debug_span, trace, warn};

use crate::container::{Container, NodeId};
use crate::core::meta::{is_skipped, resolve_entry_name, resolve_group_name, resolve_member_attributes};
use crate::core::{properties_with_inherited, Attributes, CompoundArray, H5Object, Member, Value};
use crate::util::{Error, Result};

/// Walks objects into a container.
///
/// Holds the options and the compound registry to use. Without an explicit
/// registry the process-wide one from [`global_registry`] is consulted.
#[derive(Clone, Debug, Default)]
pub struct Serializer<'r> {
    options: SerializeOptions,
    registry: Option<&'r CompoundRegistry>,
}

impl Serializer<'static> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer configured from the environment.
    pub fn from_env() -> Self {
        Self::new().with_options(SerializeOptions::from_env())
    }
}

impl<'r> Serializer<'r> {
    pub fn with_options(mut self, options: SerializeOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a private registry instead of the process-wide one.
    pub fn with_registry<'n>(self, registry: &'n CompoundRegistry) -> Serializer<'n> {
        Serializer {
            options: self.options,
            registry: Some(registry),
        }
    }

    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    /// Serialize `value` under `parent` and hand the same reference back.
    ///
    /// `name` overrides the type's group name; with neither, members are
    /// written straight into `parent`. Passing `None` as the value fails
    /// with [`Error::NullInput`] before anything is written.
    pub fn serialize<'v, C, T>(
        &self,
        container: &mut C,
        parent: NodeId,
        value: impl Into<Option<&'v T>>,
        name: Option<&str>,
    ) -> Result<&'v T>
    where
        C: Container + ?Sized,
        T: H5Object,
    {
        let value = value.into().ok_or(Error::NullInput)?;
        self.serialize_dyn(container, parent, value, name)?;
        Ok(value)
    }

    /// Type-erased form of [`serialize`](Self::serialize).
    pub fn serialize_dyn<C>(
        &self,
        container: &mut C,
        parent: NodeId,
        value: &dyn H5Object,
        name: Option<&str>,
    ) -> Result<()>
    where
        C: Container + ?Sized,
    {
        let mut walk = Walk {
            container,
            serializer: self,
            path: Vec::new(),
            ancestors: Vec::new(),
        };
        walk.object(parent, value, name, &Attributes::new())
    }

    /// Registry entry first, then the writer the array carries.
    fn resolve_writer(&self, array: &CompoundArray<'_>) -> Option<CompoundWriter> {
        let type_id = array.element_type();
        let registered = match self.registry {
            Some(reg) => reg.resolve(type_id),
            None => global_registry().read().resolve(type_id),
        };
        registered.or_else(|| array.writer())
    }
}

/// Serialize with default options and the process-wide registry.
pub fn serialize<'v, C, T>(
    container: &mut C,
    parent: NodeId,
    value: impl Into<Option<&'v T>>,
    name: Option<&str>,
) -> Result<&'v T>
where
    C: Container + ?Sized,
    T: H5Object,
{
    Serializer::new().serialize(container, parent, value, name)
}

/// State of one serialize call.
struct Walk<'s, 'r, C: ?Sized> {
    container: &'s mut C,
    serializer: &'s Serializer<'r>,
    /// Names of the groups opened so far, relative to the call's parent.
    path: Vec<String>,
    /// Objects currently being written, when the cycle guard is on.
    ancestors: Vec<(usize, TypeId)>,
}

impl<C: Container + ?Sized> Walk<'_, '_, C> {
    fn path_to(&self, name: &str) -> String {
        let mut path = String::new();
        for part in &self.path {
            path.push('/');
            path.push_str(part);
        }
        path.push('/');
        path.push_str(name);
        path
    }

    fn current_path(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.path.join("/"))
        }
    }

    fn object(
        &mut self,
        parent: NodeId,
        object: &dyn H5Object,
        explicit_name: Option<&str>,
        inherited: &Attributes,
    ) -> Result<()> {
        let meta = object.type_meta();
        let group_name = resolve_group_name(explicit_name, meta);
        let _span = debug_span!(
            "object",
            type_name = meta.type_name(),
            group = group_name.unwrap_or("")
        )
        .entered();

        let key = (
            object as *const dyn H5Object as *const () as usize,
            Any::type_id(object.as_any()),
        );
        let guard = self.serializer.options.cycle_guard;
        if guard && self.ancestors.contains(&key) {
            return Err(Error::CycleDetected {
                path: self.path_to(group_name.unwrap_or(meta.type_name())),
                type_name: meta.type_name().to_string(),
            });
        }

        let opened = match group_name {
            Some(name) => {
                let id = self
                    .container
                    .create_group(parent, name)
                    .map_err(|e| Error::backend(self.path_to(name), e))?;
                self.path.push(name.to_string());
                debug!(path = %self.current_path(), "group opened");
                Some(id)
            }
            None => None,
        };
        let target = opened.unwrap_or(parent);

        let result = if meta.is_skipped() {
            debug!("type is skip-marked, nothing written");
            Ok(())
        } else {
            if guard {
                self.ancestors.push(key);
            }
            let result = self.members(target, object, inherited);
            if guard {
                self.ancestors.pop();
            }
            result
        };

        let Some(id) = opened else {
            return result;
        };
        let path = self.current_path();
        self.path.pop();
        match (result, self.container.close_group(id)) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(Error::backend(path, e)),
            (Err(original), Ok(())) => Err(original),
            (Err(original), Err(close)) => {
                warn!(%path, error = %close, "failed to close group while unwinding");
                Err(original)
            }
        }
    }

    fn members(&mut self, group: NodeId, object: &dyn H5Object, inherited: &Attributes) -> Result<()> {
        let mut accumulated = Attributes::new();

        for member in properties_with_inherited(object) {
            self.member(group, &member, &mut accumulated)?;
        }
        for member in object.fields() {
            self.member(group, &member, &mut accumulated)?;
        }

        let mut attrs = object.type_meta().attributes().clone();
        attrs.merge_first_wins(inherited);
        attrs.merge_first_wins(&accumulated);
        for (name, values) in attrs.iter() {
            self.container
                .write_attribute(group, name, values)
                .map_err(|e| Error::backend(format!("{}@{name}", self.current_path()), e))?;
        }
        Ok(())
    }

    fn member(&mut self, group: NodeId, member: &Member<'_>, accumulated: &mut Attributes) -> Result<()> {
        let meta = member.meta();
        if meta.is_skipped() {
            trace!(member = meta.ident(), "skipped");
            return Ok(());
        }

        let value = member.value();
        if value.is_null() {
            trace!(member = meta.ident(), "null, omitted");
            return Ok(());
        }

        let runtime = match &value {
            Value::Object(o) => Some(o.type_meta()),
            _ => None,
        };
        if is_skipped(meta, runtime) {
            trace!(member = meta.ident(), "runtime type skipped");
            return Ok(());
        }

        let name = resolve_entry_name(meta);
        let attrs = resolve_member_attributes(meta, runtime);
        trace!(member = meta.ident(), name, class = ?value.class(), "visiting");

        match value {
            Value::Null => Ok(()),
            Value::Scalar(s) if meta.is_group_attribute() => {
                accumulated.insert(name, s.to_string());
                Ok(())
            }
            Value::Array(a) if meta.is_group_attribute() => {
                let values = (0..a.len()).filter_map(|i| a.get(i)).map(|v| v.to_string());
                accumulated.insert_many(name, values);
                Ok(())
            }
            Value::Scalar(s) => {
                self.container
                    .write_scalar(group, name, &s, &attrs)
                    .map_err(|e| Error::backend(self.path_to(name), e))?;
                debug!(path = %self.path_to(name), dtype = %s.data_type(), "scalar written");
                Ok(())
            }
            Value::Array(a) => {
                self.container
                    .write_array(group, name, &a, &attrs)
                    .map_err(|e| Error::backend(self.path_to(name), e))?;
                debug!(path = %self.path_to(name), dims = %a.dims(), "array written");
                Ok(())
            }
            Value::CompoundArray(c) => self.compound(group, name, &c, &attrs),
            Value::Object(o) => self.object(group, o, Some(name), &attrs),
        }
    }

    fn compound(&mut self, group: NodeId, name: &str, array: &CompoundArray<'_>, attrs: &Attributes) -> Result<()> {
        let writer = self
            .serializer
            .resolve_writer(array)
            .ok_or_else(|| Error::DispatchResolution {
                type_name: array.element_type_name().to_string(),
                path: self.path_to(name),
            })?;
        let table = writer(array)?;
        self.container
            .write_compound_array(group, name, &table, attrs)
            .map_err(|e| Error::backend(self.path_to(name), e))?;
        debug!(path = %self.path_to(name), rows = table.len(), "compound written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use crate::core::{MemberMeta, TypeMeta};
    use std::sync::OnceLock;

    /// Written by hand to exercise the trait without the derive.
    struct Probe {
        level: f32,
        note: Option<String>,
    }

    fn probe_meta() -> &'static TypeMeta {
        static META: OnceLock<TypeMeta> = OnceLock::new();
        META.get_or_init(|| {
            TypeMeta::new("Probe")
                .with_group_name("probe")
                .with_attribute("kind", "manual")
                .with_field(MemberMeta::new("level").with_attribute("unit", "dB"))
                .with_field(MemberMeta::new("note"))
        })
    }

    impl H5Object for Probe {
        fn type_meta(&self) -> &TypeMeta {
            probe_meta()
        }

        fn fields(&self) -> Vec<Member<'_>> {
            let m = probe_meta().fields();
            vec![Member::field(&m[0], &self.level), Member::field(&m[1], &self.note)]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_hand_written_object() -> Result<()> {
        let mut file = MemoryContainer::new();
        let probe = Probe {
            level: -3.5,
            note: None,
        };
        Serializer::new().serialize(&mut file, NodeId::ROOT, &probe, None)?;

        let group = file.get("/probe").expect("group");
        assert_eq!(group.attributes().get_first("kind"), Some("manual"));
        let id = file.lookup("/probe").expect("id");
        assert_eq!(file.child_names(id), ["level"]);
        let level = file.get("/probe/level").expect("level");
        assert_eq!(level.attributes().get_first("unit"), Some("dB"));
        Ok(())
    }

    #[test]
    fn test_serialize_into_existing_group() -> Result<()> {
        let mut file = MemoryContainer::new();
        let parent = file
            .create_group(NodeId::ROOT, "d1")
            .map_err(|e| Error::backend("/d1", e))?;
        let probe = Probe {
            level: 1.0,
            note: Some("ok".into()),
        };
        serialize(&mut file, parent, &probe, Some("first"))?;

        assert!(file.get("/d1/first/note").is_some());
        assert!(file.is_open(parent));
        Ok(())
    }

    #[test]
    fn test_paths_relative_to_parent() {
        let mut file = MemoryContainer::new();
        let serializer = Serializer::new();
        let walk = Walk {
            container: &mut file,
            serializer: &serializer,
            path: vec!["a".into(), "b".into()],
            ancestors: Vec::new(),
        };
        assert_eq!(walk.path_to("c"), "/a/b/c");
        assert_eq!(walk.current_path(), "/a/b");
    }
}
