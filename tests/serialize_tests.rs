//! Integration tests for the object-graph walker against the memory container.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use h5object::container::NodeKind;
use h5object::{
    serialize, BackendError, Container, DataType, Error, H5Object, MemoryContainer, NodeId,
    ScalarValue, SerializeOptions, Serializer,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, H5Object)]
struct Counter {
    count: i32,
}

#[derive(Debug, H5Object)]
#[h5(group = "eit")]
struct Eit {
    count: i32,
}

#[derive(H5Object)]
#[h5(group = "rec")]
struct Optional {
    present: Option<f64>,
    missing: Option<f64>,
    #[h5(skip)]
    hidden: i32,
}

#[derive(H5Object)]
#[h5(group = "ignored", skip)]
struct Ignored {
    x: i32,
}

#[derive(H5Object)]
#[h5(group = "holder")]
struct Holder {
    ignored: Ignored,
    x: i32,
}

#[derive(H5Object)]
#[h5(attr(name = "unit", value = "V"))]
struct Sensor {
    reading: f64,
}

#[derive(H5Object)]
struct Rig {
    #[h5(attr(name = "unit", value = "mV"), attr(name = "channel", value = "3"))]
    sensor: Sensor,
    #[h5(name = "gain_db", attrs(name = "range", values = ["0", "60"]))]
    gain: f32,
}

#[derive(H5Object)]
#[h5(property(name = "label", get = "Base::label"))]
struct Base {
    hidden: i32,
}

impl Base {
    fn label(&self) -> String {
        format!("base-{}", self.hidden)
    }
}

#[derive(H5Object)]
#[h5(group = "derived")]
struct Derived {
    own: i32,
    #[h5(base)]
    base: Base,
}

#[derive(H5Object)]
#[h5(group = "lazy")]
#[h5(property(name = "expensive", get = "Lazy::expensive", skip))]
#[h5(property(name = "nothing", get = "Lazy::nothing"))]
#[h5(property(name = "elapsed", get = "Lazy::elapsed"))]
struct Lazy {
    #[h5(skip)]
    calls: Cell<u32>,
}

impl Lazy {
    fn expensive(&self) -> i32 {
        self.calls.set(self.calls.get() + 1);
        7
    }

    fn nothing(&self) -> Option<i32> {
        None
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(3)
    }
}

#[derive(H5Object)]
struct Matrix {
    matrix: [[f64; 3]; 2],
    series: Vec<i16>,
    names: Vec<String>,
}

#[derive(H5Object)]
#[h5(group = "rec", attr(name = "schema", value = "1"))]
struct Tagged {
    #[h5(as_attribute)]
    record_number: u32,
    #[h5(as_attribute, name = "schema")]
    schema_override: String,
    #[h5(as_attribute)]
    channels: Vec<u8>,
    value: i32,
}

#[derive(Debug, H5Object)]
#[h5(group = "five")]
struct Five {
    a: i32,
    b: i32,
    c: i32,
    d: i32,
    e: i32,
}

#[derive(Debug, H5Object)]
struct Inner {
    x: i32,
}

#[derive(Debug, H5Object)]
#[h5(group = "outer")]
struct Outer {
    inner: Inner,
}

#[derive(H5Object)]
struct Shared {
    v: i32,
}

#[derive(H5Object)]
#[h5(group = "dag")]
struct Dag {
    a: Rc<Shared>,
    b: Rc<Shared>,
}

#[derive(Debug, H5Object)]
#[h5(group = "loop")]
#[h5(property(name = "me", get = "Looped::me"))]
struct Looped {
    id: i32,
}

impl Looped {
    fn me(&self) -> &Looped {
        self
    }
}

/// Memory container that fails the n-th dataset write.
struct Flaky {
    inner: MemoryContainer,
    fail_at: usize,
    fail_close: bool,
    attempts: usize,
}

impl Flaky {
    fn new(fail_at: usize) -> Self {
        Self {
            inner: MemoryContainer::new(),
            fail_at,
            fail_close: false,
            attempts: 0,
        }
    }

    fn attempt(&mut self, name: &str) -> Result<(), BackendError> {
        self.attempts += 1;
        if self.attempts == self.fail_at {
            return Err(BackendError::rejected(format!("injected failure writing {name}")));
        }
        Ok(())
    }
}

impl Container for Flaky {
    fn create_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId, BackendError> {
        self.inner.create_group(parent, name)
    }

    fn close_group(&mut self, group: NodeId) -> Result<(), BackendError> {
        if self.fail_close {
            return Err(BackendError::rejected("injected close failure"));
        }
        self.inner.close_group(group)
    }

    fn write_scalar(
        &mut self,
        group: NodeId,
        name: &str,
        value: &ScalarValue,
        attributes: &h5object::Attributes,
    ) -> Result<NodeId, BackendError> {
        self.attempt(name)?;
        self.inner.write_scalar(group, name, value, attributes)
    }

    fn write_array(
        &mut self,
        group: NodeId,
        name: &str,
        array: &h5object::core::ArrayData,
        attributes: &h5object::Attributes,
    ) -> Result<NodeId, BackendError> {
        self.attempt(name)?;
        self.inner.write_array(group, name, array, attributes)
    }

    fn write_compound_array(
        &mut self,
        group: NodeId,
        name: &str,
        table: &h5object::core::CompoundTable,
        attributes: &h5object::Attributes,
    ) -> Result<NodeId, BackendError> {
        self.attempt(name)?;
        self.inner.write_compound_array(group, name, table, attributes)
    }

    fn write_attribute(&mut self, target: NodeId, name: &str, values: &[String]) -> Result<(), BackendError> {
        self.inner.write_attribute(target, name, values)
    }
}

// ============================================================================
// Basic writes
// ============================================================================

#[test]
fn test_scalar_roundtrip() {
    let mut file = MemoryContainer::new();
    serialize(&mut file, NodeId::ROOT, &Counter { count: 42 }, None).expect("serialize failed");

    // Exactly one node under the root, with no attributes
    assert_eq!(file.child_names(NodeId::ROOT), ["count"]);
    assert_eq!(file.len(), 2);

    let count = file.get("/count").expect("count missing");
    assert!(count.attributes().is_empty());
    assert_eq!(count.as_scalar(), Some(&ScalarValue::Int32(42)));
    assert_eq!(count.data_type(), Some(DataType::INT32));
    assert!(count.dims().map(|d| d.is_scalar()).unwrap_or(false));
}

#[test]
fn test_returns_input_reference() {
    let mut file = MemoryContainer::new();
    let value = Counter { count: 1 };
    let out = serialize(&mut file, NodeId::ROOT, &value, None).expect("serialize failed");
    assert!(std::ptr::eq(out, &value));
}

#[test]
fn test_null_input_writes_nothing() {
    let mut file = MemoryContainer::new();
    let err = serialize(&mut file, NodeId::ROOT, None::<&Counter>, None).unwrap_err();
    assert!(matches!(err, Error::NullInput));
    assert!(file.is_empty());
}

#[test]
fn test_array_shapes() {
    let mut file = MemoryContainer::new();
    let m = Matrix {
        matrix: [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
        series: vec![1, 2, 3, 4],
        names: vec!["a".into(), "b".into()],
    };
    serialize(&mut file, NodeId::ROOT, &m, None).expect("serialize failed");

    let matrix = file.get("/matrix").and_then(|n| n.as_array()).expect("matrix missing");
    assert_eq!(matrix.dims().sizes(), [2, 3]);
    assert_eq!(matrix.data_type(), DataType::FLOAT64);
    assert_eq!(matrix.to_vec::<f64>(), Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));

    let series = file.get("/series").and_then(|n| n.as_array()).expect("series missing");
    assert_eq!(series.dims().sizes(), [4]);

    let names = file.get("/names").and_then(|n| n.as_array()).expect("names missing");
    assert_eq!(names.strings(), Some(&["a".to_string(), "b".to_string()][..]));
}

// ============================================================================
// Naming and skipping
// ============================================================================

#[test]
fn test_group_name_precedence() {
    let mut file = MemoryContainer::new();
    let eit = Eit { count: 1 };

    serialize(&mut file, NodeId::ROOT, &eit, Some("record")).expect("explicit name");
    serialize(&mut file, NodeId::ROOT, &eit, None).expect("type-level name");

    assert!(file.get("/record/count").is_some());
    assert!(file.get("/eit/count").is_some());
    assert_eq!(file.child_names(NodeId::ROOT), ["record", "eit"]);

    // Blank explicit names fall back to the type-level name
    let mut other = MemoryContainer::new();
    serialize(&mut other, NodeId::ROOT, &eit, Some("  ")).expect("blank name");
    assert!(other.get("/eit").is_some());
}

#[test]
fn test_null_and_skipped_members_omitted() {
    let mut file = MemoryContainer::new();
    let value = Optional {
        present: Some(1.5),
        missing: None,
        hidden: 3,
    };
    serialize(&mut file, NodeId::ROOT, &value, None).expect("serialize failed");

    let rec = file.lookup("/rec").expect("rec missing");
    assert_eq!(file.child_names(rec), ["present"]);
    assert_eq!(value.hidden, 3);
}

#[test]
fn test_skipped_root_leaves_empty_group() {
    let mut file = MemoryContainer::new();
    serialize(&mut file, NodeId::ROOT, &Ignored { x: 1 }, None).expect("serialize failed");

    let id = file.lookup("/ignored").expect("group should exist");
    let node = file.node(id).expect("node");
    assert!(node.is_group());
    assert!(node.children().is_empty());
    assert!(node.attributes().is_empty());
    assert!(!file.is_open(id));
}

#[test]
fn test_member_of_skipped_type_omitted() {
    let mut file = MemoryContainer::new();
    let holder = Holder {
        ignored: Ignored { x: 1 },
        x: 2,
    };
    serialize(&mut file, NodeId::ROOT, &holder, None).expect("serialize failed");

    let id = file.lookup("/holder").expect("holder missing");
    assert_eq!(file.child_names(id), ["x"]);
    assert!(file.get("/holder/ignored").is_none());
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_type_level_attribute_wins() {
    let mut file = MemoryContainer::new();
    let rig = Rig {
        sensor: Sensor { reading: 0.25 },
        gain: 12.0,
    };
    serialize(&mut file, NodeId::ROOT, &rig, None).expect("serialize failed");

    let sensor = file.get("/sensor").expect("sensor group missing");
    assert!(sensor.is_group());
    assert_eq!(sensor.attributes().get_first("unit"), Some("V"));
    assert_eq!(sensor.attributes().get_first("channel"), Some("3"));
    assert_eq!(sensor.attributes().len(), 2);

    let gain = file.get("/gain_db").expect("gain missing");
    assert_eq!(
        gain.attributes().get("range"),
        Some(&["0".to_string(), "60".to_string()][..])
    );
}

#[test]
fn test_as_attribute_members() {
    let mut file = MemoryContainer::new();
    let value = Tagged {
        record_number: 7,
        schema_override: "2".into(),
        channels: vec![1, 2],
        value: 5,
    };
    serialize(&mut file, NodeId::ROOT, &value, None).expect("serialize failed");

    let rec = file.get("/rec").expect("rec missing");
    assert_eq!(rec.attributes().get_first("record_number"), Some("7"));
    assert_eq!(
        rec.attributes().get("channels"),
        Some(&["1".to_string(), "2".to_string()][..])
    );
    // The type-level declaration is merged first
    assert_eq!(rec.attributes().get_first("schema"), Some("1"));

    let id = file.lookup("/rec").expect("rec");
    assert_eq!(file.child_names(id), ["value"]);
}

// ============================================================================
// Fields and properties
// ============================================================================

#[test]
fn test_base_properties_inherited_fields_not() {
    let mut file = MemoryContainer::new();
    let derived = Derived {
        own: 1,
        base: Base { hidden: 9 },
    };
    serialize(&mut file, NodeId::ROOT, &derived, None).expect("serialize failed");

    let id = file.lookup("/derived").expect("derived missing");
    // Properties come first, then own fields
    assert_eq!(file.child_names(id), ["label", "own"]);
    assert_eq!(
        file.get("/derived/label").and_then(|n| n.as_scalar()),
        Some(&ScalarValue::String("base-9".into()))
    );
    assert!(file.get("/derived/hidden").is_none());
}

#[test]
fn test_properties_read_lazily() {
    let mut file = MemoryContainer::new();
    let lazy = Lazy { calls: Cell::new(0) };
    serialize(&mut file, NodeId::ROOT, &lazy, None).expect("serialize failed");

    assert_eq!(lazy.calls.get(), 0, "skipped getter must not run");
    assert_eq!(lazy.expensive(), 7);

    let id = file.lookup("/lazy").expect("lazy missing");
    assert_eq!(file.child_names(id), ["elapsed"]);
    let elapsed = file.get("/lazy/elapsed").expect("elapsed");
    assert_eq!(elapsed.data_type(), Some(DataType::UINT64));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failure_stops_walk() {
    let mut file = Flaky::new(3);
    let five = Five { a: 1, b: 2, c: 3, d: 4, e: 5 };
    let err = serialize(&mut file, NodeId::ROOT, &five, None).unwrap_err();

    match &err {
        Error::BackendWrite { path, source } => {
            assert_eq!(path, "/five/c");
            assert!(matches!(source, BackendError::Rejected(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(file.attempts, 3, "members after the failure must not be attempted");
    assert!(file.inner.get("/five/a").is_some());
    assert!(file.inner.get("/five/b").is_some());
    assert!(file.inner.get("/five/c").is_none());
    assert!(file.inner.get("/five/d").is_none());
    assert_eq!(file.inner.open_groups(), 0, "groups must be closed on error");
}

#[test]
fn test_nested_failure_closes_every_group() {
    let mut file = Flaky::new(1);
    let outer = Outer { inner: Inner { x: 1 } };
    let err = serialize(&mut file, NodeId::ROOT, &outer, None).unwrap_err();

    assert_eq!(err.path(), Some("/outer/inner/x"));
    assert_eq!(file.inner.open_groups(), 0);
    assert!(file.inner.get("/outer/inner").is_some());
}

#[test]
fn test_close_failure_does_not_mask_error() {
    let mut file = Flaky::new(1);
    file.fail_close = true;
    let outer = Outer { inner: Inner { x: 1 } };
    let err = serialize(&mut file, NodeId::ROOT, &outer, None).unwrap_err();

    assert_eq!(err.path(), Some("/outer/inner/x"));
}

#[test]
fn test_close_failure_reported_on_success_path() {
    let mut file = Flaky::new(usize::MAX);
    file.fail_close = true;
    let err = serialize(&mut file, NodeId::ROOT, &Eit { count: 1 }, None).unwrap_err();
    assert_eq!(err.path(), Some("/eit"));
}

#[test]
fn test_duplicate_name_is_backend_error() {
    let mut file = MemoryContainer::new();
    serialize(&mut file, NodeId::ROOT, &Eit { count: 1 }, None).expect("first write");
    let err = serialize(&mut file, NodeId::ROOT, &Eit { count: 2 }, None).unwrap_err();

    match err {
        Error::BackendWrite { path, source } => {
            assert_eq!(path, "/eit");
            assert_eq!(source, BackendError::AlreadyExists("/eit".into()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Shared and cyclic graphs
// ============================================================================

#[test]
fn test_shared_subobject_written_per_reference() {
    let shared = Rc::new(Shared { v: 5 });
    let dag = Dag {
        a: Rc::clone(&shared),
        b: Rc::clone(&shared),
    };

    for guard in [false, true] {
        let mut file = MemoryContainer::new();
        Serializer::new()
            .with_options(SerializeOptions::new().with_cycle_guard(guard))
            .serialize(&mut file, NodeId::ROOT, &dag, None)
            .expect("DAG must serialize");
        assert!(file.get("/dag/a/v").is_some());
        assert!(file.get("/dag/b/v").is_some());
    }
}

#[test]
fn test_cycle_guard_detects_cycle() {
    let mut file = MemoryContainer::new();
    let looped = Looped { id: 1 };
    let err = Serializer::new()
        .with_options(SerializeOptions::new().with_cycle_guard(true))
        .serialize(&mut file, NodeId::ROOT, &looped, None)
        .unwrap_err();

    match err {
        Error::CycleDetected { path, type_name } => {
            assert_eq!(path, "/loop/me");
            assert_eq!(type_name, "Looped");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(file.open_groups(), 0);
}

#[test]
fn test_cycle_guard_allows_first_field_at_same_address() {
    let mut file = MemoryContainer::new();
    let outer = Outer { inner: Inner { x: 3 } };
    Serializer::new()
        .with_options(SerializeOptions::new().with_cycle_guard(true))
        .serialize(&mut file, NodeId::ROOT, &outer, None)
        .expect("struct and its first field are different objects");
    assert!(file.get("/outer/inner/x").is_some());
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_json_export_of_serialized_tree() {
    let mut file = MemoryContainer::new();
    let rig = Rig {
        sensor: Sensor { reading: 0.5 },
        gain: 3.0,
    };
    serialize(&mut file, NodeId::ROOT, &rig, None).expect("serialize failed");

    let json = file.to_json();
    let children = json["children"].as_array().expect("children");
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["name"], "sensor");
    assert_eq!(children[0]["kind"], "group");
    assert_eq!(children[0]["children"][0]["value"], 0.5);

    let temp = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.save_json(temp.path()).expect("save failed");
    let text = std::fs::read_to_string(temp.path()).expect("read back");
    assert!(text.contains("gain_db"));

    let kinds: Vec<bool> = children
        .iter()
        .map(|c| c["kind"] == "group")
        .collect();
    assert_eq!(kinds, [true, false]);
    assert!(matches!(
        file.get("/gain_db").map(|n| n.kind()),
        Some(NodeKind::Scalar(ScalarValue::Float32(_)))
    ));
}
