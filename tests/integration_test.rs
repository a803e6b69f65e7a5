//! End-to-end decoding tests: mapping documents in, decoded record
//! graphs out.

use std::io;
use std::path::PathBuf;

use rowbind::{
    AttrValue, DecodeError, FieldConfig, FieldValue, GenericRecord, LineSource, LoadError,
    MappingConfig, Record, RecordDecoder, RecordFactory, SchemaGraph, SetError, ShapeConfig,
    TransformRegistry, VecLineSource,
};

fn employee_mapping_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join("examples")
        .join("employee.yaml")
}

fn generic_factory(types: &[&str]) -> RecordFactory {
    let mut factory = RecordFactory::new();
    for target in types {
        factory.register_default::<GenericRecord>(*target);
    }
    factory
}

#[test]
fn test_employee_mapping_end_to_end() {
    let (_registry, graph) = MappingConfig::load_from_file(employee_mapping_path())
        .unwrap()
        .build()
        .unwrap();
    let factory = generic_factory(&["employee", "designation"]);
    let decoder = RecordDecoder::new(&graph, &factory);

    let source = VecLineSource::from_rows(&[
        &[
            "empNo", "name", "designation", "dept", "grade", "site", "contractor", "billing",
        ],
        &[
            "123456",
            "John Q Public",
            "Lead",
            "x",
            "y",
            "z",
            "CONTRACTOR007",
            "BILLID01",
        ],
    ]);

    let records: Vec<_> = decoder.records("employee", Box::new(source)).unwrap().collect();
    assert_eq!(records.len(), 1);

    let employee = records[0].downcast_ref::<GenericRecord>().unwrap();
    assert_eq!(employee.text("id"), Some("123456"));
    assert_eq!(employee.text("first_name"), Some("John"));
    assert_eq!(employee.text("last_name"), Some("Public"));
    assert_eq!(employee.text("contractor_id"), Some("CONTRACTOR007"));
    assert_eq!(employee.text("billing_id"), Some("BILLID01"));

    let designation = employee.nested("designation").unwrap();
    assert_eq!(designation.text("value"), Some("Lead"));
}

#[test]
fn test_configured_transform_alias() {
    let (registry, _graph) = MappingConfig::load_from_file(employee_mapping_path())
        .unwrap()
        .build()
        .unwrap();

    let upper = registry.resolve("upper").unwrap();
    assert_eq!(upper.apply(Some("anupam")), FieldValue::Text("ANUPAM".to_string()));
    assert_eq!(upper.apply(None), FieldValue::Null);
    assert_eq!(upper.apply(Some("")), FieldValue::Text("".to_string()));
}

#[test]
fn test_person_and_email_share_one_row() {
    let registry = TransformRegistry::with_builtins();
    let graph = SchemaGraph::load(
        vec![
            ShapeConfig::new("person", "person")
                .with_field(FieldConfig::new(0, "name"))
                .with_field(FieldConfig::new(1, "city"))
                .with_field(FieldConfig::new(2, "country"))
                .with_field(FieldConfig::new(3, "email").with_reference("email")),
            ShapeConfig::new("email", "email")
                .with_field(FieldConfig::new(3, "id"))
                .with_field(FieldConfig::new(4, "provider")),
        ],
        &registry,
    )
    .unwrap();
    let factory = generic_factory(&["person", "email"]);
    let decoder = RecordDecoder::new(&graph, &factory);

    let source = VecLineSource::from_rows(&[&[
        "Jane",
        "Wellington",
        "NZ",
        "jane@example.org",
        "example",
    ]]);
    let records: Vec<_> = decoder.records("person", Box::new(source)).unwrap().collect();

    let person = records[0].downcast_ref::<GenericRecord>().unwrap();
    assert_eq!(person.text("name"), Some("Jane"));
    assert_eq!(person.text("country"), Some("NZ"));

    // The nested record read the same row, not a sub-slice.
    let email = person.nested("email").unwrap();
    assert_eq!(email.text("id"), Some("jane@example.org"));
    assert_eq!(email.text("provider"), Some("example"));
}

#[test]
fn test_dangling_reference_decodes_as_scalar() {
    let registry = TransformRegistry::with_builtins();
    let graph = SchemaGraph::load(
        vec![ShapeConfig::new("person", "person")
            .with_field(FieldConfig::new(0, "contact").with_reference("unloaded"))],
        &registry,
    )
    .unwrap();
    let factory = generic_factory(&["person"]);
    let decoder = RecordDecoder::new(&graph, &factory);

    let source = VecLineSource::from_rows(&[&["raw contact"]]);
    let records: Vec<_> = decoder.records("person", Box::new(source)).unwrap().collect();

    let person = records[0].downcast_ref::<GenericRecord>().unwrap();
    // Degraded to a plain scalar carrying the raw value.
    assert_eq!(person.text("contact"), Some("raw contact"));
    assert!(person.nested("contact").is_none());
}

#[test]
fn test_cyclic_mapping_rejected_at_build() {
    let yaml = r#"
shapes:
  - name: a
    target_type: a
    fields:
      - position: 0
        attribute: b
        reference: b
  - name: b
    target_type: b
    fields:
      - position: 1
        attribute: a
        reference: a
"#;

    let result = MappingConfig::from_yaml(yaml).unwrap().build();

    assert!(matches!(result, Err(LoadError::CyclicReference { .. })));
}

#[test]
fn test_faulting_source_ends_stream_quietly() {
    struct FlakySource {
        rows: usize,
    }

    impl LineSource for FlakySource {
        fn next_line(&mut self) -> io::Result<Option<Vec<String>>> {
            if self.rows == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
            }
            self.rows -= 1;
            Ok(Some(vec![format!("row-{}", self.rows)]))
        }
    }

    let registry = TransformRegistry::with_builtins();
    let graph = SchemaGraph::load(
        vec![ShapeConfig::new("line", "line").with_field(FieldConfig::new(0, "value"))],
        &registry,
    )
    .unwrap();
    let factory = generic_factory(&["line"]);
    let decoder = RecordDecoder::new(&graph, &factory);

    let records: Vec<_> = decoder
        .records("line", Box::new(FlakySource { rows: 2 }))
        .unwrap()
        .collect();

    // Two good rows decoded; the fault ends the stream without an error.
    assert_eq!(records.len(), 2);
}

#[test]
fn test_typed_record_target() {
    #[derive(Default)]
    struct Employee {
        id: String,
        first_name: String,
        last_name: String,
    }

    impl Record for Employee {
        fn set_attribute(&mut self, attribute: &str, value: AttrValue) -> Result<(), SetError> {
            let text = match value.as_field().and_then(FieldValue::as_text) {
                Some(text) => text.to_string(),
                None => {
                    return Err(SetError::Rejected {
                        attribute: attribute.to_string(),
                        reason: "expected text".to_string(),
                    })
                }
            };
            match attribute {
                "id" => self.id = text,
                "first_name" => self.first_name = text,
                "last_name" => self.last_name = text,
                other => return Err(SetError::UnknownAttribute(other.to_string())),
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    }

    let registry = TransformRegistry::with_builtins();
    let graph = SchemaGraph::load(
        vec![ShapeConfig::new("employee", "employee")
            .with_field(FieldConfig::new(0, "id"))
            .with_field(FieldConfig::new(1, "first_name").with_transform("firstWord"))
            .with_field(FieldConfig::new(1, "last_name").with_transform("lastWord"))
            // No such attribute on the target; the setter rejects it
            // and the rest of the record still decodes.
            .with_field(FieldConfig::new(2, "grade"))],
        &registry,
    )
    .unwrap();

    let mut factory = RecordFactory::new();
    factory.register_default::<Employee>("employee");
    let decoder = RecordDecoder::new(&graph, &factory);

    let record = decoder
        .decode(
            &[
                "123456".to_string(),
                "John Q Public".to_string(),
                "A1".to_string(),
            ],
            graph.get("employee").unwrap(),
        )
        .unwrap();

    let employee = record.downcast::<Employee>().unwrap();
    assert_eq!(employee.id, "123456");
    assert_eq!(employee.first_name, "John");
    assert_eq!(employee.last_name, "Public");
}

#[test]
fn test_missing_root_type_yields_no_records() {
    let registry = TransformRegistry::with_builtins();
    let graph = SchemaGraph::load(
        vec![ShapeConfig::new("person", "person").with_field(FieldConfig::new(0, "id"))],
        &registry,
    )
    .unwrap();
    let factory = RecordFactory::new();
    let decoder = RecordDecoder::new(&graph, &factory);

    let source = VecLineSource::from_rows(&[&["1"], &["2"], &["3"]]);
    let records: Vec<_> = decoder.records("person", Box::new(source)).unwrap().collect();

    assert!(records.is_empty());

    // The shape itself is still addressable; only instantiation fails.
    assert!(matches!(
        decoder.decode(&["1".to_string()], graph.get("person").unwrap()),
        Err(DecodeError::Instantiation { .. })
    ));
}
