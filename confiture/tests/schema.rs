//! End-to-end schema validation scenarios (spec.md §8).

use confiture::schema::containers::{SectionMeta, MANY};
use confiture::schema::{Choice, Field, Integer, List, SectionSchema, StringType, Type, Validated, Value};
use confiture::tree::Payload;
use confiture::{Confiture, Error};
use pretty_assertions::assert_eq;
use testresult::TestResult;

fn listener_schema() -> SectionSchema {
    let inner = SectionSchema::new(
        SectionMeta {
            repeat: MANY,
            unique: true,
            args: Some(Box::new(Value::new(StringType::new()))),
            ..SectionMeta::default()
        },
        vec![("k".to_string(), Field::Value(Box::new(Value::new(Integer::new()))))],
    );
    SectionSchema::new(SectionMeta::default(), vec![("s".to_string(), Field::Section(inner))])
}

#[test]
fn e3_unique_args_accept_distinct_names() -> TestResult {
    let source = "s 'x' { k = 1 }\ns 'y' { k = 2 }\n";
    let validated = Confiture::from_str_with_schema(source, "<e3>", &listener_schema())?;
    assert_eq!(validated.section(validated.root()).subsections("s").len(), 2);
    Ok(())
}

#[test]
fn e3_unique_args_reject_duplicate_names() {
    let source = "s 'x' { k = 1 }\ns 'x' { k = 2 }\n";
    let err = Confiture::from_str_with_schema(source, "<e3>", &listener_schema()).unwrap_err();
    match err {
        Error::Validation(err) => assert!(err.message.contains("unique")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn e4_allow_unknown_passes_extra_keys_through() -> TestResult {
    let inner = SectionSchema::new(
        SectionMeta {
            allow_unknown: true,
            args: Some(Box::new(Value::new(StringType::new()))),
            ..SectionMeta::default()
        },
        vec![("common".to_string(), Field::Value(Box::new(Value::new(Integer::new()))))],
    );
    let schema = SectionSchema::new(SectionMeta::default(), vec![("plugin".to_string(), Field::Section(inner))]);

    let validated = Confiture::from_str_with_schema("plugin 'a' { common = 1 }\n", "<e4>", &schema)?;
    let plugin_id = validated.section(validated.root()).subsections("plugin")[0];
    assert!(validated.section(plugin_id).get("extra").is_none());

    let validated = Confiture::from_str_with_schema("plugin 'a' { extra = 1 }\n", "<e4>", &schema)?;
    let plugin_id = validated.section(validated.root()).subsections("plugin")[0];
    match &validated.section(plugin_id).get("extra").unwrap().payload {
        Validated::Raw(Payload::Int(1)) => {}
        other => panic!("expected raw passthrough of unknown key, got {other:?}"),
    }
    Ok(())
}

#[test]
fn e5_list_rejected_where_scalar_expected() {
    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("x".to_string(), Field::Value(Box::new(Value::new(Integer::new()))))],
    );
    let err = Confiture::from_str_with_schema("x = 1,\n2,\n3\n", "<e5>", &schema).unwrap_err();
    match err {
        Error::Validation(err) => assert!(err.message.contains("is a list")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn e6_missing_required_field_names_the_key() {
    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("n".to_string(), Field::Value(Box::new(Value::new(Integer::new()))))],
    );
    let err = Confiture::from_str_with_schema("", "<e6>", &schema).unwrap_err();
    match err {
        Error::Validation(err) => {
            assert!(err.message.contains("key n"));
            assert!(err.message.contains("required"));
        }
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn choice_maps_accepted_key_and_rejects_others() {
    let choices = vec![("on".to_string(), Validated::Bool(true)), ("off".to_string(), Validated::Bool(false))];
    let container: Vec<(Payload, Validated)> = choices.into_iter().map(|(k, v)| (Payload::Str(k), v)).collect();
    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("mode".to_string(), Field::Value(Box::new(Choice::new(container))))],
    );

    let validated = Confiture::from_str_with_schema("mode = \"on\"\n", "<test>", &schema).unwrap();
    assert!(matches!(validated.section(validated.root()).get("mode").unwrap().payload, Validated::Bool(true)));

    let err = Confiture::from_str_with_schema("mode = \"maybe\"\n", "<test>", &schema).unwrap_err();
    match err {
        Error::Validation(err) => assert!(err.message.contains("bad choice")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn array_enforces_exact_size() {
    use confiture::schema::Array;

    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("xyz".to_string(), Field::Value(Box::new(Array::new(Integer::new(), 3))))],
    );
    assert!(Confiture::from_str_with_schema("xyz = 1,2\n", "<test>", &schema).is_err());
    assert!(Confiture::from_str_with_schema("xyz = 1,2,3,4\n", "<test>", &schema).is_err());
    assert!(Confiture::from_str_with_schema("xyz = 1,2,3\n", "<test>", &schema).is_ok());
}

#[test]
fn section_repeat_bounds_two_to_three() {
    fn schema_with(repeat: (u32, Option<u32>)) -> SectionSchema {
        let inner = SectionSchema::new(SectionMeta { repeat, ..SectionMeta::default() }, vec![]);
        SectionSchema::new(SectionMeta::default(), vec![("node".to_string(), Field::Section(inner))])
    }

    let schema = schema_with((2, Some(3)));
    assert!(Confiture::from_str_with_schema("", "<test>", &schema).is_err());
    assert!(Confiture::from_str_with_schema("node {}\n", "<test>", &schema).is_err());
    assert!(Confiture::from_str_with_schema("node {}\nnode {}\n", "<test>", &schema).is_ok());
    assert!(Confiture::from_str_with_schema("node {}\nnode {}\nnode {}\n", "<test>", &schema).is_ok());
    assert!(Confiture::from_str_with_schema("node {}\nnode {}\nnode {}\nnode {}\n", "<test>", &schema).is_err());
}

#[test]
fn list_container_coerces_bare_scalar() -> TestResult {
    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("tags".to_string(), Field::Value(Box::new(List::new(StringType::new()))))],
    );
    let validated = Confiture::from_str_with_schema("tags = \"only\"\n", "<test>", &schema)?;
    match &validated.section(validated.root()).get("tags").unwrap().payload {
        Validated::List(items) => assert_eq!(items.len(), 1),
        other => panic!("expected List, got {other:?}"),
    }
    Ok(())
}

#[test]
fn list_element_error_names_the_index() {
    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("ns".to_string(), Field::Value(Box::new(List::new(Integer::new()))))],
    );
    let err = Confiture::from_str_with_schema("ns = 1,2,\"x\"\n", "<test>", &schema).unwrap_err();
    match err {
        Error::Validation(err) => assert!(err.message.contains("item #2")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn idempotence_structural_equality_on_revalidation() -> TestResult {
    let schema = listener_schema();
    let source = "s 'x' { k = 1 }\n";
    let first = Confiture::from_str_with_schema(source, "<test>", &schema)?;
    let second = Confiture::from_str_with_schema(source, "<test>", &schema)?;
    assert_eq!(first.to_json(first.root()), second.to_json(second.root()));
    Ok(())
}

#[test]
fn section_with_no_args_container_rejects_any_argument() {
    let schema = SectionSchema::new(
        SectionMeta::default(),
        vec![("s".to_string(), Field::Section(SectionSchema::new(SectionMeta::default(), vec![])))],
    );
    let err = Confiture::from_str_with_schema("s 'x' {}\n", "<test>", &schema).unwrap_err();
    match err {
        Error::Validation(err) => assert!(err.message.contains("does not take any argument")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn type_cast_seam_parses_raw_strings() {
    let ty = Integer::bounded(Some(0), Some(10));
    assert!(matches!(ty.cast("5"), Ok(Validated::Int(5))));
    assert!(ty.cast("11").is_err());
}
