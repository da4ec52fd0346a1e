//! End-to-end parser scenarios (spec.md §8).

use confiture::error::ParsingError;
use confiture::tree::Payload;
use confiture::Confiture;
use pretty_assertions::assert_eq;
use rstest::rstest;
use testresult::TestResult;

#[test]
fn e1_scalar_assignments() -> TestResult {
    let tree = Confiture::from_str("daemon = yes\nport = 8080\n", "<e1>")?;
    let root = tree.root();
    assert_eq!(tree.section(root).get("daemon").unwrap().payload, Payload::Bool(true));
    assert_eq!(tree.section(root).get("port").unwrap().payload, Payload::Int(8080));
    Ok(())
}

#[test]
fn e2_iec_unit_suffix() -> TestResult {
    let tree = Confiture::from_str("size = 2 Gi\n", "<e2>")?;
    let root = tree.root();
    assert_eq!(tree.section(root).get("size").unwrap().payload, Payload::Int(2_147_483_648));
    Ok(())
}

#[rstest]
#[case("1,2,3")]
#[case("1,2,3,")]
#[case("1,\n2,\n3")]
#[case("1,\n2,\n3,")]
fn list_normal_forms(#[case] list: &str) -> TestResult {
    let source = format!("x = {list}\n");
    let tree = Confiture::from_str(&source, "<test>")?;
    let root = tree.root();
    assert_eq!(
        tree.section(root).get("x").unwrap().payload,
        Payload::List(vec![Payload::Int(1), Payload::Int(2), Payload::Int(3)])
    );
    Ok(())
}

#[test]
fn section_position_points_at_name_token() -> TestResult {
    let tree = Confiture::from_str("\n\nserver \"web\" {\n  port = 80\n}\n", "<test>")?;
    let root = tree.root();
    let ids = tree.section(root).subsections("server");
    let section = tree.section(ids[0]);
    assert_eq!(section.position.line, 3);
    assert_eq!(section.position.column, 1);
    Ok(())
}

#[test]
fn newline_missing_guard_reports_offending_name() {
    let err = Confiture::from_str("a = 1 b = 2", "<test>").unwrap_err();
    match err {
        confiture::Error::Parsing(ParsingError::NewlineMissing { token, position }) => {
            assert_eq!(token, "b");
            assert_eq!(position.line, 1);
        }
        other => panic!("expected NewlineMissing, got {other:?}"),
    }
}

#[test]
fn unterminated_section_reports_unexpected_eof() {
    let err = Confiture::from_str("section {\n", "<test>").unwrap_err();
    assert!(matches!(err, confiture::Error::Parsing(ParsingError::UnexpectedEof)));
}

#[test]
fn illegal_character_reports_position() {
    let err = Confiture::from_str("x = @\n", "<test>").unwrap_err();
    match err {
        confiture::Error::Parsing(ParsingError::IllegalCharacter { character, position }) => {
            assert_eq!(character, '@');
            assert_eq!(position.column, 5);
        }
        other => panic!("expected IllegalCharacter, got {other:?}"),
    }
}

#[test]
fn nested_sections_keep_source_order() -> TestResult {
    let tree = Confiture::from_str(
        "upstream {\n  server 'a' { weight = 1 }\n  server 'b' { weight = 2 }\n}\n",
        "<test>",
    )?;
    let root = tree.root();
    let upstream = tree.section(tree.section(root).subsections("upstream")[0]);
    let servers = upstream.subsections("server");
    assert_eq!(servers.len(), 2);
    assert_eq!(tree.section(servers[0]).args.as_ref().unwrap().payload, Payload::List(vec![Payload::Str("a".into())]));
    assert_eq!(tree.section(servers[1]).get("weight").unwrap().payload, Payload::Int(2));
    Ok(())
}

#[test]
fn to_json_always_lists_subsections() -> TestResult {
    let tree = Confiture::from_str("server { port = 1 }\n", "<test>")?;
    let json = tree.to_json(tree.root());
    let servers = json.get("server").and_then(|v| v.as_array()).expect("server should be an array");
    assert_eq!(servers.len(), 1);
    Ok(())
}

#[test]
fn to_json_snapshot_nested_sections() -> TestResult {
    let tree = Confiture::from_str(
        "daemon = yes\nupstream {\n  server { weight = 1 }\n  server { weight = 2 }\n}\n",
        "<test>",
    )?;
    let json = serde_json::to_string_pretty(&tree.to_json(tree.root()))?;
    insta::assert_snapshot!(json, @r#"
    {
      "daemon": true,
      "upstream": [
        {
          "server": [
            {
              "weight": 1
            },
            {
              "weight": 2
            }
          ]
        }
      ]
    }"#);
    Ok(())
}
