//! `include` expansion scenarios (spec.md §4.2, §8 E8): a custom
//! [`ExternalOpener`] stands in for the filesystem so these tests don't
//! touch disk.

use std::collections::BTreeMap;

use confiture::error::ParsingError;
use confiture::parser::{self, ExternalOpener};
use confiture::tree::Payload;
use confiture::Error;

#[derive(Debug, Default)]
struct InMemoryOpener {
    files: BTreeMap<&'static str, Vec<(&'static str, &'static str)>>,
}

impl InMemoryOpener {
    fn with(mut self, pattern: &'static str, matches: Vec<(&'static str, &'static str)>) -> Self {
        self.files.insert(pattern, matches);
        self
    }
}

impl ExternalOpener for InMemoryOpener {
    fn open(&self, pattern: &str) -> Result<Vec<(String, String)>, ParsingError> {
        self.files
            .get(pattern)
            .map(|matches| matches.iter().map(|(name, source)| (name.to_string(), source.to_string())).collect())
            .ok_or_else(|| ParsingError::IncludeOpenFailed {
                path: pattern.to_string(),
                reason: "no such pattern registered".to_string(),
            })
    }
}

#[test]
fn e8_include_flattens_each_matched_file_individually() {
    let opener = InMemoryOpener::default().with(
        "parts/*.conf",
        vec![
            ("parts/a.conf", "listener { port = 1 }\n"),
            ("parts/b.conf", "listener { port = 2 }\n"),
        ],
    );
    let tree = parser::parse("include \"parts/*.conf\"\n", "<top>", &opener).unwrap();
    let root = tree.root();
    let listeners = tree.section(root).subsections("listener");
    assert_eq!(listeners.len(), 2);
    assert_eq!(tree.section(listeners[0]).get("port").unwrap().payload, Payload::Int(1));
    assert_eq!(tree.section(listeners[1]).get("port").unwrap().payload, Payload::Int(2));
}

#[test]
fn include_merges_values_at_the_including_level() {
    let opener = InMemoryOpener::default().with("extra.conf", vec![("extra.conf", "port = 9090\n")]);
    let tree = parser::parse("daemon = yes\ninclude \"extra.conf\"\n", "<top>", &opener).unwrap();
    let root = tree.root();
    assert_eq!(tree.section(root).get("daemon").unwrap().payload, Payload::Bool(true));
    assert_eq!(tree.section(root).get("port").unwrap().payload, Payload::Int(9090));
}

#[test]
fn include_collision_with_existing_value_is_an_error() {
    let opener = InMemoryOpener::default().with("dup.conf", vec![("dup.conf", "port = 1\n")]);
    let err = parser::parse("port = 2\ninclude \"dup.conf\"\n", "<top>", &opener).unwrap_err();
    assert!(matches!(err, ParsingError::DuplicateChildName { .. }));
}

#[test]
fn nested_include_is_resolved_through_the_same_opener() {
    let opener = InMemoryOpener::default()
        .with("first.conf", vec![("first.conf", "include \"second.conf\"\n")])
        .with("second.conf", vec![("second.conf", "depth = 2\n")]);
    let tree = parser::parse("include \"first.conf\"\n", "<top>", &opener).unwrap();
    assert_eq!(tree.section(tree.root()).get("depth").unwrap().payload, Payload::Int(2));
}

#[test]
fn include_open_failure_surfaces_as_parsing_error() {
    let opener = InMemoryOpener::default();
    let err = parser::parse("include \"missing/*.conf\"\n", "<top>", &opener).unwrap_err();
    assert!(matches!(err, ParsingError::IncludeOpenFailed { .. }));
}

#[test]
fn orchestrator_wraps_include_errors_too() {
    let opener = InMemoryOpener::default();
    let err = confiture::Confiture::from_str_with_opener("include \"missing/*.conf\"\n", "<top>", &opener).unwrap_err();
    assert!(matches!(err, Error::Parsing(ParsingError::IncludeOpenFailed { .. })));
}
