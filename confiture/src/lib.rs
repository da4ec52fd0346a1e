//! Confiture is a small declarative configuration language -- scalar
//! assignments, lists, named sections with optional positional arguments,
//! nested sections, numeric unit suffixes, comments and file inclusion via a
//! glob pattern -- together with a two-stage pipeline that turns source text
//! into a validated, in-memory tree:
//!
//! 1. [`parser`] tokenizes and parses source text into a [`tree::Tree`],
//!    resolving `include` directives inline and reporting syntax errors with
//!    file/line/column positions.
//! 2. [`schema`] describes the expected shape of that tree (sections,
//!    scalars, choices, lists, arrays, cardinality, uniqueness, defaults,
//!    typed coercion, unknown-key policy) and rebuilds a new, validated tree
//!    as a side-effect-free transformation of the parsed one.
//!
//! [`Confiture`] is the thin façade most callers want: it drives the parser
//! and, if a schema is supplied, the validator, and returns whichever tree
//! resulted.
//!
//! ```
//! use confiture::Confiture;
//!
//! let tree = Confiture::from_str("daemon = yes\nport = 8080\n", "<inline>").unwrap();
//! let root = tree.root();
//! assert_eq!(tree.section(root).get("port").unwrap().payload, confiture::tree::Payload::Int(8080));
//! ```

pub mod error;
pub mod parser;
pub mod schema;
pub mod tree;
mod units;

use std::fs;
use std::path::Path;

pub use error::Error;
use parser::{ExternalOpener, GlobOpener};
pub use schema::containers::SectionSchema;
pub use schema::validated::ValidatedTree;
pub use tree::Tree;

/// Thin façade over the parser and, optionally, the schema validator
/// (spec.md §4.5). Owns no state beyond what a single call needs; a
/// [`SectionSchema`] is immutable and may be reused across calls, including
/// concurrently, since `Confiture` itself holds nothing mutable.
#[derive(Debug, Default, Clone, Copy)]
pub struct Confiture;

impl Confiture {
    /// Parses `source` into a raw [`Tree`], attributing positions to
    /// `input_name`. `include` directives resolve via the default
    /// filesystem-backed glob opener ([`GlobOpener`]).
    pub fn from_str(source: &str, input_name: &str) -> Result<Tree, Error> {
        Confiture::from_str_with_opener(source, input_name, &GlobOpener)
    }

    /// Like [`Confiture::from_str`], but resolves `include` directives
    /// through a caller-supplied [`ExternalOpener`] instead of the
    /// filesystem (tests commonly swap in an in-memory opener).
    pub fn from_str_with_opener(source: &str, input_name: &str, opener: &dyn ExternalOpener) -> Result<Tree, Error> {
        parser::parse(source, input_name, opener).map_err(Error::from)
    }

    /// Reads `path` and parses its contents, using `path` itself as the
    /// input name attached to every position.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Tree, Error> {
        let path = path.as_ref();
        let input_name = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|err| error::ParsingError::IncludeOpenFailed {
            path: input_name.clone(),
            reason: err.to_string(),
        })?;
        Confiture::from_str(&source, &input_name)
    }

    /// Parses `source` and validates the result against `schema`, returning
    /// the validated tree.
    pub fn from_str_with_schema(source: &str, input_name: &str, schema: &SectionSchema) -> Result<ValidatedTree, Error> {
        let tree = Confiture::from_str(source, input_name)?;
        Confiture::validate(&tree, schema)
    }

    /// Reads `path`, parses it, and validates the result against `schema`.
    pub fn from_file_with_schema(path: impl AsRef<Path>, schema: &SectionSchema) -> Result<ValidatedTree, Error> {
        let tree = Confiture::from_file(path)?;
        Confiture::validate(&tree, schema)
    }

    /// Validates an already-parsed [`Tree`] against `schema`, without
    /// mutating it -- the tree passed in is read-only input, the returned
    /// [`ValidatedTree`] is a fresh structure (spec.md §3: "Validation
    /// produces a *new* section tree").
    pub fn validate(tree: &Tree, schema: &SectionSchema) -> Result<ValidatedTree, Error> {
        let mut out = ValidatedTree::new();
        schema.validate(tree, tree.root(), None, &mut out)?;
        Ok(out)
    }
}
