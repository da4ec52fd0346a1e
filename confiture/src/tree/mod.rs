//! The parsed configuration tree: [`Position`], [`Payload`], [`Value`],
//! [`Section`] and the arena that owns them, [`Tree`].
//!
//! A [`Section`] never owns its parent or its children directly. Parents are
//! referenced through a [`SectionId`] handle into the owning [`Tree`], the
//! same non-owning-back-reference shape `rowan`-style syntax trees use for
//! their red/green layers, and the one spec.md §9 names explicitly ("arena
//! with indices").

use std::fmt;

use serde::Serialize;

/// A position in a source file: the file name, 1-based line and 1-based
/// column of a token or a synthesized node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// The file the position belongs to (`"<unknown>"` for synthesized
    /// nodes, e.g. schema defaults).
    pub file: String,
    /// 1-based line number, or `0` for the sentinel position.
    pub line: usize,
    /// 1-based column number, or `0` for the sentinel position.
    pub column: usize,
}

impl Position {
    /// Builds a new position.
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Position {
            file: file.into(),
            line,
            column,
        }
    }

    /// The sentinel position attached to synthesized nodes (schema defaults,
    /// the root `__top__` section before parsing starts).
    pub fn sentinel() -> Self {
        Position {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in {}, line {}, position {}", self.file, self.line, self.column)
    }
}

/// A scalar or list value carried by a [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// A quoted string.
    Str(String),
    /// An integer literal, possibly scaled by a unit suffix.
    Int(i64),
    /// A floating point literal, possibly scaled by a unit suffix.
    Float(f64),
    /// `yes` / `no`.
    Bool(bool),
    /// A comma-separated list, or a section's argument list.
    List(Vec<Payload>),
}

impl Payload {
    /// A human-readable `repr`-like rendering, used in error messages such
    /// as `'<repr> is a list'`.
    pub fn describe(&self) -> String {
        match self {
            Payload::Str(s) => format!("{s:?}"),
            Payload::Int(n) => n.to_string(),
            Payload::Float(n) => n.to_string(),
            Payload::Bool(b) => b.to_string(),
            Payload::List(items) => {
                let inner: Vec<String> = items.iter().map(Payload::describe).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }

    /// `true` if this payload is a [`Payload::List`].
    pub fn is_list(&self) -> bool {
        matches!(self, Payload::List(_))
    }
}

/// A named leaf of the configuration tree: either a `name = value`
/// assignment or a section's `<args>` value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    /// The assigned name (`"<args>"` for section arguments).
    pub name: String,
    /// The payload carried by this value.
    pub payload: Payload,
    /// Where the right-hand side of the assignment starts.
    pub position: Position,
}

impl Value {
    /// Builds a new value.
    pub fn new(name: impl Into<String>, payload: Payload, position: Position) -> Self {
        Value {
            name: name.into(),
            payload,
            position,
        }
    }

    /// Unwraps a single-element list payload to its element, leaving any
    /// other payload untouched. Used by schema containers that accept a
    /// scalar but must tolerate `"x = 1,"`-style one-element lists.
    pub fn unwrap_singleton_list(&self) -> &Payload {
        match &self.payload {
            Payload::List(items) if items.len() == 1 => &items[0],
            other => other,
        }
    }
}

/// Opaque handle to a [`Section`] stored in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub(crate) usize);

/// A section of the configuration tree: `name { ... }`, possibly preceded by
/// positional arguments (`name "arg1", "arg2" { ... }`).
///
/// `values` and `subsections` are both append-only, insertion-ordered lists:
/// the grammar never removes a child once registered, only the schema
/// validator (building a *new* tree) does anything resembling replacement.
#[derive(Debug, Clone)]
pub struct Section {
    /// The section's name (`"__top__"` for the root).
    pub name: String,
    /// The enclosing section, or `None` for the root.
    pub parent: Option<SectionId>,
    /// The section's positional arguments, if any. When present, the
    /// payload is always a [`Payload::List`], even for a single argument.
    pub args: Option<Value>,
    /// Where the section's name token starts (or the sentinel, for `__top__`).
    pub position: Position,
    pub(crate) values: Vec<Value>,
    pub(crate) subsections: Vec<(String, Vec<SectionId>)>,
}

/// What kind of child already occupies a name, used to report the
/// "a name is either a value or a set of subsections, never both" invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameConflict {
    /// The name is already registered as a value.
    Value,
    /// The name is already registered as a subsection.
    Subsection,
}

impl Section {
    pub(crate) fn new(name: impl Into<String>, parent: Option<SectionId>, position: Position) -> Self {
        Section {
            name: name.into(),
            parent,
            args: None,
            position,
            values: Vec::new(),
            subsections: Vec::new(),
        }
    }

    /// `true` if `name` is already registered, either as a value or as a
    /// subsection name.
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name) || self.subsections.iter().any(|(n, _)| n == name)
    }

    /// Returns which kind of child already owns `name`, if any.
    fn conflict(&self, name: &str) -> Option<NameConflict> {
        if self.values.iter().any(|v| v.name == name) {
            Some(NameConflict::Value)
        } else if self.subsections.iter().any(|(n, _)| n == name) {
            Some(NameConflict::Subsection)
        } else {
            None
        }
    }

    /// Registers a value child, failing if `name` is already used by a
    /// value or by a subsection.
    pub fn register_value(&mut self, value: Value) -> Result<(), NameConflict> {
        if let Some(conflict) = self.conflict(&value.name) {
            return Err(conflict);
        }
        self.values.push(value);
        Ok(())
    }

    /// Registers a subsection occurrence under `name`, failing if `name` is
    /// already used by a value.
    pub fn register_subsection(&mut self, name: impl Into<String>, id: SectionId) -> Result<(), NameConflict> {
        let name = name.into();
        if let Some(NameConflict::Value) = self.conflict(&name) {
            return Err(NameConflict::Value);
        }
        if let Some(group) = self.subsections.iter_mut().find(|(n, _)| *n == name) {
            group.1.push(id);
        } else {
            self.subsections.push((name, vec![id]));
        }
        Ok(())
    }

    /// Iterates over this section's values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Returns the raw [`Value`] registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Returns the ids of subsections registered under `name`, in source
    /// order. Empty if no such subsection exists.
    pub fn subsections(&self, name: &str) -> &[SectionId] {
        self.subsections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Names and occurrence-lists of every subsection group, in the order
    /// their names were first seen.
    pub fn subsection_groups(&self) -> impl Iterator<Item = (&str, &[SectionId])> {
        self.subsections.iter().map(|(n, ids)| (n.as_str(), ids.as_slice()))
    }

    /// The "expanded children" of spec.md's glossary: every value, and every
    /// individual subsection *occurrence* (never grouped by name).
    pub fn expanded_children(&self) -> impl Iterator<Item = ExpandedChild<'_>> {
        let values = self.values.iter().map(ExpandedChild::Value);
        let sections = self
            .subsections
            .iter()
            .flat_map(|(name, ids)| ids.iter().map(move |id| ExpandedChild::Subsection(name, *id)));
        values.chain(sections)
    }
}

/// One expanded child of a section: either a value, or one occurrence of a
/// named subsection.
#[derive(Debug, Clone, Copy)]
pub enum ExpandedChild<'a> {
    /// A value child.
    Value(&'a Value),
    /// One occurrence of a subsection registered under this name.
    Subsection(&'a str, SectionId),
}

impl ExpandedChild<'_> {
    /// The name this child is registered under.
    pub fn name(&self) -> &str {
        match self {
            ExpandedChild::Value(v) => &v.name,
            ExpandedChild::Subsection(name, _) => name,
        }
    }
}

/// An arena of [`Section`]s produced by the parser (or, after validation, by
/// the schema — see [`crate::schema::validated::ValidatedTree`]).
#[derive(Debug, Clone)]
pub struct Tree {
    sections: Vec<Section>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Tree { sections: Vec::new() }
    }

    pub(crate) fn alloc(&mut self, section: Section) -> SectionId {
        let id = SectionId(self.sections.len());
        self.sections.push(section);
        id
    }

    /// The handle for the synthetic `__top__` root section.
    pub fn root(&self) -> SectionId {
        SectionId(0)
    }

    /// Borrows the section behind `id`.
    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }

    pub(crate) fn section_mut(&mut self, id: SectionId) -> &mut Section {
        &mut self.sections[id.0]
    }

    /// Renders `id` (and everything beneath it) the way `to_dict()` would in
    /// spec.md §6: value names map to raw payloads, subsection names map to
    /// an array of nested objects (always an array, even for a single
    /// occurrence).
    pub fn to_json(&self, id: SectionId) -> serde_json::Value {
        let section = self.section(id);
        let mut map = serde_json::Map::new();
        for value in section.values() {
            map.insert(
                value.name.clone(),
                serde_json::to_value(&value.payload).unwrap_or(serde_json::Value::Null),
            );
        }
        for (name, ids) in section.subsection_groups() {
            let items: Vec<serde_json::Value> = ids.iter().map(|child| self.to_json(*child)).collect();
            map.insert(name.to_string(), serde_json::Value::Array(items));
        }
        serde_json::Value::Object(map)
    }
}
