//! The tree produced by schema validation: the same entity kinds as
//! [`crate::tree`], but built fresh by [`super::containers::SectionSchema`]
//! rather than by the parser (spec.md §3, "Validation produces a *new*
//! section tree").

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use regex::Regex;
use url::Url;

use crate::tree::{Payload, Position};

/// A validated scalar, list, or passed-through-unknown value.
#[derive(Debug, Clone)]
pub enum Validated {
    /// A validated string.
    Str(String),
    /// A validated integer.
    Int(i64),
    /// A validated float.
    Float(f64),
    /// A validated boolean.
    Bool(bool),
    /// A validated list (from [`super::containers::List`],
    /// [`super::containers::Array`] or [`super::containers::TypedArray`]).
    List(Vec<Validated>),
    /// Named capture groups produced by `NamedRegex`, absent groups mapping
    /// to `None`.
    NamedGroups(BTreeMap<String, Option<String>>),
    /// A compiled pattern handle produced by `RegexPattern`.
    Regex(Regex),
    /// An IP address produced by `IpAddress`.
    IpAddress(IpAddr),
    /// A CIDR network produced by `IpNetwork`.
    IpNetwork(IpNetwork),
    /// A parsed URL produced by `Url`.
    Url(Url),
    /// An (address, port) pair produced by `IpSocketAddress`.
    SocketAddress(IpSocketAddress),
    /// An absolute filesystem path produced by `Path`.
    Path(PathBuf),
    /// A value carried through unchanged because its key was undeclared and
    /// `allow_unknown` permitted it (spec.md §4.3, unknown-key sweep).
    Raw(Payload),
}

impl Validated {
    /// Renders this value the way [`crate::tree::Tree::to_json`] renders a
    /// raw [`Payload`] -- used to build `to_dict()`-equivalent output for a
    /// validated tree.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Validated::Str(s) => serde_json::Value::String(s.clone()),
            Validated::Int(n) => serde_json::Value::from(*n),
            Validated::Float(n) => serde_json::Value::from(*n),
            Validated::Bool(b) => serde_json::Value::Bool(*b),
            Validated::List(items) => serde_json::Value::Array(items.iter().map(Validated::to_json).collect()),
            Validated::NamedGroups(groups) => {
                let mut map = serde_json::Map::new();
                for (name, value) in groups {
                    map.insert(
                        name.clone(),
                        value.clone().map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
                    );
                }
                serde_json::Value::Object(map)
            }
            Validated::Regex(pattern) => serde_json::Value::String(pattern.as_str().to_string()),
            Validated::IpAddress(addr) => serde_json::Value::String(addr.to_string()),
            Validated::IpNetwork(network) => serde_json::Value::String(network.to_string()),
            Validated::Url(url) => serde_json::Value::String(url.to_string()),
            Validated::SocketAddress(addr) => serde_json::Value::String(addr.to_string()),
            Validated::Path(path) => serde_json::Value::String(path.display().to_string()),
            Validated::Raw(payload) => serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// A CIDR network, hand-rolled since no network-prefix crate appears
/// anywhere in the retrieval pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpNetwork {
    /// The network's address.
    pub address: IpAddr,
    /// The network's prefix length (0-32 for IPv4, 0-128 for IPv6).
    pub prefix_len: u8,
}

impl IpNetwork {
    /// Parses a `<address>/<prefix-len>` CIDR literal.
    pub fn parse(input: &str) -> Result<Self, String> {
        let (address_part, prefix_part) = input
            .split_once('/')
            .ok_or_else(|| format!("{input:?} does not appear to be a CIDR network"))?;
        let address: IpAddr = address_part
            .parse()
            .map_err(|_| format!("{address_part:?} does not appear to be an IP address"))?;
        let max_prefix = if address.is_ipv4() { 32 } else { 128 };
        let prefix_len: u8 = prefix_part
            .parse()
            .map_err(|_| format!("{prefix_part:?} is not a valid prefix length"))?;
        if prefix_len > max_prefix {
            return Err(format!(
                "prefix length {prefix_len} exceeds {max_prefix} for this address family"
            ));
        }
        Ok(IpNetwork { address, prefix_len })
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// An `(address, port)` pair, as produced by `IpSocketAddress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpSocketAddress {
    /// The resolved address.
    pub address: IpAddr,
    /// The resolved port, always in `1..=65535`.
    pub port: u16,
}

impl fmt::Display for IpSocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A named, validated value: the validated-tree counterpart of
/// [`crate::tree::Value`].
#[derive(Debug, Clone)]
pub struct ValidatedValue {
    /// The field name this value was registered under.
    pub name: String,
    /// The validated payload.
    pub payload: Validated,
    /// Where the original value (or the sentinel, for a default) came from.
    pub position: Position,
}

impl ValidatedValue {
    /// Builds a new validated value.
    pub fn new(name: impl Into<String>, payload: Validated, position: Position) -> Self {
        ValidatedValue {
            name: name.into(),
            payload,
            position,
        }
    }
}

/// Opaque handle to a [`ValidatedSection`] stored in a [`ValidatedTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatedSectionId(pub(crate) usize);

/// A section of the validated tree: the validated-tree counterpart of
/// [`crate::tree::Section`].
#[derive(Debug, Clone)]
pub struct ValidatedSection {
    /// The section's name.
    pub name: String,
    /// The enclosing section, or `None` for the root.
    pub parent: Option<ValidatedSectionId>,
    /// Where the original section's name token started (or the sentinel).
    pub position: Position,
    /// The section's validated arguments, if its schema declared any.
    pub args: Option<ValidatedValue>,
    values: Vec<ValidatedValue>,
    subsections: Vec<(String, Vec<ValidatedSectionId>)>,
}

impl ValidatedSection {
    pub(crate) fn new(
        name: impl Into<String>,
        parent: Option<ValidatedSectionId>,
        position: Position,
        args: Option<ValidatedValue>,
    ) -> Self {
        ValidatedSection {
            name: name.into(),
            parent,
            position,
            args,
            values: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub(crate) fn register_value(&mut self, value: ValidatedValue) {
        self.values.push(value);
    }

    pub(crate) fn register_subsection(&mut self, name: impl Into<String>, id: ValidatedSectionId) {
        let name = name.into();
        if let Some(group) = self.subsections.iter_mut().find(|(n, _)| *n == name) {
            group.1.push(id);
        } else {
            self.subsections.push((name, vec![id]));
        }
    }

    /// Iterates over this section's values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &ValidatedValue> {
        self.values.iter()
    }

    /// Returns the validated value registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&ValidatedValue> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Returns the ids of subsections registered under `name`, in order.
    pub fn subsections(&self, name: &str) -> &[ValidatedSectionId] {
        self.subsections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Names and occurrence-lists of every subsection group, in first-seen
    /// order.
    pub fn subsection_groups(&self) -> impl Iterator<Item = (&str, &[ValidatedSectionId])> {
        self.subsections.iter().map(|(n, ids)| (n.as_str(), ids.as_slice()))
    }
}

/// The tree produced by [`super::containers::SectionSchema::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedTree {
    sections: Vec<ValidatedSection>,
}

impl ValidatedTree {
    pub(crate) fn new() -> Self {
        ValidatedTree { sections: Vec::new() }
    }

    pub(crate) fn alloc(&mut self, section: ValidatedSection) -> ValidatedSectionId {
        let id = ValidatedSectionId(self.sections.len());
        self.sections.push(section);
        id
    }

    /// The handle for the root of the validated tree.
    pub fn root(&self) -> ValidatedSectionId {
        ValidatedSectionId(0)
    }

    /// Borrows the section behind `id`.
    pub fn section(&self, id: ValidatedSectionId) -> &ValidatedSection {
        &self.sections[id.0]
    }

    pub(crate) fn section_mut(&mut self, id: ValidatedSectionId) -> &mut ValidatedSection {
        &mut self.sections[id.0]
    }

    /// Renders `id` (and everything beneath it) as a `to_dict()`-equivalent
    /// JSON value, per spec.md §6.
    pub fn to_json(&self, id: ValidatedSectionId) -> serde_json::Value {
        let section = self.section(id);
        let mut map = serde_json::Map::new();
        for value in section.values() {
            map.insert(value.name.clone(), value.payload.to_json());
        }
        for (name, ids) in section.subsection_groups() {
            let items: Vec<serde_json::Value> = ids.iter().map(|child| self.to_json(*child)).collect();
            map.insert(name.to_string(), serde_json::Value::Array(items));
        }
        serde_json::Value::Object(map)
    }
}
