//! Declarative validation containers (spec.md §4.3): [`Value`], [`Choice`],
//! [`List`], [`Array`], [`TypedArray`] implement [`Container`] and validate a
//! single field; [`SectionSchema`] is the composite that walks a whole
//! [`crate::tree::Section`] and rebuilds it into a
//! [`super::validated::ValidatedSection`].

use std::fmt;

use crate::error::ValidationError;
use crate::tree::{ExpandedChild, Payload, Section, SectionId, Tree, Value as RawValue};

use super::types::Type;
use super::validated::{Validated, ValidatedSection, ValidatedSectionId, ValidatedTree, ValidatedValue};

/// A field's default, standing in for the original's `required = object()`
/// sentinel: `Required` means validation fails when the field is absent,
/// `Value` carries the already-typed default to use instead.
#[derive(Debug, Clone, Default)]
pub enum ContainerDefault {
    /// No default: the field must be present.
    #[default]
    Required,
    /// Used verbatim (with [`crate::tree::Position::sentinel`]) when the
    /// field is absent.
    Value(Validated),
}

/// Something that can validate a single field's raw [`RawValue`] (or its
/// absence) into a [`ValidatedValue`].
pub trait Container: fmt::Debug {
    /// Validates `input`, or applies this container's default if `input` is
    /// `None`.
    fn validate(&self, input: Option<&RawValue>) -> Result<ValidatedValue, ValidationError>;
}

fn apply_default(default: &ContainerDefault) -> Result<ValidatedValue, ValidationError> {
    match default {
        ContainerDefault::Required => Err(ValidationError::new("this value is required")),
        ContainerDefault::Value(value) => Ok(ValidatedValue::new(
            String::new(),
            value.clone(),
            crate::tree::Position::sentinel(),
        )),
    }
}

/// A single scalar value, delegating to a [`Type`].
#[derive(Debug)]
pub struct Value<T> {
    value_type: T,
    default: ContainerDefault,
}

impl<T: Type> Value<T> {
    /// A required value of type `T`.
    pub fn new(value_type: T) -> Self {
        Value {
            value_type,
            default: ContainerDefault::Required,
        }
    }

    /// A value of type `T` that defaults to `default` when absent.
    pub fn with_default(value_type: T, default: Validated) -> Self {
        Value {
            value_type,
            default: ContainerDefault::Value(default),
        }
    }
}

impl<T: Type> Container for Value<T> {
    fn validate(&self, input: Option<&RawValue>) -> Result<ValidatedValue, ValidationError> {
        let input = match input {
            Some(input) => input,
            None => return apply_default(&self.default),
        };
        let scalar = input.unwrap_singleton_list();
        if scalar.is_list() {
            return Err(ValidationError::at(format!("{} is a list", scalar.describe()), input.position.clone()));
        }
        let validated = self
            .value_type
            .validate(scalar)
            .map_err(|err| ValidationError::at(err.message, input.position.clone()))?;
        Ok(ValidatedValue::new(input.name.clone(), validated, input.position.clone()))
    }
}

/// A value that must be one of a fixed set of raw payloads, each mapped to
/// a validated replacement value.
#[derive(Debug)]
pub struct Choice {
    choices: Vec<(Payload, Validated)>,
    default: ContainerDefault,
}

impl Choice {
    /// A required choice among `choices`.
    pub fn new(choices: Vec<(Payload, Validated)>) -> Self {
        Choice {
            choices,
            default: ContainerDefault::Required,
        }
    }

    /// A choice among `choices` that defaults to `default` when absent.
    pub fn with_default(choices: Vec<(Payload, Validated)>, default: Validated) -> Self {
        Choice {
            choices,
            default: ContainerDefault::Value(default),
        }
    }
}

impl Container for Choice {
    fn validate(&self, input: Option<&RawValue>) -> Result<ValidatedValue, ValidationError> {
        let input = match input {
            Some(input) => input,
            None => return apply_default(&self.default),
        };
        let scalar = input.unwrap_singleton_list();
        if scalar.is_list() {
            return Err(ValidationError::at(format!("{} is a list", scalar.describe()), input.position.clone()));
        }
        match self.choices.iter().find(|(key, _)| key == scalar) {
            Some((_, mapped)) => Ok(ValidatedValue::new(input.name.clone(), mapped.clone(), input.position.clone())),
            None => {
                let allowed: Vec<String> = self.choices.iter().map(|(key, _)| key.describe()).collect();
                Err(ValidationError::at(
                    format!("bad choice (must be one of {})", allowed.join(", ")),
                    input.position.clone(),
                ))
            }
        }
    }
}

/// A comma-separated list whose every element is validated by the same
/// [`Type`]. A bare scalar is accepted as a one-element list.
#[derive(Debug)]
pub struct List<T> {
    item_type: T,
    default: ContainerDefault,
}

impl<T: Type> List<T> {
    /// A required list of `item_type`.
    pub fn new(item_type: T) -> Self {
        List {
            item_type,
            default: ContainerDefault::Required,
        }
    }

    /// A list of `item_type` that defaults to `default` when absent.
    pub fn with_default(item_type: T, default: Validated) -> Self {
        List {
            item_type,
            default: ContainerDefault::Value(default),
        }
    }

    fn validate_items(&self, input: &RawValue) -> Result<Vec<Validated>, ValidationError> {
        let items: Vec<&Payload> = match &input.payload {
            Payload::List(items) => items.iter().collect(),
            scalar => vec![scalar],
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                self.item_type
                    .validate(item)
                    .map_err(|err| ValidationError::at(format!("item #{index}, {}", err.message), input.position.clone()))
            })
            .collect()
    }
}

impl<T: Type> Container for List<T> {
    fn validate(&self, input: Option<&RawValue>) -> Result<ValidatedValue, ValidationError> {
        let input = match input {
            Some(input) => input,
            None => return apply_default(&self.default),
        };
        let items = self.validate_items(input)?;
        Ok(ValidatedValue::new(input.name.clone(), Validated::List(items), input.position.clone()))
    }
}

/// A [`List`] constrained to an exact length.
#[derive(Debug)]
pub struct Array<T> {
    size: usize,
    list: List<T>,
}

impl<T: Type> Array<T> {
    /// A required array of exactly `size` elements of `item_type`.
    pub fn new(item_type: T, size: usize) -> Self {
        Array {
            size,
            list: List::new(item_type),
        }
    }
}

impl<T: Type> Container for Array<T> {
    fn validate(&self, input: Option<&RawValue>) -> Result<ValidatedValue, ValidationError> {
        let validated = self.list.validate(input)?;
        if let Validated::List(items) = &validated.payload {
            if items.len() != self.size {
                return Err(ValidationError::at(
                    format!("bad array size (should be {}, found {} items)", self.size, items.len()),
                    validated.position.clone(),
                ));
            }
        }
        Ok(validated)
    }
}

/// A fixed-length list whose elements each have their own, independent
/// [`Type`] (position `i` is validated by `item_types[i]`).
#[derive(Debug)]
pub struct TypedArray {
    item_types: Vec<Box<dyn Type>>,
    default: ContainerDefault,
}

impl TypedArray {
    /// A required typed array, one type per position.
    pub fn new(item_types: Vec<Box<dyn Type>>) -> Self {
        TypedArray {
            item_types,
            default: ContainerDefault::Required,
        }
    }

    /// A typed array that defaults to `default` when absent.
    pub fn with_default(item_types: Vec<Box<dyn Type>>, default: Validated) -> Self {
        TypedArray {
            item_types,
            default: ContainerDefault::Value(default),
        }
    }
}

impl Container for TypedArray {
    fn validate(&self, input: Option<&RawValue>) -> Result<ValidatedValue, ValidationError> {
        let input = match input {
            Some(input) => input,
            None => return apply_default(&self.default),
        };
        let items: Vec<&Payload> = match &input.payload {
            Payload::List(items) => items.iter().collect(),
            scalar => vec![scalar],
        };
        if items.len() != self.item_types.len() {
            return Err(ValidationError::at(
                format!("bad array size (should be {}, found {} items)", self.item_types.len(), items.len()),
                input.position.clone(),
            ));
        }
        let validated: Vec<Validated> = items
            .into_iter()
            .zip(self.item_types.iter())
            .enumerate()
            .map(|(index, (item, item_type))| {
                item_type
                    .validate(item)
                    .map_err(|err| ValidationError::at(format!("item #{index}, {}", err.message), input.position.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(ValidatedValue::new(input.name.clone(), Validated::List(validated), input.position.clone()))
    }
}

/// `(min, max)` repeat count; `max = None` means unbounded.
pub type Repeat = (u32, Option<u32>);

/// A section may be defined exactly once (the default).
pub const ONCE: Repeat = (1, Some(1));
/// A section may be defined any number of times, but at least once.
pub const MANY: Repeat = (1, None);

/// Per-section validation policy, mirroring the original's `_meta` class
/// dict (`args`, `unique`, `repeat`, `allow_unknown`).
pub struct SectionMeta {
    /// The container validating this section's positional arguments, if it
    /// takes any.
    pub args: Option<Box<dyn Container>>,
    /// Whether sibling occurrences of this section must have distinct
    /// (validated) arguments.
    pub unique: bool,
    /// How many times this section may occur among its siblings.
    pub repeat: Repeat,
    /// Whether undeclared keys inside this section are passed through
    /// rather than rejected.
    pub allow_unknown: bool,
}

impl fmt::Debug for SectionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionMeta")
            .field("args", &self.args.is_some())
            .field("unique", &self.unique)
            .field("repeat", &self.repeat)
            .field("allow_unknown", &self.allow_unknown)
            .finish()
    }
}

impl Default for SectionMeta {
    fn default() -> Self {
        SectionMeta {
            args: None,
            unique: false,
            repeat: ONCE,
            allow_unknown: false,
        }
    }
}

/// Overrides applied on top of a parent [`SectionSchema`]'s meta by
/// [`SectionSchema::derive`]. Every field is `None` by default, meaning "keep
/// the parent's value".
#[derive(Default)]
pub struct SectionMetaOverrides {
    /// Overrides `args` when `Some`. The outer `Option` distinguishes "not
    /// overridden" from "explicitly overridden to no-arguments"
    /// (`Some(None)`).
    pub args: Option<Option<Box<dyn Container>>>,
    /// Overrides `unique` when `Some`.
    pub unique: Option<bool>,
    /// Overrides `repeat` when `Some`.
    pub repeat: Option<Repeat>,
    /// Overrides `allow_unknown` when `Some`.
    pub allow_unknown: Option<bool>,
}

impl SectionMetaOverrides {
    fn apply(self, base: SectionMeta) -> SectionMeta {
        SectionMeta {
            args: self.args.unwrap_or(base.args),
            unique: self.unique.unwrap_or(base.unique),
            repeat: self.repeat.unwrap_or(base.repeat),
            allow_unknown: self.allow_unknown.unwrap_or(base.allow_unknown),
        }
    }
}

/// One declared field of a [`SectionSchema`]: either a scalar [`Container`]
/// or a nested subsection schema.
#[derive(Debug)]
pub enum Field {
    /// A `name = value`-style field.
    Value(Box<dyn Container>),
    /// A nested `name { ... }`-style subsection field.
    Section(SectionSchema),
}

/// The schema for a whole section: its own [`SectionMeta`] plus the fields it
/// declares. Validates a whole [`crate::tree::Section`] subtree at once,
/// which is why it is not itself a [`Container`] (spec.md §4.3: "`Section`
/// does not implement `Container`; it is the composite root that a whole
/// tree is validated against").
#[derive(Debug)]
pub struct SectionSchema {
    meta: SectionMeta,
    fields: Vec<(String, Field)>,
}

impl SectionSchema {
    /// Builds a new schema directly from its meta and fields.
    pub fn new(meta: SectionMeta, fields: Vec<(String, Field)>) -> Self {
        SectionSchema { meta, fields }
    }

    /// Builds a schema that extends `parent`: `extra_fields` are appended,
    /// except that a name already declared by `parent` is overwritten in
    /// place (a child field "shadows" the parent's, the way overriding an
    /// attribute in a Python subclass does), and `overrides` is folded into
    /// `parent`'s meta. This stands in for the original's class-hierarchy
    /// (MRO) field-and-meta merge, since Rust has no open class hierarchy to
    /// walk.
    pub fn derive(parent: SectionSchema, extra_fields: Vec<(String, Field)>, overrides: SectionMetaOverrides) -> SectionSchema {
        let mut fields = parent.fields;
        for (name, field) in extra_fields {
            if let Some(existing) = fields.iter_mut().find(|(n, _)| *n == name) {
                existing.1 = field;
            } else {
                fields.push((name, field));
            }
        }
        SectionSchema {
            meta: overrides.apply(parent.meta),
            fields,
        }
    }

    /// Validates the section behind `id` in `tree`, allocating its (and its
    /// declared/unknown children's) counterpart(s) in `out`, parented under
    /// `parent`. Returns the id of the freshly allocated
    /// [`ValidatedSection`].
    pub fn validate(
        &self,
        tree: &Tree,
        id: SectionId,
        parent: Option<ValidatedSectionId>,
        out: &mut ValidatedTree,
    ) -> Result<ValidatedSectionId, ValidationError> {
        let section = tree.section(id);
        log::trace!("validating section {:?} at {}", section.name, section.position);

        let mut validated_args = match (&self.meta.args, &section.args) {
            (None, Some(_)) => {
                return Err(ValidationError::at(
                    format!("section {}, this section does not take any argument", section.name),
                    section.position.clone(),
                ));
            }
            (None, None) => None,
            (Some(container), args) => {
                let validated = container
                    .validate(args.as_ref())
                    .map_err(|err| err.wrap(|inner| format!("section {}, arguments, {inner}", section.name)))?;
                Some(validated)
            }
        };
        if let Some(args) = validated_args.as_mut() {
            args.name = "<args>".to_string();
        }

        let out_id = out.alloc(ValidatedSection::new(
            section.name.clone(),
            parent,
            section.position.clone(),
            validated_args,
        ));

        for (name, field) in &self.fields {
            match field {
                Field::Section(schema) => {
                    self.validate_subsection_group(tree, section, name, schema, out_id, out)?;
                }
                Field::Value(container) => {
                    let raw = section.get(name);
                    let mut validated = container
                        .validate(raw)
                        .map_err(|err| err.wrap(|inner| format!("section {}, key {name}, {inner}", section.name)))?;
                    validated.name = name.clone();
                    out.section_mut(out_id).register_value(validated);
                }
            }
        }

        for child in section.expanded_children() {
            let name = child.name();
            if self.fields.iter().any(|(declared, _)| declared == name) {
                continue;
            }
            if !self.meta.allow_unknown {
                let position = match child {
                    ExpandedChild::Value(value) => value.position.clone(),
                    ExpandedChild::Subsection(_, child_id) => tree.section(child_id).position.clone(),
                };
                return Err(ValidationError::at(
                    format!("section {}, unknown key {name}", section.name),
                    position,
                ));
            }
            match child {
                ExpandedChild::Value(value) => {
                    out.section_mut(out_id).register_value(ValidatedValue::new(
                        value.name.clone(),
                        Validated::Raw(value.payload.clone()),
                        value.position.clone(),
                    ));
                }
                ExpandedChild::Subsection(name, child_id) => {
                    let grafted = graft_raw_subsection(tree, child_id, Some(out_id), out);
                    out.section_mut(out_id).register_subsection(name.to_string(), grafted);
                }
            }
        }

        Ok(out_id)
    }

    fn validate_subsection_group(
        &self,
        tree: &Tree,
        section: &Section,
        name: &str,
        schema: &SectionSchema,
        out_id: ValidatedSectionId,
        out: &mut ValidatedTree,
    ) -> Result<(), ValidationError> {
        let occurrences = section.subsections(name);
        let (rmin, rmax) = schema.meta.repeat;
        if let Some(rmax) = rmax {
            if rmin > rmax {
                return Err(ValidationError::new(format!("section {name}, rmin > rmax in its own schema")));
            }
            if occurrences.len() as u32 > rmax {
                return Err(ValidationError::new(format!("section {name} must be defined at most {rmax} time(s)")));
            }
        }
        if (occurrences.len() as u32) < rmin {
            return Err(ValidationError::new(format!("section {name} must be defined at least {rmin} time(s)")));
        }

        let mut seen_args: Vec<Option<Payload>> = Vec::new();
        for &child_id in occurrences {
            if schema.meta.unique {
                let child = tree.section(child_id);
                let key = child.args.as_ref().map(|args| args.payload.clone());
                if seen_args.contains(&key) {
                    return Err(ValidationError::at(
                        format!("section {name}, this section's arguments must be unique among its siblings"),
                        child.position.clone(),
                    ));
                }
                seen_args.push(key);
            }
            let validated_child_id = schema.validate(tree, child_id, Some(out_id), out)?;
            out.section_mut(out_id).register_subsection(name.to_string(), validated_child_id);
        }
        Ok(())
    }
}

/// Deep-copies a subtree that fell through an `allow_unknown` section
/// unchanged, converting every [`Payload`] to [`Validated::Raw`] along the
/// way. Mirrors [`crate::parser::graft_section`]'s shape, one tree kind over.
fn graft_raw_subsection(
    tree: &Tree,
    id: SectionId,
    parent: Option<ValidatedSectionId>,
    out: &mut ValidatedTree,
) -> ValidatedSectionId {
    let section = tree.section(id);
    let args = section.args.as_ref().map(|raw| {
        ValidatedValue::new(raw.name.clone(), Validated::Raw(raw.payload.clone()), raw.position.clone())
    });
    let out_id = out.alloc(ValidatedSection::new(section.name.clone(), parent, section.position.clone(), args));
    for value in section.values() {
        out.section_mut(out_id).register_value(ValidatedValue::new(
            value.name.clone(),
            Validated::Raw(value.payload.clone()),
            value.position.clone(),
        ));
    }
    for (name, ids) in section.subsection_groups() {
        for &child_id in ids {
            let grafted = graft_raw_subsection(tree, child_id, Some(out_id), out);
            out.section_mut(out_id).register_subsection(name.to_string(), grafted);
        }
    }
    out_id
}
