//! The declarative schema language (spec.md §4.3/§4.4): describes the shape
//! a parsed [`crate::tree::Tree`] must have and rebuilds it into a
//! [`validated::ValidatedTree`] as a side-effect-free transformation.
//!
//! [`containers`] holds the field-level validators (`Value`, `Choice`,
//! `List`, `Array`, `TypedArray`) and the composite [`containers::SectionSchema`];
//! [`types`] holds the scalar type validators those containers delegate to;
//! [`validated`] holds the output tree's entity kinds.

pub mod containers;
pub mod types;
pub mod validated;

pub use containers::{
    Array, Choice, Container, ContainerDefault, Field, List, Repeat, SectionMeta, SectionMetaOverrides,
    SectionSchema, TypedArray, Value, MANY, ONCE,
};
pub use types::{
    Boolean, Encoding, Float, Integer, IpAddressType, IpNetworkType, IpSocketAddressType, IpVersion, NamedRegex,
    Number, PathType, Regex, RegexPattern, StringType, Type, UrlType,
};
pub use validated::{
    IpNetwork, IpSocketAddress, Validated, ValidatedSection, ValidatedSectionId, ValidatedTree, ValidatedValue,
};
