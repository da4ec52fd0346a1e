//! Scalar type validators: the leaves schema containers delegate to once a
//! [`crate::tree::Payload`] has been pulled out of its [`crate::tree::Value`]
//! wrapper (spec.md §4.2).
//!
//! Every type implements both `validate` (checking an already-parsed
//! [`Payload`]) and `cast` (parsing a raw string), the second existing for
//! the out-of-scope external CLI-binding interface spec.md names in its
//! non-goals -- the seam is kept even though nothing in this crate calls
//! `cast` yet.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use regex::{Regex as CompiledRegex, RegexBuilder};

use crate::error::ValidationError;
use crate::tree::Payload;

use super::validated::{IpNetwork, IpSocketAddress, Validated};

/// A scalar type a [`super::containers::Container`] can delegate to.
pub trait Type: fmt::Debug {
    /// Validates an already-parsed payload.
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError>;

    /// Parses and validates a raw string, e.g. one that arrived as a
    /// command-line argument rather than through the parser.
    fn cast(&self, raw: &str) -> Result<Validated, ValidationError>;
}

fn expect_string(payload: &Payload) -> Result<&str, ValidationError> {
    match payload {
        Payload::Str(s) => Ok(s.as_str()),
        other => Err(ValidationError::new(format!("{} is not a string", other.describe()))),
    }
}

/// Any numeric value, coerced to a float.
#[derive(Debug, Clone, Copy, Default)]
pub struct Number;

impl Type for Number {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        match payload {
            Payload::Int(n) => Ok(Validated::Int(*n)),
            Payload::Float(n) => Ok(Validated::Float(*n)),
            other => Err(ValidationError::new(format!("{} is not a number", other.describe()))),
        }
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        raw.parse::<f64>()
            .map(Validated::Float)
            .map_err(|_| ValidationError::new(format!("{raw:?} is not a number")))
    }
}

/// An integer, with optional inclusive bounds.
///
/// Mirrors the original's `int(value) == value` acceptance rule: a float
/// with no fractional part (e.g. `4.0`) is a valid `Integer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer {
    /// Inclusive lower bound, if any.
    pub min: Option<i64>,
    /// Inclusive upper bound, if any.
    pub max: Option<i64>,
}

impl Integer {
    /// An unbounded integer.
    pub fn new() -> Self {
        Self::default()
    }

    /// An integer bounded to `min..=max` (either end may be open).
    pub fn bounded(min: Option<i64>, max: Option<i64>) -> Self {
        Integer { min, max }
    }
}

impl Type for Integer {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let numeric = match payload {
            Payload::Int(n) => *n as f64,
            Payload::Float(n) => *n,
            other => return Err(ValidationError::new(format!("{} is not a number", other.describe()))),
        };
        if numeric.fract() != 0.0 {
            return Err(ValidationError::new(format!("{numeric} is not an integer value")));
        }
        let value = numeric as i64;
        if let Some(min) = self.min {
            if value < min {
                return Err(ValidationError::new(format!("{value} is lower than the minimum ({min})")));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ValidationError::new(format!("{value} is greater than the maximum ({max})")));
            }
        }
        Ok(Validated::Int(value))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        let value: i64 = raw
            .parse()
            .map_err(|_| ValidationError::new(format!("{raw:?} is not an integer value")))?;
        self.validate(&Payload::Int(value))
    }
}

/// Any numeric value, coerced to a float -- unlike [`Number`], the validated
/// payload is always [`Validated::Float`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl Type for Float {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        match payload {
            Payload::Int(n) => Ok(Validated::Float(*n as f64)),
            Payload::Float(n) => Ok(Validated::Float(*n)),
            other => Err(ValidationError::new(format!("{} is not a number", other.describe()))),
        }
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        raw.parse::<f64>()
            .map(Validated::Float)
            .map_err(|_| ValidationError::new(format!("{raw:?} is not a number")))
    }
}

/// A strict boolean: only `yes`/`no` literals, never a truthy/falsy coercion
/// of another type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl Type for Boolean {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        match payload {
            Payload::Bool(b) => Ok(Validated::Bool(*b)),
            other => Err(ValidationError::new(format!("{} is not a boolean value", other.describe()))),
        }
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        match raw {
            "yes" | "true" | "1" => Ok(Validated::Bool(true)),
            "no" | "false" | "0" => Ok(Validated::Bool(false)),
            other => Err(ValidationError::new(format!("{other:?} is not a boolean value"))),
        }
    }
}

/// The encodings a [`StringType`] can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Every character must be ASCII.
    Ascii,
    /// Any valid string is accepted (Rust's `String` is always UTF-8).
    Utf8,
}

/// A string, optionally restricted to an encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType {
    /// The encoding to enforce, if any.
    pub encoding: Option<Encoding>,
}

impl StringType {
    /// A string with no encoding restriction.
    pub fn new() -> Self {
        Self::default()
    }

    /// A string restricted to `encoding`.
    pub fn with_encoding(encoding: Encoding) -> Self {
        StringType { encoding: Some(encoding) }
    }
}

impl Type for StringType {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?.to_string();
        if self.encoding == Some(Encoding::Ascii) && !value.is_ascii() {
            return Err(ValidationError::new(format!("{value:?} is not ASCII-encodable")));
        }
        Ok(Validated::Str(value))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// A string that must match a regular expression, returning the matched
/// string itself.
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: CompiledRegex,
    error: String,
}

impl Regex {
    /// Compiles `pattern`, using `error` as the validation-failure message.
    pub fn new(pattern: &str, error: impl Into<String>) -> Result<Self, ValidationError> {
        let pattern = CompiledRegex::new(pattern)
            .map_err(|err| ValidationError::new(format!("bad format for regular expression: {err}")))?;
        Ok(Regex {
            pattern,
            error: error.into(),
        })
    }
}

impl Type for Regex {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        if self.pattern.is_match(value) {
            Ok(Validated::Str(value.to_string()))
        } else {
            Err(ValidationError::new(self.error.clone()))
        }
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// A string that must match a regular expression with named capture groups,
/// returning the group map rather than the matched string.
#[derive(Debug, Clone)]
pub struct NamedRegex {
    pattern: CompiledRegex,
    error: String,
}

impl NamedRegex {
    /// Compiles `pattern`, using `error` as the no-match message.
    pub fn new(pattern: &str, error: impl Into<String>) -> Result<Self, ValidationError> {
        let pattern = CompiledRegex::new(pattern)
            .map_err(|err| ValidationError::new(format!("bad format for regular expression: {err}")))?;
        Ok(NamedRegex {
            pattern,
            error: error.into(),
        })
    }
}

impl Type for NamedRegex {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let captures = self.pattern.captures(value).ok_or_else(|| ValidationError::new(self.error.clone()))?;
        let mut groups = BTreeMap::new();
        for name in self.pattern.capture_names().flatten() {
            groups.insert(name.to_string(), captures.name(name).map(|m| m.as_str().to_string()));
        }
        Ok(Validated::NamedGroups(groups))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// A string that must itself be a valid regular expression, returning the
/// compiled pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexPattern {
    /// Whether the compiled pattern should match case-insensitively.
    pub case_insensitive: bool,
}

impl Type for RegexPattern {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let compiled = RegexBuilder::new(value)
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|_| ValidationError::new("bad format for regular expression"))?;
        Ok(Validated::Regex(compiled))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// The IP version a type may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// IPv4 only.
    V4,
    /// IPv6 only.
    V6,
}

fn version_matches(version: IpVersion, address: IpAddr) -> bool {
    matches!(
        (version, address),
        (IpVersion::V4, IpAddr::V4(_)) | (IpVersion::V6, IpAddr::V6(_))
    )
}

/// An IP address, optionally restricted to a version.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpAddressType {
    /// The version to restrict to, if any.
    pub version: Option<IpVersion>,
}

impl Type for IpAddressType {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let address: IpAddr = value
            .parse()
            .map_err(|_| ValidationError::new(format!("{value:?} does not appear to be an IP address")))?;
        if let Some(version) = self.version {
            if !version_matches(version, address) {
                return Err(ValidationError::new(format!(
                    "{value:?} is not an IPv{} address",
                    if version == IpVersion::V4 { 4 } else { 6 }
                )));
            }
        }
        Ok(Validated::IpAddress(address))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// A CIDR network (`<address>/<prefix-len>`), optionally restricted to a
/// version.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpNetworkType {
    /// The version to restrict to, if any.
    pub version: Option<IpVersion>,
}

impl Type for IpNetworkType {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let network = IpNetwork::parse(value).map_err(ValidationError::new)?;
        if let Some(version) = self.version {
            if !version_matches(version, network.address) {
                return Err(ValidationError::new(format!(
                    "{value:?} is not an IPv{} network",
                    if version == IpVersion::V4 { 4 } else { 6 }
                )));
            }
        }
        Ok(Validated::IpNetwork(network))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// A URL, parsed with the `url` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlType;

impl Type for UrlType {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let url = url::Url::parse(value).map_err(|err| ValidationError::new(format!("{value:?} is not a valid URL ({err})")))?;
        Ok(Validated::Url(url))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// An `<address>:<port>` socket address, each half independently optional
/// when a default is configured, optionally restricted to an IP version.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpSocketAddressType {
    /// The address to use when the `<address>` half is omitted.
    pub default_address: Option<IpAddr>,
    /// The port to use when the `<port>` half is omitted.
    pub default_port: Option<u16>,
    /// The version to restrict to, if any.
    pub version: Option<IpVersion>,
}

impl Type for IpSocketAddressType {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let (address_part, port_part) = value.split_once(':').unwrap_or((value, ""));
        let address = if address_part.is_empty() {
            self.default_address
                .ok_or_else(|| ValidationError::new("you must specify an address"))?
        } else {
            address_part
                .parse()
                .map_err(|_| ValidationError::new(format!("{address_part:?} does not appear to be an IP address")))?
        };
        let port = if port_part.is_empty() {
            self.default_port.ok_or_else(|| ValidationError::new("you must specify a port"))?
        } else {
            let port: u32 = port_part
                .parse()
                .map_err(|_| ValidationError::new(format!("{port_part:?} is not a port")))?;
            if port == 0 || port > 65535 {
                return Err(ValidationError::new(format!("{port} is not a port (not in 1 - 65535 range)")));
            }
            port as u16
        };
        if let Some(version) = self.version {
            if !version_matches(version, address) {
                return Err(ValidationError::new(format!(
                    "{value:?} is not an IPv{} socket address",
                    if version == IpVersion::V4 { 4 } else { 6 }
                )));
            }
        }
        Ok(Validated::SocketAddress(IpSocketAddress { address, port }))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

/// A filesystem path: `~` is expanded and the result is made absolute
/// relative to the current working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathType;

impl Type for PathType {
    fn validate(&self, payload: &Payload) -> Result<Validated, ValidationError> {
        let value = expect_string(payload)?;
        let expanded = expand_tilde(value);
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir().map(|cwd| cwd.join(&expanded)).unwrap_or(expanded)
        };
        Ok(Validated::Path(absolute))
    }

    fn cast(&self, raw: &str) -> Result<Validated, ValidationError> {
        self.validate(&Payload::Str(raw.to_string()))
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    } else if value == "~" {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(value)
}
