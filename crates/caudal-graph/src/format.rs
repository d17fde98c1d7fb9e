//! Media format descriptors.
//!
//! A [`FormatDescriptor`] names a media category (its *kind*, e.g.
//! `"audio/x-raw"`) plus a set of constraining attributes (sample format,
//! rate, channel count). Descriptors are immutable values: the builder methods
//! return new descriptors and never mutate their receiver, so a descriptor
//! attached to a link or recorded on a port can be shared freely.

use std::collections::BTreeMap;
use std::fmt;

/// Kind tag for uncompressed audio.
pub const RAW_AUDIO: &str = "audio/x-raw";

/// Attribute name for the sample encoding (`"F32LE"`, `"S16LE"`, ...).
pub const ATTR_FORMAT: &str = "format";
/// Attribute name for the sample rate in Hz.
pub const ATTR_RATE: &str = "rate";
/// Attribute name for the interleaved channel count.
pub const ATTR_CHANNELS: &str = "channels";

/// 32-bit float little-endian sample encoding tag.
pub const F32LE: &str = "F32LE";
/// Signed 16-bit little-endian sample encoding tag.
pub const S16LE: &str = "S16LE";

/// A single attribute value on a [`FormatDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrValue {
    /// Integer-valued attribute (rate, channels).
    Int(i64),
    /// String-valued attribute (sample encoding).
    Str(String),
}

impl AttrValue {
    /// Returns the string form if this is a string attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    /// Returns the integer form if this is an integer attribute.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for AttrValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Immutable description of a buffer's media type.
///
/// Used in two roles:
///
/// - **negotiated format** — recorded on a port as buffers flow through it;
/// - **constraint** — attached to a link to restrict what may flow across it.
///
/// Compatibility is asymmetric: the *required* descriptor (the constraint)
/// accepts a *candidate* when the candidate's kind starts with the required
/// kind and every attribute the requirement names matches the candidate
/// exactly. Attributes absent from the requirement are wildcards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    kind: String,
    attributes: BTreeMap<String, AttrValue>,
}

impl FormatDescriptor {
    /// Creates a descriptor with the given kind and no attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Shorthand for an unconstrained `audio/x-raw` descriptor.
    pub fn raw_audio() -> Self {
        Self::new(RAW_AUDIO)
    }

    /// Returns a copy of this descriptor with one attribute added or replaced.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The media category tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Looks up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// The sample encoding tag, if present.
    pub fn sample_format(&self) -> Option<&str> {
        self.get(ATTR_FORMAT).and_then(AttrValue::as_str)
    }

    /// The sample rate in Hz, if present.
    pub fn rate(&self) -> Option<i64> {
        self.get(ATTR_RATE).and_then(AttrValue::as_int)
    }

    /// The channel count, if present.
    pub fn channels(&self) -> Option<i64> {
        self.get(ATTR_CHANNELS).and_then(AttrValue::as_int)
    }

    /// Whether `candidate` satisfies this descriptor used as a requirement.
    ///
    /// True iff `candidate.kind` has this kind as a prefix and every attribute
    /// present here equals the same-named attribute on the candidate. An
    /// attribute the candidate lacks fails the check; an attribute this
    /// requirement lacks is a wildcard.
    pub fn accepts(&self, candidate: &FormatDescriptor) -> bool {
        if !candidate.kind.starts_with(&self.kind) {
            return false;
        }
        self.attributes
            .iter()
            .all(|(name, value)| candidate.attributes.get(name) == Some(value))
    }

    /// Applies this descriptor as a constraint over `base`.
    ///
    /// Returns a new descriptor with `base`'s kind and attributes, overridden
    /// by every attribute present here. Neither input is mutated. This is how
    /// a converter computes its target format from the upstream format and
    /// the downstream link constraint.
    pub fn merged_into(&self, base: &FormatDescriptor) -> FormatDescriptor {
        let mut out = base.clone();
        for (name, value) in &self.attributes {
            out.attributes.insert(name.clone(), value.clone());
        }
        out
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (name, value) in &self.attributes {
            write!(f, ", {name}={value}")?;
        }
        Ok(())
    }
}
