//! # Build Configuration
//!
//! Options that control how debug entries are interpreted while the
//! database is built.
//!
//! ## Environment Variables
//!
//! - `MIRROR_ANNOTATION_PREFIX`: name prefix marking annotation declarations
//!   (default: `mirror_annotation`)
//! - `MIRROR_TYPEOF_MARKER`: exact name of type-of marker variables
//!   (default: `mirror_typeof_marker`)
//! - `MIRROR_LOAD_BIAS`: value added to every recorded address, hex (`0x...`)
//!   or decimal (default: `0`)

use std::env;

use crate::error::{MirrorError, MirrorResult};

/// Default reserved prefix of annotation declarations.
pub const DEFAULT_ANNOTATION_PREFIX: &str = "mirror_annotation";

/// Default name of type-of marker variables.
pub const DEFAULT_TYPEOF_MARKER: &str = "mirror_typeof_marker";

/// Spelling of the null pointer type, which debug formats emit without a size.
pub const DEFAULT_NULL_POINTER_SPELLING: &str = "decltype(nullptr)";

/// Options for [`Database::build`](crate::Database::build).
///
/// ## Example
///
/// ```rust
/// use mirror_core::BuildOptions;
///
/// let options = BuildOptions::default().with_annotation_prefix("meta_").with_load_bias(0x5555_0000);
/// assert_eq!(options.annotation_prefix, "meta_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions
{
    /// Declarations whose name starts with this prefix are annotations.
    pub annotation_prefix: String,
    /// Variables with exactly this name are type-of markers.
    pub typeof_marker: String,
    /// Unspecified type whose size is forced to the pointer size.
    pub null_pointer_spelling: String,
    /// Added to every address recorded in the graph.
    pub load_bias: u64,
}

impl Default for BuildOptions
{
    fn default() -> Self
    {
        Self {
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            typeof_marker: DEFAULT_TYPEOF_MARKER.to_string(),
            null_pointer_spelling: DEFAULT_NULL_POINTER_SPELLING.to_string(),
            load_bias: 0,
        }
    }
}

impl BuildOptions
{
    /// Read options from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidArgument` if `MIRROR_LOAD_BIAS` is not a number.
    pub fn from_env() -> MirrorResult<Self>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read options through an arbitrary lookup function.
    ///
    /// Unset variables keep their defaults.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidArgument` if `MIRROR_LOAD_BIAS` is not a number.
    pub fn from_lookup<F>(lookup: F) -> MirrorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(prefix) = lookup("MIRROR_ANNOTATION_PREFIX").filter(|value| !value.is_empty()) {
            options.annotation_prefix = prefix;
        }
        if let Some(marker) = lookup("MIRROR_TYPEOF_MARKER").filter(|value| !value.is_empty()) {
            options.typeof_marker = marker;
        }
        if let Some(bias) = lookup("MIRROR_LOAD_BIAS") {
            options.load_bias = parse_number(&bias)?;
        }
        Ok(options)
    }

    pub fn with_annotation_prefix(mut self, prefix: impl Into<String>) -> Self
    {
        self.annotation_prefix = prefix.into();
        self
    }

    pub fn with_typeof_marker(mut self, marker: impl Into<String>) -> Self
    {
        self.typeof_marker = marker.into();
        self
    }

    pub fn with_null_pointer_spelling(mut self, spelling: impl Into<String>) -> Self
    {
        self.null_pointer_spelling = spelling.into();
        self
    }

    pub fn with_load_bias(mut self, bias: u64) -> Self
    {
        self.load_bias = bias;
        self
    }

    pub(crate) fn is_annotation(&self, name: &str) -> bool
    {
        !self.annotation_prefix.is_empty() && name.starts_with(&self.annotation_prefix)
    }

    pub(crate) fn is_typeof_marker(&self, name: &str) -> bool
    {
        name == self.typeof_marker
    }
}

/// Parse a hex (`0x`-prefixed) or decimal number.
pub(crate) fn parse_number(text: &str) -> MirrorResult<u64>
{
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|err| MirrorError::InvalidArgument(format!("invalid number {trimmed:?}: {err}")))
}
