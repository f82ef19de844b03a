//! # Error Types
//!
//! Error handling for database construction and reflective lookups.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Build-time problems with individual debug entries are *not* errors: an
//! entry with a missing or malformed attribute is skipped and traced, and the
//! walk continues. The variants below cover the failures a consumer can see.

use std::fmt;

use thiserror::Error;

use crate::types::Address;

/// Kind of element a by-name lookup was searching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind
{
    Type,
    Namespace,
    Field,
    Method,
    Function,
    Variable,
    EnumValue,
    Annotation,
    /// A type-of marker, looked up by its address.
    Marker,
}

impl fmt::Display for ElementKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            ElementKind::Type => "type",
            ElementKind::Namespace => "namespace",
            ElementKind::Field => "field",
            ElementKind::Method => "method",
            ElementKind::Function => "function",
            ElementKind::Variable => "variable",
            ElementKind::EnumValue => "enum value",
            ElementKind::Annotation => "annotation",
            ElementKind::Marker => "type-of marker",
        };
        write!(f, "{label}")
    }
}

/// Main error type for reflection operations
///
/// ## Error Categories
///
/// 1. **Lookup errors**: NotFound (the caller should treat it as "feature absent")
/// 2. **Contract errors**: Detached, KindMismatch
/// 3. **Access errors**: SizeMismatch, AddressUnmapped
/// 4. **Loading errors**: Dwarf, Object, Io
#[derive(Error, Debug)]
pub enum MirrorError
{
    /// A by-name lookup found nothing
    #[error("{kind} not found: {name}")]
    NotFound
    {
        /// What was being looked up
        kind: ElementKind,
        /// The name (or rendered address) that was requested
        name: String,
    },

    /// The node has no owner
    ///
    /// Every attached node has a parent. Asking a node that was only ever
    /// built as a forward reference for its parent indicates an ordering bug
    /// in the caller.
    #[error("{0} is not attached to a container")]
    Detached(String),

    /// A handle was asked to behave as a kind it is not
    #[error("{name} is not {expected}")]
    KindMismatch
    {
        /// Name of the offending type
        name: String,
        /// The kind the caller asked for ("a record", "an enum", ...)
        expected: &'static str,
    },

    /// A buffer did not match the size the graph declares
    ///
    /// Raised by reflective field access, enum constant decoding and
    /// annotation payload decoding.
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch
    {
        expected: usize,
        actual: usize,
    },

    /// No loaded section backs the requested address range
    #[error("Address {0} is not mapped by any loaded section")]
    AddressUnmapped(Address),

    /// Invalid argument passed to a database function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The DWARF reader reported an error
    #[error("DWARF error: {0}")]
    Dwarf(String),

    /// The object file could not be parsed
    #[error("Object file error: {0}")]
    Object(String),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError
{
    pub(crate) fn not_found(kind: ElementKind, name: impl Into<String>) -> Self
    {
        MirrorError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Returns `true` for the "feature absent" condition.
    pub fn is_not_found(&self) -> bool
    {
        matches!(self, MirrorError::NotFound { .. })
    }
}

/// Convenience type alias for `Result<T, MirrorError>`
///
/// ```rust
/// use mirror_core::error::MirrorResult;
/// fn foo() -> MirrorResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type MirrorResult<T> = std::result::Result<T, MirrorError>;
