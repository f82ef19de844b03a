//! Primitive type kinds and spelling normalization.
//!
//! Compilers disagree on how they spell the same primitive: GCC writes
//! `long unsigned int` where Clang writes `unsigned long`, and source code may
//! use any order of the modifiers. [`PrimitiveKind::parse`] folds every
//! spelling of a type onto one kind so lookups by name do not depend on the
//! compiler that produced the binary.
//!
//! `char`, `signed char` and `unsigned char` are three distinct kinds.

use std::fmt;

/// Closed set of primitive kinds the database distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind
{
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    WideChar,
    Char8,
    Char16,
    Char32,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Int128,
    UnsignedInt128,
    Float,
    Double,
    LongDouble,
    ComplexFloat,
    ComplexDouble,
    ComplexLongDouble,
    /// A base type whose spelling is not one of the above (`_Float16`, `u8`, ...).
    Other,
}

#[derive(Default)]
struct Spelling
{
    words: usize,
    signed: bool,
    unsigned: bool,
    char: bool,
    short: bool,
    int: bool,
    longs: u8,
    int128: bool,
    float: bool,
    double: bool,
    boolean: bool,
    complex: bool,
    void: bool,
    special: Option<PrimitiveKind>,
}

impl Spelling
{
    fn has_integer_modifiers(&self) -> bool
    {
        self.signed || self.unsigned || self.char || self.short || self.int || self.int128
    }
}

impl PrimitiveKind
{
    /// Classify a source-level spelling, ignoring modifier order.
    ///
    /// Returns `None` when the spelling is not a recognised primitive.
    ///
    /// ```rust
    /// use mirror_core::types::PrimitiveKind;
    ///
    /// assert_eq!(PrimitiveKind::parse("unsigned long int"), Some(PrimitiveKind::UnsignedLong));
    /// assert_eq!(PrimitiveKind::parse("long int unsigned"), Some(PrimitiveKind::UnsignedLong));
    /// assert_ne!(PrimitiveKind::parse("char"), PrimitiveKind::parse("signed char"));
    /// ```
    pub fn parse(spelling: &str) -> Option<Self>
    {
        let mut s = Spelling::default();
        for word in spelling.split_whitespace() {
            s.words += 1;
            match word {
                "signed" | "__signed__" => s.signed = true,
                "unsigned" => s.unsigned = true,
                "char" => s.char = true,
                "short" => s.short = true,
                "int" => s.int = true,
                "long" => s.longs += 1,
                "__int128" => s.int128 = true,
                "float" => s.float = true,
                "double" => s.double = true,
                "bool" | "_Bool" => s.boolean = true,
                "complex" | "_Complex" => s.complex = true,
                "void" => s.void = true,
                "wchar_t" => s.special = Some(PrimitiveKind::WideChar),
                "char8_t" => s.special = Some(PrimitiveKind::Char8),
                "char16_t" => s.special = Some(PrimitiveKind::Char16),
                "char32_t" => s.special = Some(PrimitiveKind::Char32),
                _ => return None,
            }
        }

        if s.words == 0 || (s.signed && s.unsigned) {
            return None;
        }
        if let Some(kind) = s.special {
            return (s.words == 1).then_some(kind);
        }
        if s.void || s.boolean {
            let kind = if s.void { PrimitiveKind::Void } else { PrimitiveKind::Bool };
            return (s.words == 1).then_some(kind);
        }
        if s.float || s.double {
            if s.has_integer_modifiers() || (s.float && s.double) {
                return None;
            }
            return match (s.float, s.longs, s.complex) {
                (true, 0, false) => Some(PrimitiveKind::Float),
                (true, 0, true) => Some(PrimitiveKind::ComplexFloat),
                (false, 0, false) => Some(PrimitiveKind::Double),
                (false, 0, true) => Some(PrimitiveKind::ComplexDouble),
                (false, 1, false) => Some(PrimitiveKind::LongDouble),
                (false, 1, true) => Some(PrimitiveKind::ComplexLongDouble),
                _ => None,
            };
        }
        if s.complex {
            return None;
        }
        if s.char {
            if s.short || s.int || s.longs > 0 || s.int128 {
                return None;
            }
            return Some(if s.signed {
                PrimitiveKind::SignedChar
            } else if s.unsigned {
                PrimitiveKind::UnsignedChar
            } else {
                PrimitiveKind::Char
            });
        }
        if s.int128 {
            if s.short || s.int || s.longs > 0 {
                return None;
            }
            return Some(if s.unsigned { PrimitiveKind::UnsignedInt128 } else { PrimitiveKind::Int128 });
        }
        if s.short {
            if s.longs > 0 {
                return None;
            }
            return Some(if s.unsigned { PrimitiveKind::UnsignedShort } else { PrimitiveKind::Short });
        }

        match (s.longs, s.unsigned) {
            (0, false) => Some(PrimitiveKind::Int),
            (0, true) => Some(PrimitiveKind::UnsignedInt),
            (1, false) => Some(PrimitiveKind::Long),
            (1, true) => Some(PrimitiveKind::UnsignedLong),
            (2, false) => Some(PrimitiveKind::LongLong),
            (2, true) => Some(PrimitiveKind::UnsignedLongLong),
            _ => None,
        }
    }

    /// Canonical spelling, as GCC emits it.
    pub fn canonical_name(self) -> &'static str
    {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::SignedChar => "signed char",
            PrimitiveKind::UnsignedChar => "unsigned char",
            PrimitiveKind::WideChar => "wchar_t",
            PrimitiveKind::Char8 => "char8_t",
            PrimitiveKind::Char16 => "char16_t",
            PrimitiveKind::Char32 => "char32_t",
            PrimitiveKind::Short => "short int",
            PrimitiveKind::UnsignedShort => "short unsigned int",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UnsignedInt => "unsigned int",
            PrimitiveKind::Long => "long int",
            PrimitiveKind::UnsignedLong => "long unsigned int",
            PrimitiveKind::LongLong => "long long int",
            PrimitiveKind::UnsignedLongLong => "long long unsigned int",
            PrimitiveKind::Int128 => "__int128",
            PrimitiveKind::UnsignedInt128 => "__int128 unsigned",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::LongDouble => "long double",
            PrimitiveKind::ComplexFloat => "complex float",
            PrimitiveKind::ComplexDouble => "complex double",
            PrimitiveKind::ComplexLongDouble => "complex long double",
            PrimitiveKind::Other => "<other>",
        }
    }
}

impl fmt::Display for PrimitiveKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.canonical_name())
    }
}
