//! # Types
//!
//! Small value types shared by the graph, the builder and the access layer.

pub mod address;
pub mod primitive;
pub mod symbols;

pub use address::Address;
pub use primitive::PrimitiveKind;
pub use symbols::{SymbolLanguage, SymbolName};
