//! Common module for library exports

pub use crate::config::BuildOptions;
pub use crate::database::{install, installed, Database};
pub use crate::error::{ElementKind, MirrorError, MirrorResult};
pub use crate::graph::view::{
    AnnotationInfo, Annotated, CallableInfo, ContainerInfo, ElementInfo, EnumConstantInfo, EnumInfo, FieldInfo,
    NamespaceInfo, Named, ParameterInfo, RecordInfo, Scoped, TypeCategory, TypeInfo, VariableInfo,
};
pub use crate::graph::{AnnotationPayload, RecordLayout};
pub use crate::memory::{MemoryAccess, MemoryBuffer, Scalar};
pub use crate::types::{Address, PrimitiveKind, SymbolName};
