//! Structured type registry.
//!
//! - [`StructureType`] / [`Structure`] - static and object-safe views of a structure
//! - [`TypeDescriptor`] - registration record (schema plus codec functions)
//! - [`TypeRegistry`] - lookup by data type id or encoding id
//! - [`RegistrySchema`] - JSON self-description

mod descriptor;
mod schema;
mod standard;
mod type_registry;

pub use descriptor::{ConstructFn, DecodeFn, FieldDescriptor, Structure, StructureType, TypeDescriptor};
pub use schema::{RegistrySchema, TypeSchema};
pub use standard::{BuildInfo, Range};
pub use type_registry::TypeRegistry;
