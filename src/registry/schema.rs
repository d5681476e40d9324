//! Serializable self-description of a [`TypeRegistry`](super::TypeRegistry).
//!
//! Used for diagnostics: dump the loaded types as JSON to compare what two
//! peers can decode.
//!
//! # Example
//!
//! ```
//! use ua_wire::registry::TypeRegistry;
//!
//! let schema = TypeRegistry::with_standard_types().describe();
//! let json = schema.to_json().unwrap();
//! assert!(json.contains("\"Range\""));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use super::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::codec::NodeId;

/// Schema entry for one registered type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSchema {
    /// Data type id.
    pub type_id: NodeId,
    /// Browse name.
    pub name: &'static str,
    /// Binary encoding id.
    pub binary_encoding_id: NodeId,
    /// XML encoding id, omitted when null.
    #[serde(skip_serializing_if = "NodeId::is_null")]
    pub xml_encoding_id: NodeId,
    /// Ordered fields.
    pub fields: Vec<FieldDescriptor>,
}

impl From<&TypeDescriptor> for TypeSchema {
    fn from(desc: &TypeDescriptor) -> Self {
        Self {
            type_id: desc.type_id.clone(),
            name: desc.name,
            binary_encoding_id: desc.binary_encoding_id.clone(),
            xml_encoding_id: desc.xml_encoding_id.clone(),
            fields: desc.fields.clone(),
        }
    }
}

/// Every registered type, keyed by the display form of its type id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySchema {
    /// Locally interpretable namespaces.
    pub namespaces: Vec<u16>,
    /// Types by `NodeId` display string.
    pub types: BTreeMap<String, TypeSchema>,
}

impl RegistrySchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type entry.
    pub fn add_type(&mut self, schema: TypeSchema) {
        self.types.insert(schema.type_id.to_string(), schema);
    }

    /// Get a type entry by data type id.
    pub fn get_type(&self, type_id: &NodeId) -> Option<&TypeSchema> {
        self.types.get(&type_id.to_string())
    }

    /// Check if schema is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
