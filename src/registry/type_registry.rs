//! Registry of structured types keyed by node id.
//!
//! Types are registered once during startup. Afterwards the registry is
//! wrapped in an `Arc` and only read, so lookups need no locking.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ua_wire::codec::NodeId;
//! use ua_wire::registry::{Range, TypeRegistry};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Range>().unwrap();
//!
//! let registry = Arc::new(registry);
//! let desc = registry.lookup(&NodeId::numeric(0, 884)).unwrap();
//! assert_eq!(desc.name, "Range");
//! assert!(registry.lookup_by_encoding_id(&NodeId::numeric(0, 886)).is_some());
//! ```

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::descriptor::{StructureType, TypeDescriptor};
use super::schema::{RegistrySchema, TypeSchema};
use super::standard::{BuildInfo, Range};
use crate::codec::NodeId;
use crate::error::CodecError;

/// Catalog of known structured types.
#[derive(Debug)]
pub struct TypeRegistry {
    /// Descriptors by data type id.
    types: HashMap<NodeId, TypeDescriptor>,
    /// Data type id by binary or xml encoding id.
    encodings: HashMap<NodeId, NodeId>,
    /// Namespaces whose types this process can interpret.
    namespaces: BTreeSet<u16>,
}

impl TypeRegistry {
    /// Create an empty registry that knows only namespace 0.
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            encodings: HashMap::new(),
            namespaces: BTreeSet::from([0]),
        }
    }

    /// Create a registry with the built-in namespace-0 structures.
    pub fn with_standard_types() -> Self {
        let mut registry = Self::new();
        let range = registry.register::<Range>();
        debug_assert!(range.is_ok(), "standard types conflict: {:?}", range);
        let build_info = registry.register::<BuildInfo>();
        debug_assert!(build_info.is_ok(), "standard types conflict: {:?}", build_info);
        registry
    }

    /// Register a [`StructureType`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DuplicateType`] if a different schema already
    /// uses the type id or one of its encoding ids.
    pub fn register<T: StructureType>(&mut self) -> Result<(), CodecError> {
        self.register_descriptor(TypeDescriptor::of::<T>())
    }

    /// Register a prepared descriptor.
    ///
    /// Registering an identical schema twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DuplicateType`] on a conflicting schema.
    pub fn register_descriptor(&mut self, descriptor: TypeDescriptor) -> Result<(), CodecError> {
        let type_id = descriptor.type_id.clone();

        if let Some(existing) = self.types.get(&type_id) {
            if existing.same_schema(&descriptor) {
                return Ok(());
            }
            return Err(CodecError::DuplicateType(type_id));
        }

        for encoding_id in Self::encoding_ids(&descriptor) {
            if self.encodings.contains_key(encoding_id) || self.types.contains_key(encoding_id) {
                return Err(CodecError::DuplicateType(encoding_id.clone()));
            }
        }
        if self.encodings.contains_key(&type_id) {
            return Err(CodecError::DuplicateType(type_id));
        }

        for encoding_id in Self::encoding_ids(&descriptor) {
            self.encodings.insert(encoding_id.clone(), type_id.clone());
        }
        self.namespaces.insert(type_id.namespace);

        debug!(
            type_id = %type_id,
            name = descriptor.name,
            binary_encoding_id = %descriptor.binary_encoding_id,
            "registered structure type"
        );
        self.types.insert(type_id, descriptor);
        Ok(())
    }

    fn encoding_ids(descriptor: &TypeDescriptor) -> impl Iterator<Item = &NodeId> {
        [&descriptor.binary_encoding_id, &descriptor.xml_encoding_id]
            .into_iter()
            .filter(|id| !id.is_null())
    }

    /// Mark a namespace as locally interpretable.
    pub fn add_namespace(&mut self, namespace: u16) {
        self.namespaces.insert(namespace);
    }

    /// True if structures from `namespace` can be decoded here.
    pub fn is_known_namespace(&self, namespace: u16) -> bool {
        self.namespaces.contains(&namespace)
    }

    /// Descriptor for a data type id.
    pub fn lookup(&self, type_id: &NodeId) -> Option<&TypeDescriptor> {
        self.types.get(type_id)
    }

    /// Descriptor for a binary or xml encoding id.
    pub fn lookup_by_encoding_id(&self, encoding_id: &NodeId) -> Option<&TypeDescriptor> {
        self.encodings
            .get(encoding_id)
            .and_then(|type_id| self.types.get(type_id))
    }

    /// Descriptor for a data type id, or [`CodecError::UnknownType`].
    pub fn require(&self, type_id: &NodeId) -> Result<&TypeDescriptor, CodecError> {
        self.lookup(type_id)
            .ok_or_else(|| CodecError::UnknownType(type_id.clone()))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Serializable description of every registered type.
    pub fn describe(&self) -> RegistrySchema {
        let mut schema = RegistrySchema::new();
        schema.namespaces = self.namespaces.iter().copied().collect();
        for desc in self.types.values() {
            schema.add_type(TypeSchema::from(desc));
        }
        schema
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader};
    use crate::registry::FieldDescriptor;
    use bytes::BytesMut;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Setpoint {
        value: f64,
    }

    impl StructureType for Setpoint {
        const NAME: &'static str = "Setpoint";
        const TYPE_ID: NodeId = NodeId::numeric(2, 3001);
        const BINARY_ENCODING_ID: NodeId = NodeId::numeric(2, 3002);

        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::new("Value", "Double")]
        }

        fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
            self.value.encode(buf)
        }

        fn decode_fields(&mut self, reader: &mut BinaryReader) -> Result<(), CodecError> {
            self.value = f64::decode(reader)?;
            Ok(())
        }
    }

    #[test]
    fn test_new_registry() {
        let registry = TypeRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.is_known_namespace(0));
        assert!(!registry.is_known_namespace(2));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry.register::<Setpoint>().unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.is_known_namespace(2));
        assert_eq!(
            registry.lookup(&NodeId::numeric(2, 3001)).unwrap().name,
            "Setpoint"
        );
        assert_eq!(
            registry
                .lookup_by_encoding_id(&NodeId::numeric(2, 3002))
                .unwrap()
                .type_id,
            NodeId::numeric(2, 3001)
        );
        assert!(registry.lookup(&NodeId::numeric(2, 3002)).is_none());
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let mut registry = TypeRegistry::new();
        registry.register::<Setpoint>().unwrap();
        registry.register::<Setpoint>().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_schema_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register::<Setpoint>().unwrap();

        let mut other = TypeDescriptor::of::<Setpoint>();
        other.fields.push(FieldDescriptor::new("Unit", "String"));

        assert_eq!(
            registry.register_descriptor(other).unwrap_err(),
            CodecError::DuplicateType(NodeId::numeric(2, 3001))
        );
        assert_eq!(registry.lookup(&Setpoint::TYPE_ID).unwrap().fields.len(), 1);
    }

    #[test]
    fn test_encoding_id_collision_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register::<Setpoint>().unwrap();

        let mut other = TypeDescriptor::of::<Setpoint>();
        other.type_id = NodeId::numeric(2, 4000);

        let err = registry.register_descriptor(other).unwrap_err();
        assert_eq!(err, CodecError::DuplicateType(NodeId::numeric(2, 3002)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_require_unknown() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.require(&NodeId::numeric(0, 1)).unwrap_err(),
            CodecError::UnknownType(NodeId::numeric(0, 1))
        );
    }

    #[test]
    fn test_standard_types() {
        let registry = TypeRegistry::with_standard_types();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(&NodeId::numeric(0, 884)).is_some());
        assert!(registry.lookup(&NodeId::numeric(0, 338)).is_some());
        assert_eq!(
            registry
                .lookup_by_encoding_id(&NodeId::numeric(0, 885))
                .unwrap()
                .name,
            "Range"
        );
    }

    #[test]
    fn test_standard_types_register_cleanly() {
        let mut registry = TypeRegistry::new();
        registry.register::<Range>().unwrap();
        registry.register::<BuildInfo>().unwrap();
        assert_eq!(registry.describe(), TypeRegistry::with_standard_types().describe());
    }

    #[test]
    fn test_add_namespace() {
        let mut registry = TypeRegistry::new();
        registry.add_namespace(5);
        assert!(registry.is_known_namespace(5));
    }
}
