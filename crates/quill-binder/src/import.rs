//! Materialization of externally resolved type descriptions.
//!
//! Module and import resolution happen outside the engine; what arrives
//! here is a mapping from type name to [`TypeDescriptor`]. Materializing a
//! descriptor allocates a scope in the arena and copies the declared
//! members over, after which the scopes resolve their named links against
//! the whole mapping.

use rustc_hash::FxHashMap;

use quill_common::TypeRevision;

use crate::meta::{MetaEnum, MetaMethod, MetaProperty};
use crate::scope::{AccessSemantics, ScopeArena, ScopeFlags, ScopeId, ScopeKind};

/// The shape import resolution delivers for one type. This is the engine's
/// view of the external reflection catalogue: a leaf description, opaque
/// except for the declared members and named links.
#[derive(Clone, Debug, Default)]
pub struct TypeDescriptor {
    pub internal_name: String,
    pub base_type_name: String,
    pub base_type_revision: TypeRevision,
    pub access_semantics: Option<AccessSemantics>,
    pub is_composite: bool,
    pub is_creatable: bool,
    pub is_singleton: bool,
    pub attached_type_name: String,
    pub extension_type_name: String,
    pub value_type_name: String,
    pub properties: Vec<MetaProperty>,
    pub methods: Vec<MetaMethod>,
    pub enumerations: Vec<MetaEnum>,
}

impl TypeDescriptor {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            ..Self::default()
        }
    }

    pub fn with_semantics(internal_name: impl Into<String>, semantics: AccessSemantics) -> Self {
        let mut descriptor = Self::new(internal_name);
        descriptor.access_semantics = Some(semantics);
        descriptor
    }

    /// Allocates a scope for this descriptor. Named links stay unresolved
    /// until [`resolve_imported_types`] runs over the full mapping.
    pub fn materialize(&self, arena: &mut ScopeArena) -> ScopeId {
        let id = arena.create(ScopeKind::ObjectScope, None);
        let scope = arena.get_mut(id);
        scope.set_internal_name(&self.internal_name);
        scope.set_base_type_name(&self.base_type_name);
        scope.set_base_type_revision(self.base_type_revision);
        scope.set_attached_type_name(&self.attached_type_name);
        scope.set_extension_type_name(&self.extension_type_name);
        scope.set_value_type_name(&self.value_type_name);
        scope.set_access_semantics(self.access_semantics.unwrap_or(AccessSemantics::Reference));
        scope.set_flag(ScopeFlags::COMPOSITE, self.is_composite);
        scope.set_flag(ScopeFlags::CREATABLE, self.is_creatable);
        scope.set_flag(ScopeFlags::SINGLETON, self.is_singleton);
        for property in &self.properties {
            scope.add_own_property(property.clone());
        }
        for method in &self.methods {
            scope.add_own_method(method.clone());
        }
        for enumeration in &self.enumerations {
            scope.add_own_enumeration(enumeration.clone());
        }
        id
    }
}

/// Materializes a whole catalogue and resolves the cross references
/// between its members. Returns the name-to-scope mapping the builder and
/// resolver consume.
pub fn materialize_types(
    arena: &mut ScopeArena,
    descriptors: impl IntoIterator<Item = (String, TypeDescriptor)>,
) -> FxHashMap<String, ScopeId> {
    let mut types = FxHashMap::default();
    for (name, descriptor) in descriptors {
        let id = descriptor.materialize(arena);
        types.insert(name, id);
    }
    resolve_imported_types(arena, &types);
    types
}

/// Resolves base/attached/extension/value links and member types of every
/// scope in `types` against the mapping itself.
pub fn resolve_imported_types(arena: &mut ScopeArena, types: &FxHashMap<String, ScopeId>) {
    let ids: Vec<ScopeId> = types.values().copied().collect();
    for id in ids {
        arena.resolve_types(id, types);
    }
}
