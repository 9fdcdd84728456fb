//! The scope entity and its arena.
//!
//! A [`Scope`] describes one lexical or object scope of a document, or one
//! resolved type from the imported type universe. Scopes live in a
//! [`ScopeArena`] and are addressed by [`ScopeId`]; a parent owns its
//! children as an ordered id list while the child keeps a non-owning back
//! index to the parent. Base, attached, extension and value types are
//! likewise non-owning links into the arena.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use quill_common::{SourceLocation, TypeRevision};

use crate::meta::{MetaEnum, MetaMethod, MetaProperty, MethodKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// The body of a script function, or the synthetic scope of a binding.
    FunctionScope,
    /// A block, loop body, case block, catch clause or `with` statement.
    LexicalScope,
    /// An object declaration: `Rectangle { ... }`.
    ObjectScope,
    /// A grouped property: the `anchors` in `anchors.left`.
    GroupedPropertyScope,
    /// An attached property: the `Keys` in `Keys.onPressed`.
    AttachedPropertyScope,
    /// The scope of an enumeration of a non-composite type.
    EnumScope,
}

/// How values of a type are passed around.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessSemantics {
    Reference,
    Value,
    None,
    Sequence,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct ScopeFlags: u8 {
        const CREATABLE = 0x1;
        const COMPOSITE = 0x2;
        const SINGLETON = 0x4;
        const SCRIPT = 0x8;
        /// Roots a component for id lookup: the document root, or an
        /// object wrapped in an inline `Component`.
        const COMPONENT_ROOT = 0x10;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScriptIdentifierKind {
    Parameter,
    FunctionScoped,
    LexicalScoped,
    /// Bound by the engine rather than the script, e.g. signal handler
    /// parameters inside `onClicked:`.
    Injected,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScriptIdentifier {
    pub kind: ScriptIdentifierKind,
    pub location: SourceLocation,
}

/// Whether a member was found on a type itself or on one of its extensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtensionKind {
    NotExtension,
    ExtensionType,
}

#[derive(Clone, Debug)]
pub struct Scope {
    kind: ScopeKind,
    flags: ScopeFlags,
    semantics: AccessSemantics,

    file_name: String,
    /// The name the type uses to refer to itself: the catalogue name of a
    /// built-in type, or the base name of a composite document.
    internal_name: String,
    base_type_name: String,
    base_type: Option<ScopeId>,
    base_type_revision: TypeRevision,

    attached_type_name: String,
    attached_type: Option<ScopeId>,
    extension_type_name: String,
    extension_type: Option<ScopeId>,
    value_type_name: String,
    value_type: Option<ScopeId>,

    methods: FxHashMap<String, SmallVec<[MetaMethod; 1]>>,
    properties: FxHashMap<String, MetaProperty>,
    enumerations: FxHashMap<String, MetaEnum>,
    script_identifiers: FxHashMap<String, ScriptIdentifier>,

    parent: Option<ScopeId>,
    children: Vec<ScopeId>,

    source_location: SourceLocation,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            flags: ScopeFlags::empty(),
            semantics: AccessSemantics::Reference,
            file_name: String::new(),
            internal_name: String::new(),
            base_type_name: String::new(),
            base_type: None,
            base_type_revision: TypeRevision::none(),
            attached_type_name: String::new(),
            attached_type: None,
            extension_type_name: String::new(),
            extension_type: None,
            value_type_name: String::new(),
            value_type: None,
            methods: FxHashMap::default(),
            properties: FxHashMap::default(),
            enumerations: FxHashMap::default(),
            script_identifiers: FxHashMap::default(),
            parent: None,
            children: Vec::new(),
            source_location: SourceLocation::default(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn access_semantics(&self) -> AccessSemantics {
        self.semantics
    }

    pub fn set_access_semantics(&mut self, semantics: AccessSemantics) {
        self.semantics = semantics;
    }

    pub fn is_creatable(&self) -> bool {
        self.flags.contains(ScopeFlags::CREATABLE)
    }

    pub fn is_composite(&self) -> bool {
        self.flags.contains(ScopeFlags::COMPOSITE)
    }

    pub fn is_singleton(&self) -> bool {
        self.flags.contains(ScopeFlags::SINGLETON)
    }

    pub fn is_script(&self) -> bool {
        self.flags.contains(ScopeFlags::SCRIPT)
    }

    pub fn is_component_root(&self) -> bool {
        self.flags.contains(ScopeFlags::COMPONENT_ROOT)
    }

    pub fn set_flag(&mut self, flag: ScopeFlags, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn set_internal_name(&mut self, name: impl Into<String>) {
        self.internal_name = name.into();
    }

    pub fn base_type_name(&self) -> &str {
        &self.base_type_name
    }

    pub fn set_base_type_name(&mut self, name: impl Into<String>) {
        self.base_type_name = name.into();
    }

    pub fn base_type(&self) -> Option<ScopeId> {
        self.base_type
    }

    pub fn set_base_type(&mut self, base: Option<ScopeId>) {
        self.base_type = base;
    }

    pub fn base_type_revision(&self) -> TypeRevision {
        self.base_type_revision
    }

    pub fn set_base_type_revision(&mut self, revision: TypeRevision) {
        self.base_type_revision = revision;
    }

    pub fn attached_type_name(&self) -> &str {
        &self.attached_type_name
    }

    pub fn set_attached_type_name(&mut self, name: impl Into<String>) {
        self.attached_type_name = name.into();
    }

    pub fn attached_type(&self) -> Option<ScopeId> {
        self.attached_type
    }

    pub fn extension_type_name(&self) -> &str {
        &self.extension_type_name
    }

    pub fn set_extension_type_name(&mut self, name: impl Into<String>) {
        self.extension_type_name = name.into();
    }

    pub fn extension_type(&self) -> Option<ScopeId> {
        self.extension_type
    }

    pub fn value_type_name(&self) -> &str {
        &self.value_type_name
    }

    pub fn set_value_type_name(&mut self, name: impl Into<String>) {
        self.value_type_name = name.into();
    }

    pub fn value_type(&self) -> Option<ScopeId> {
        self.value_type
    }

    pub fn set_value_type(&mut self, value: Option<ScopeId>) {
        self.value_type = value;
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn source_location(&self) -> SourceLocation {
        self.source_location
    }

    pub fn set_source_location(&mut self, location: SourceLocation) {
        self.source_location = location;
    }

    // Own members. Lookups through base and extension chains live on the
    // arena, which can follow the links.

    pub fn add_own_method(&mut self, method: MetaMethod) {
        self.methods.entry(method.name.clone()).or_default().push(method);
    }

    pub fn own_methods(&self, name: &str) -> &[MetaMethod] {
        self.methods.get(name).map_or(&[], |m| m.as_slice())
    }

    pub fn has_own_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn own_method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn add_own_property(&mut self, property: MetaProperty) {
        self.properties.insert(property.name.clone(), property);
    }

    pub fn own_property(&self, name: &str) -> Option<&MetaProperty> {
        self.properties.get(name)
    }

    pub fn own_property_mut(&mut self, name: &str) -> Option<&mut MetaProperty> {
        self.properties.get_mut(name)
    }

    pub fn has_own_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn own_properties(&self) -> impl Iterator<Item = &MetaProperty> {
        self.properties.values()
    }

    pub fn add_own_enumeration(&mut self, enumeration: MetaEnum) {
        self.enumerations.insert(enumeration.name.clone(), enumeration);
    }

    pub fn own_enumeration(&self, name: &str) -> Option<&MetaEnum> {
        self.enumerations.get(name)
    }

    pub fn has_own_enumeration(&self, name: &str) -> bool {
        self.enumerations.contains_key(name)
    }

    pub fn own_enumerations(&self) -> impl Iterator<Item = &MetaEnum> {
        self.enumerations.values()
    }

    pub fn find_script_identifier(&self, name: &str) -> Option<ScriptIdentifier> {
        self.script_identifiers.get(name).copied()
    }

    pub fn script_identifiers(&self) -> impl Iterator<Item = (&str, ScriptIdentifier)> {
        self.script_identifiers
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
    }
}

/// Arena of scopes. All parent/child/base/attached/extension/value links
/// are indices into this arena, so navigation never extends a lifetime.
#[derive(Clone, Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// Creates a scope and, if a parent is given, wires it into the
    /// parent's child list.
    pub fn create(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let mut scope = Scope::new(kind);
        scope.parent = parent;
        self.scopes.push(scope);
        if let Some(parent) = parent {
            self.scopes[parent.index()].children.push(id);
        }
        id
    }

    /// Clones a scope into a fresh arena slot. The clone keeps all links of
    /// the original for navigation but is not registered as a child of the
    /// original's parent; it exists outside the ownership tree.
    pub fn clone_scope(&mut self, source: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let scope = self.scopes[source.index()].clone();
        self.scopes.push(scope);
        id
    }

    /// Replaces the contents of `target` with a copy of `source`, keeping
    /// the target's identity. Used when a tracked clone is adjusted.
    pub fn overwrite(&mut self, target: ScopeId, source: ScopeId) {
        let scope = self.scopes[source.index()].clone();
        self.scopes[target.index()] = scope;
    }

    /// Detaches `scope` from its parent's child list. The scope itself
    /// stays in the arena but is no longer reachable from the tree.
    pub fn detach_from_parent(&mut self, scope: ScopeId) {
        if let Some(parent) = self.scopes[scope.index()].parent.take() {
            self.scopes[parent.index()].children.retain(|&c| c != scope);
        }
    }

    /// The nearest enclosing object scope, starting at `scope` itself.
    pub fn find_current_object_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.get(id).kind() == ScopeKind::ObjectScope {
                return Some(id);
            }
            current = self.get(id).parent();
        }
        None
    }

    /// The nearest non-composite type in the base chain, starting at
    /// `scope` itself. Composite documents derive from a non-composite
    /// type eventually; that type anchors revision gating and storage.
    pub fn non_composite_base_type(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut seen = FxHashSet::default();
        let mut current = Some(scope);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            if !self.get(id).is_composite() {
                return Some(id);
            }
            current = self.get(id).base_type();
        }
        None
    }

    /// The revision reached by the nearest non-composite base, following
    /// base links and accumulating the revision recorded on the way in.
    pub fn non_composite_base_revision(&self, scope: ScopeId) -> TypeRevision {
        let mut seen = FxHashSet::default();
        let mut current = self.get(scope).base_type();
        let mut revision = self.get(scope).base_type_revision();
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            if !self.get(id).is_composite() {
                return revision;
            }
            revision = self.get(id).base_type_revision();
            current = self.get(id).base_type();
        }
        TypeRevision::none()
    }

    /// Walks the base chain of `scope` and, for every base, its extension
    /// chain, calling `check` until it returns true. Returns whether any
    /// call did.
    pub fn search_base_and_extension_types<F>(&self, scope: ScopeId, mut check: F) -> bool
    where
        F: FnMut(ScopeId, ExtensionKind) -> bool,
    {
        let mut seen = FxHashSet::default();
        let mut current = Some(scope);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }

            // Extensions take precedence over the extended type itself.
            let mut extension = self.get(id).extension_type();
            while let Some(ext) = extension {
                if !seen.insert(ext) {
                    break;
                }
                if check(ext, ExtensionKind::ExtensionType) {
                    return true;
                }
                extension = self.get(ext).extension_type();
            }

            if check(id, ExtensionKind::NotExtension) {
                return true;
            }

            current = self.get(id).base_type();
        }
        false
    }

    /// Does `derived` have `base` in its base chain (inclusive)?
    pub fn inherits(&self, derived: ScopeId, base: ScopeId) -> bool {
        let mut seen = FxHashSet::default();
        let mut current = Some(derived);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            if id == base {
                return true;
            }
            current = self.get(id).base_type();
        }
        false
    }

    // Inherited member lookups.

    pub fn has_property(&self, scope: ScopeId, name: &str) -> bool {
        self.property(scope, name).is_some()
    }

    pub fn property(&self, scope: ScopeId, name: &str) -> Option<&MetaProperty> {
        let mut found = None;
        self.search_base_and_extension_types(scope, |id, _| {
            if self.get(id).has_own_property(name) {
                found = Some(id);
                true
            } else {
                false
            }
        });
        found.and_then(|id| self.get(id).own_property(name))
    }

    pub fn has_method(&self, scope: ScopeId, name: &str) -> bool {
        !self.methods(scope, name).is_empty()
    }

    pub fn methods(&self, scope: ScopeId, name: &str) -> Vec<MetaMethod> {
        let mut found = None;
        self.search_base_and_extension_types(scope, |id, _| {
            if self.get(id).has_own_method(name) {
                found = Some(id);
                true
            } else {
                false
            }
        });
        found.map_or_else(Vec::new, |id| self.get(id).own_methods(name).to_vec())
    }

    pub fn has_enumeration(&self, scope: ScopeId, name: &str) -> bool {
        self.enumeration(scope, name).is_some()
    }

    pub fn enumeration(&self, scope: ScopeId, name: &str) -> Option<&MetaEnum> {
        let mut found = None;
        self.search_base_and_extension_types(scope, |id, _| {
            if self.get(id).has_own_enumeration(name) {
                found = Some(id);
                true
            } else {
                false
            }
        });
        found.and_then(|id| self.get(id).own_enumeration(name))
    }

    pub fn has_enumeration_key(&self, scope: ScopeId, key: &str) -> bool {
        let mut found = false;
        self.search_base_and_extension_types(scope, |id, _| {
            if self.get(id).own_enumerations().any(|e| e.has_key(key)) {
                found = true;
                true
            } else {
                false
            }
        });
        found
    }

    /// Inserts a script identifier. Function-scoped names hoist out of
    /// lexical scopes to the nearest function scope.
    pub fn insert_script_identifier(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        identifier: ScriptIdentifier,
    ) {
        let mut target = scope;
        if identifier.kind == ScriptIdentifierKind::FunctionScoped {
            while self.get(target).kind() == ScopeKind::LexicalScope {
                match self.get(target).parent() {
                    Some(parent) => target = parent,
                    None => break,
                }
            }
        }
        self.get_mut(target)
            .script_identifiers
            .insert(name.into(), identifier);
    }

    /// Adds a property together with its generated notify signal.
    pub fn insert_property_identifier(&mut self, scope: ScopeId, property: MetaProperty) {
        let notify = format!("{}Changed", property.name);
        self.get_mut(scope).add_own_property(property);
        self.get_mut(scope)
            .add_own_method(MetaMethod::new(notify, MethodKind::Signal));
    }

    /// Is `name` visible as a script identifier from `scope`, walking the
    /// enclosing function and lexical scopes but not crossing objects?
    pub fn find_script_identifier(&self, scope: ScopeId, name: &str) -> Option<ScriptIdentifier> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(found) = scope.find_script_identifier(name) {
                return Some(found);
            }
            if scope.kind() == ScopeKind::ObjectScope {
                break;
            }
            current = scope.parent();
        }
        None
    }

    /// Resolves the named type links of `scope` against `contextual`, a
    /// name-to-type mapping supplied by import resolution. Unresolved base
    /// types become placeholder entities with access semantics `None`;
    /// other unresolved names stay textual for later reporting.
    pub fn resolve_types(&mut self, scope: ScopeId, contextual: &FxHashMap<String, ScopeId>) {
        let resolve = |name: &str| -> Option<ScopeId> {
            if name.is_empty() {
                None
            } else {
                contextual.get(name).copied()
            }
        };

        if self.get(scope).base_type().is_none() {
            let name = self.get(scope).base_type_name().to_owned();
            if !name.is_empty() {
                let base = match resolve(&name) {
                    Some(base) => Some(base),
                    None => Some(self.unresolved_placeholder(&name)),
                };
                self.get_mut(scope).set_base_type(base);
            }
        }

        if self.get(scope).attached_type().is_none() {
            let name = self.get(scope).attached_type_name().to_owned();
            if let Some(attached) = resolve(&name) {
                self.get_mut(scope).attached_type = Some(attached);
            }
        }

        if self.get(scope).extension_type().is_none() {
            let name = self.get(scope).extension_type_name().to_owned();
            if let Some(extension) = resolve(&name) {
                self.get_mut(scope).extension_type = Some(extension);
            }
        }

        if self.get(scope).value_type().is_none() {
            let name = self.get(scope).value_type_name().to_owned();
            if let Some(value) = resolve(&name) {
                self.get_mut(scope).set_value_type(Some(value));
            }
        }

        let int_type = resolve("int");

        // Member types. Alias targets are ids, not type names; the alias
        // resolution pass deals with them.
        let property_names: Vec<String> = self
            .get(scope)
            .own_properties()
            .filter(|p| p.type_.is_none() && !p.is_alias)
            .map(|p| p.name.clone())
            .collect();
        for name in property_names {
            let type_name = self.get(scope).own_property(&name).unwrap().type_name.clone();
            if let Some(resolved) = resolve(&type_name) {
                if let Some(prop) = self.get_mut(scope).own_property_mut(&name) {
                    prop.type_ = Some(resolved);
                }
            }
        }

        let method_names: Vec<String> = self
            .get(scope)
            .own_method_names()
            .map(str::to_owned)
            .collect();
        for name in method_names {
            let overloads = self.get(scope).own_methods(&name).to_vec();
            let mut resolved = Vec::with_capacity(overloads.len());
            for mut method in overloads {
                if method.return_type.is_none() {
                    method.return_type = resolve(&method.return_type_name);
                }
                for (index, (_, type_name)) in method.parameters.iter().enumerate() {
                    if method.parameter_types[index].is_none() {
                        method.parameter_types[index] = resolve(type_name);
                    }
                }
                resolved.push(method);
            }
            self.get_mut(scope).methods.insert(name, resolved.into());
        }

        let enum_names: Vec<String> = self
            .get(scope)
            .own_enumerations()
            .filter(|e| e.type_.is_none())
            .map(|e| e.name.clone())
            .collect();
        for name in enum_names {
            if let Some(enumeration) = self.get_mut(scope).enumerations.get_mut(&name) {
                enumeration.type_ = int_type;
            }
        }
    }

    fn unresolved_placeholder(&mut self, name: &str) -> ScopeId {
        let id = self.create(ScopeKind::ObjectScope, None);
        let scope = self.get_mut(id);
        scope.set_internal_name(name);
        scope.set_access_semantics(AccessSemantics::None);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_and_children_stay_consistent() {
        let mut arena = ScopeArena::new();
        let root = arena.create(ScopeKind::ObjectScope, None);
        let child = arena.create(ScopeKind::FunctionScope, Some(root));
        assert_eq!(arena.get(child).parent(), Some(root));
        assert_eq!(arena.get(root).children(), &[child]);

        arena.detach_from_parent(child);
        assert_eq!(arena.get(child).parent(), None);
        assert!(arena.get(root).children().is_empty());
    }

    #[test]
    fn function_scoped_identifiers_hoist() {
        let mut arena = ScopeArena::new();
        let function = arena.create(ScopeKind::FunctionScope, None);
        let block = arena.create(ScopeKind::LexicalScope, Some(function));

        arena.insert_script_identifier(
            block,
            "hoisted",
            ScriptIdentifier {
                kind: ScriptIdentifierKind::FunctionScoped,
                location: SourceLocation::default(),
            },
        );
        arena.insert_script_identifier(
            block,
            "local",
            ScriptIdentifier {
                kind: ScriptIdentifierKind::LexicalScoped,
                location: SourceLocation::default(),
            },
        );

        assert!(arena.get(function).find_script_identifier("hoisted").is_some());
        assert!(arena.get(block).find_script_identifier("hoisted").is_none());
        assert!(arena.get(block).find_script_identifier("local").is_some());
    }

    #[test]
    fn inherited_property_lookup_walks_bases() {
        let mut arena = ScopeArena::new();
        let base = arena.create(ScopeKind::ObjectScope, None);
        arena
            .get_mut(base)
            .add_own_property(MetaProperty::with_type("width", "double"));

        let derived = arena.create(ScopeKind::ObjectScope, None);
        arena.get_mut(derived).set_base_type(Some(base));

        assert!(arena.has_property(derived, "width"));
        assert!(!arena.get(derived).has_own_property("width"));
    }

    #[test]
    fn extension_members_are_found() {
        let mut arena = ScopeArena::new();
        let extension = arena.create(ScopeKind::ObjectScope, None);
        arena
            .get_mut(extension)
            .add_own_property(MetaProperty::with_type("extended", "int"));

        let ty = arena.create(ScopeKind::ObjectScope, None);
        arena.get_mut(ty).extension_type = Some(extension);

        assert!(arena.has_property(ty, "extended"));
    }
}
