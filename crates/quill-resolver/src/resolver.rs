//! The type resolver: lookup, conversion and merging over a bound
//! document.
//!
//! The resolver takes ownership of the binder's output and answers the
//! questions a compiler pass asks: what does this name mean in this scope,
//! what is the type of this member access, can this value convert to that
//! type, and what single type can hold both branches of this expression.
//! Lookups degrade rather than fail: an unresolvable name yields the
//! invalid register content and, where the situation is structurally
//! impossible, a diagnostic.
//!
//! On top of the plain queries sits the tracked-type overlay. A pass that
//! wants to refine types as it learns more requests a tracked clone of a
//! type, adjusts it in place as evidence arrives, and can later generalize
//! it back to a canonical type. Identity comparison goes through
//! [`TypeResolver::equals`], which sees through the clones.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use quill_common::{Diagnostic, DiagnosticSink, SourceLocation, TypeRevision};

use quill_binder::ast::Literal;
use quill_binder::{
    AccessSemantics, BindResult, ExtensionKind, MetaMethod, MetaProperty, ScopeArena, ScopeId,
    ScopeKind, ScopesById,
};

use crate::builtins::BuiltinTypes;
use crate::ops::{BinaryOperator, UnaryOperator};
use crate::register::{ContentVariant, RegisterContent, RegisterKind};

/// Whether lookups hand out tracked clones or the plain types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CloneMode {
    CloneTypes,
    DoNotCloneTypes,
}

/// Whether `Component` counts as a generic object root. Deferred object
/// creation wants the component wrapper itself, everything else wants the
/// object underneath.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentIsGeneric {
    Yes,
    No,
}

#[derive(Copy, Clone, Debug)]
struct TrackedType {
    original: ScopeId,
    replacement: Option<ScopeId>,
    clone: ScopeId,
}

pub struct TypeResolver {
    arena: ScopeArena,
    imports: FxHashMap<String, ScopeId>,
    import_qualifiers: FxHashSet<String>,
    ids: ScopesById,
    builtins: BuiltinTypes,
    tracked: FxHashMap<ScopeId, TrackedType>,
    clone_mode: CloneMode,
    sink: DiagnosticSink,
    root: ScopeId,
    global: ScopeId,
}

impl TypeResolver {
    /// Takes over a bound document. The import mapping must contain the
    /// default catalogue; binder diagnostics carry over into the sink.
    pub fn new(mut bound: BindResult) -> Self {
        let builtins = BuiltinTypes::resolve(&mut bound.arena, &bound.imports);
        let sink = DiagnosticSink::new();
        for diagnostic in bound.diagnostics {
            sink.log(diagnostic.message, diagnostic.category, diagnostic.location);
        }
        Self {
            arena: bound.arena,
            imports: bound.imports,
            import_qualifiers: bound.import_qualifiers,
            ids: bound.ids,
            builtins,
            tracked: FxHashMap::default(),
            clone_mode: CloneMode::CloneTypes,
            sink,
            root: bound.root,
            global: bound.global,
        }
    }

    pub fn arena(&self) -> &ScopeArena {
        &self.arena
    }

    pub fn builtins(&self) -> &BuiltinTypes {
        &self.builtins
    }

    pub fn ids(&self) -> &ScopesById {
        &self.ids
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn set_clone_mode(&mut self, mode: CloneMode) {
        self.clone_mode = mode;
    }

    pub fn clone_mode(&self) -> CloneMode {
        self.clone_mode
    }

    /// Drains all diagnostics accumulated so far, binder ones included.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.take()
    }

    pub fn has_errors(&self) -> bool {
        self.sink.has_errors()
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// The canonical identity of `type_`: tracked clones compare as their
    /// adjusted replacement, or as their original before any adjustment.
    pub fn comparable_type(&self, type_: ScopeId) -> ScopeId {
        match self.tracked.get(&type_) {
            Some(entry) => entry.replacement.unwrap_or(entry.original),
            None => type_,
        }
    }

    /// The type `type_` was cloned from, or `type_` itself.
    pub fn original_type(&self, type_: ScopeId) -> ScopeId {
        self.tracked.get(&type_).map_or(type_, |entry| entry.original)
    }

    /// Type identity modulo tracking.
    pub fn equals(&self, a: ScopeId, b: ScopeId) -> bool {
        self.comparable_type(a) == self.comparable_type(b)
    }

    // ========================================================================
    // Classification
    // ========================================================================

    pub fn is_primitive(&self, type_: ScopeId) -> bool {
        let b = &self.builtins;
        self.is_numeric(type_)
            || self.equals(type_, b.bool_type)
            || self.equals(type_, b.void_type)
            || self.equals(type_, b.null_type)
            || self.equals(type_, b.string_type)
            || self.equals(type_, b.primitive_type)
    }

    /// Numeric means the number prototype is reachable through bases and
    /// extensions, so registered numeric aliases qualify too.
    pub fn is_numeric(&self, type_: ScopeId) -> bool {
        self.arena.search_base_and_extension_types(type_, |id, _| {
            self.equals(id, self.builtins.number_prototype)
        })
    }

    pub fn is_integral(&self, type_: ScopeId) -> bool {
        self.equals(type_, self.builtins.int_type) || self.equals(type_, self.builtins.uint_type)
    }

    // ========================================================================
    // The lattice
    // ========================================================================

    /// The least type that can hold values of both `a` and `b`.
    pub fn merge(&self, a: ScopeId, b: ScopeId) -> ScopeId {
        let bt = &self.builtins;

        if self.equals(a, b) {
            return a;
        }
        if self.equals(a, bt.empty_type) {
            return b;
        }
        if self.equals(b, bt.empty_type) {
            return a;
        }

        if self.equals(a, bt.script_value_type) || self.equals(a, bt.var_type) {
            return a;
        }
        if self.equals(b, bt.script_value_type) || self.equals(b, bt.var_type) {
            return b;
        }

        // bool widens into the integral it meets.
        if self.equals(a, bt.bool_type) && self.is_integral(b) {
            return b;
        }
        if self.equals(b, bt.bool_type) && self.is_integral(a) {
            return a;
        }

        if self.is_numeric(a) && self.is_numeric(b) {
            return bt.real_type;
        }

        // An int carried into a string concatenation stays a string.
        let pair = |x: ScopeId, y: ScopeId| {
            (self.equals(a, x) && self.equals(b, y)) || (self.equals(b, x) && self.equals(a, y))
        };
        if pair(bt.int_type, bt.string_type) || pair(bt.uint_type, bt.string_type) {
            return bt.string_type;
        }

        if self.is_primitive(a) && self.is_primitive(b) {
            return bt.primitive_type;
        }

        if let Some(common) = self.common_base_type(a, b) {
            return common;
        }

        if self.equals(a, bt.null_type)
            && self.arena.get(b).access_semantics() == AccessSemantics::Reference
        {
            return b;
        }
        if self.equals(b, bt.null_type)
            && self.arena.get(a).access_semantics() == AccessSemantics::Reference
        {
            return a;
        }

        bt.var_type
    }

    /// Merges two register contents into a conversion that remembers its
    /// origins. Stored and scope types merge pairwise; differing variants
    /// collapse to unknown provenance.
    pub fn merge_contents(&self, a: &RegisterContent, b: &RegisterContent) -> RegisterContent {
        let mut origins: Vec<ScopeId> = Vec::new();
        for content in [a, b] {
            if content.is_conversion() {
                origins.extend_from_slice(content.conversion_origins());
            } else if let Some(contained) = self.contained_type(content) {
                origins.push(contained);
            }
        }
        origins.sort_unstable();
        origins.dedup();

        let contained_a = self.contained_type(a).unwrap_or(self.builtins.empty_type);
        let contained_b = self.contained_type(b).unwrap_or(self.builtins.empty_type);
        let result = self.merge(contained_a, contained_b);

        let stored = self
            .merge_options(a.stored_type(), b.stored_type())
            .unwrap_or_else(|| self.stored_type(result));
        let scope = self.merge_options(a.scope_type(), b.scope_type());

        RegisterContent::from_conversion(
            stored,
            origins,
            result,
            a.variant().merge(b.variant()),
            scope,
        )
    }

    fn merge_options(&self, a: Option<ScopeId>, b: Option<ScopeId>) -> Option<ScopeId> {
        match (a, b) {
            (Some(a), Some(b)) => Some(self.merge(a, b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }

    fn common_base_type(&self, a: ScopeId, b: ScopeId) -> Option<ScopeId> {
        let mut seen_a = FxHashSet::default();
        let mut current_a = Some(a);
        while let Some(a_base) = current_a {
            if !seen_a.insert(a_base) {
                break;
            }
            let mut seen_b = FxHashSet::default();
            let mut current_b = Some(b);
            while let Some(b_base) = current_b {
                if !seen_b.insert(b_base) {
                    break;
                }
                if self.equals(a_base, b_base) {
                    return Some(a_base);
                }
                current_b = self.arena.get(b_base).base_type();
            }
            current_a = self.arena.get(a_base).base_type();
        }
        None
    }

    // ========================================================================
    // Convertibility
    // ========================================================================

    pub fn can_convert_from_to(&self, from: ScopeId, to: ScopeId) -> bool {
        if self.can_primitively_convert_from_to(from, to) {
            return true;
        }

        // Strings parse into a handful of structured value types.
        if self.equals(from, self.builtins.string_type) {
            return matches!(
                self.arena.get(to).internal_name(),
                "time" | "date" | "point" | "rect" | "size" | "color"
            );
        }

        false
    }

    pub fn can_primitively_convert_from_to(&self, from: ScopeId, to: ScopeId) -> bool {
        let b = &self.builtins;

        if self.equals(from, to) {
            return true;
        }
        if self.equals(from, b.var_type) || self.equals(to, b.var_type) {
            return true;
        }
        if self.equals(from, b.script_value_type) || self.equals(to, b.script_value_type) {
            return true;
        }
        if self.is_numeric(from) && self.is_numeric(to) {
            return true;
        }
        if self.is_numeric(from) && self.equals(to, b.bool_type) {
            return true;
        }
        if self.arena.get(from).access_semantics() == AccessSemantics::Reference
            && (self.equals(to, b.bool_type) || self.equals(to, b.string_type))
        {
            return true;
        }

        // Strings have number constructors and vice versa, but enums do
        // not parse from strings.
        if self.is_numeric(from) && self.equals(to, b.string_type) {
            return true;
        }
        if self.equals(from, b.string_type) && self.is_numeric(to) {
            return self.arena.get(to).kind() != ScopeKind::EnumScope;
        }

        if (self.equals(from, b.string_type) && self.equals(to, b.url_type))
            || (self.equals(from, b.url_type) && self.equals(to, b.string_type))
        {
            return true;
        }
        if (self.equals(from, b.string_type) && self.equals(to, b.byte_array_type))
            || (self.equals(from, b.byte_array_type) && self.equals(to, b.string_type))
        {
            return true;
        }

        if self.equals(from, b.void_type) || self.equals(to, b.void_type) {
            return true;
        }

        if self.equals(from, b.string_type) && self.equals(to, b.date_time_type) {
            return true;
        }

        if self.equals(from, b.null_type)
            && self.arena.get(to).access_semantics() == AccessSemantics::Reference
        {
            return true;
        }

        // Any primitive casts to and from the primitive box, and to a null
        // reference.
        if self.equals(from, b.primitive_type) {
            return self.is_primitive(to)
                || self.arena.get(to).access_semantics() == AccessSemantics::Reference;
        }
        if self.equals(to, b.primitive_type) {
            return self.is_primitive(from);
        }

        if self.equals(from, b.variant_list_type) || self.equals(from, b.empty_list_type) {
            return self.arena.get(to).access_semantics() == AccessSemantics::Sequence;
        }

        // Walk the base chain. Non-composite targets also match by
        // internal name, since the same native type can be materialized
        // more than once.
        let match_by_name = !self.arena.get(to).is_composite();
        let to_internal = self.arena.get(to).internal_name();
        let mut seen = FxHashSet::default();
        let mut base = Some(from);
        while let Some(id) = base {
            if !seen.insert(id) {
                break;
            }
            if self.equals(id, to) {
                return true;
            }
            if match_by_name
                && !to_internal.is_empty()
                && self.arena.get(id).internal_name() == to_internal
            {
                return true;
            }
            base = self.arena.get(id).base_type();
        }

        // Whatever fits through the primitive box converts transitively.
        if self.can_convert_from_to(from, b.primitive_type)
            && self.can_convert_from_to(b.primitive_type, to)
        {
            return true;
        }

        false
    }

    // ========================================================================
    // Operator typing
    // ========================================================================

    pub fn type_for_binary_operation(
        &self,
        op: BinaryOperator,
        left: &RegisterContent,
        right: &RegisterContent,
    ) -> RegisterContent {
        let b = &self.builtins;
        match op {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::StrictEqual
            | BinaryOperator::StrictNotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::GreaterThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual
            | BinaryOperator::In
            | BinaryOperator::InstanceOf => self.global_type(b.bool_type),
            BinaryOperator::BitAnd
            | BinaryOperator::BitOr
            | BinaryOperator::BitXor
            | BinaryOperator::LeftShift
            | BinaryOperator::RightShift => self.builtin_type(b.int_type),
            BinaryOperator::UnsignedRightShift => self.builtin_type(b.uint_type),
            BinaryOperator::Add => {
                let left_contained = self.contained_type(left).unwrap_or(b.empty_type);
                let right_contained = self.contained_type(right).unwrap_or(b.empty_type);
                if self.equals(left_contained, b.string_type)
                    || self.equals(right_contained, b.string_type)
                {
                    return self.builtin_type(b.string_type);
                }
                let result = self.merge(left_contained, right_contained);
                if self.equals(result, b.bool_type) {
                    return self.builtin_type(b.int_type);
                }
                if self.is_numeric(result) {
                    return self.builtin_type(b.real_type);
                }
                self.builtin_type(b.primitive_type)
            }
            BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Exp => {
                let result = self.merge(
                    self.contained_type(left).unwrap_or(b.empty_type),
                    self.contained_type(right).unwrap_or(b.empty_type),
                );
                if self.equals(result, b.bool_type) {
                    self.builtin_type(b.int_type)
                } else {
                    self.builtin_type(b.real_type)
                }
            }
            BinaryOperator::Div | BinaryOperator::Mod => self.builtin_type(b.real_type),
            BinaryOperator::As => right.clone(),
        }
    }

    pub fn type_for_unary_operation(
        &self,
        op: UnaryOperator,
        operand: &RegisterContent,
    ) -> RegisterContent {
        let b = &self.builtins;
        match op {
            UnaryOperator::Not => return self.builtin_type(b.bool_type),
            UnaryOperator::Complement => return self.builtin_type(b.int_type),
            UnaryOperator::Plus => {
                if self
                    .contained_type(operand)
                    .is_some_and(|t| self.is_integral(t))
                {
                    return operand.clone();
                }
            }
            UnaryOperator::Minus => {}
        }

        if self
            .contained_type(operand)
            .is_some_and(|t| self.equals(t, b.bool_type))
        {
            self.builtin_type(b.int_type)
        } else {
            self.builtin_type(b.real_type)
        }
    }

    pub fn type_for_const(&self, literal: &Literal) -> ScopeId {
        let b = &self.builtins;
        match literal {
            Literal::Undefined => b.void_type,
            Literal::Null => b.null_type,
            Literal::Bool(_) => b.bool_type,
            Literal::Int(_) => b.int_type,
            Literal::Number(_) => b.real_type,
            Literal::String(_) => b.string_type,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn type_for_name(&self, name: &str) -> Option<ScopeId> {
        self.imports.get(name).copied()
    }

    pub fn scope_for_id(&self, id: &str, referrer: ScopeId) -> Option<ScopeId> {
        self.ids.scope(id, referrer, &self.arena)
    }

    /// The type a member access carries along. Method contents answer with
    /// their stored type since overload selection has not happened yet;
    /// module prefixes with the scope they pivot on.
    pub fn contained_type(&self, content: &RegisterContent) -> Option<ScopeId> {
        match content.kind() {
            RegisterKind::None => None,
            RegisterKind::Type(type_) => Some(*type_),
            RegisterKind::Property(property) => property.type_,
            RegisterKind::Method(_) => content.stored_type(),
            RegisterKind::Enumeration { enumeration, .. } => {
                enumeration.type_.or(Some(self.builtins.int_type))
            }
            RegisterKind::ImportNamespace(_) => match content.variant() {
                ContentVariant::ScopeModulePrefix => content.stored_type(),
                ContentVariant::ObjectModulePrefix => content.scope_type(),
                _ => content.stored_type(),
            },
            RegisterKind::Conversion { result, .. } => Some(*result),
        }
    }

    /// What `name` means when it appears unqualified inside `scope`.
    pub fn scoped_type(&self, scope: ScopeId, name: &str) -> RegisterContent {
        debug!(name, scope = scope.0, "scoped lookup");
        if name.is_empty() {
            return RegisterContent::invalid();
        }

        // Script identifiers shadow everything else in their function.
        if self.arena.find_script_identifier(scope, name).is_some() {
            return RegisterContent::from_property(
                self.builtins.script_value_type,
                self.script_value_property(name),
                ContentVariant::ScriptObject,
                Some(scope),
            );
        }

        if let Some(identified) = self.ids.scope(name, scope, &self.arena) {
            return RegisterContent::from_type(
                self.stored_type(identified),
                identified,
                ContentVariant::ObjectById,
                Some(scope),
            );
        }

        if let Some(base) = self.arena.find_current_object_scope(scope) {
            let mut result = RegisterContent::invalid();
            let found = self.arena.search_base_and_extension_types(base, |id, mode| {
                let found_scope = self.arena.get(id);
                if let Some(property) = found_scope.own_property(name) {
                    if !self.is_revision_allowed(property.revision, scope) {
                        return false;
                    }
                    result = self.property_content(
                        property.clone(),
                        match mode {
                            ExtensionKind::ExtensionType => ContentVariant::ExtensionScopeProperty,
                            ExtensionKind::NotExtension => ContentVariant::ScopeProperty,
                        },
                        scope,
                    );
                    return true;
                }

                let methods: Vec<MetaMethod> = found_scope
                    .own_methods(name)
                    .iter()
                    .filter(|m| self.is_revision_allowed(m.revision, scope))
                    .cloned()
                    .collect();
                if !methods.is_empty() {
                    result = RegisterContent::from_methods(
                        self.builtins.script_value_type,
                        methods,
                        match mode {
                            ExtensionKind::ExtensionType => ContentVariant::ExtensionScopeMethod,
                            ExtensionKind::NotExtension => ContentVariant::ScopeMethod,
                        },
                        Some(scope),
                    );
                    return true;
                }

                // Unqualified enum keys are not visible.
                false
            });
            if found {
                return result;
            }
        }

        let result = self.register_content_for_name(name, Some(scope), false);
        if result.is_valid() {
            return result;
        }

        let global = self.builtins.global_object;
        if let Some(property) = self.arena.property(global, name) {
            return RegisterContent::from_property(
                self.builtins.script_value_type,
                property.clone(),
                ContentVariant::ScriptGlobal,
                Some(global),
            );
        }
        let methods = self.arena.methods(global, name);
        if !methods.is_empty() {
            return RegisterContent::from_methods(
                self.builtins.script_value_type,
                methods,
                ContentVariant::ScriptGlobal,
                Some(global),
            );
        }

        trace!(name, "unqualified name did not resolve");
        RegisterContent::invalid()
    }

    /// What `container.name` means.
    pub fn member_type(&self, container: &RegisterContent, name: &str) -> RegisterContent {
        match container.kind() {
            RegisterKind::None => RegisterContent::invalid(),
            RegisterKind::Type(type_) => {
                let result = self.member_type_of(*type_, name);
                if result.is_valid() {
                    return result;
                }
                // A plain type reference may still expose the enums of the
                // type it was looked up on.
                self.member_enum_type(container.scope_type(), name)
            }
            RegisterKind::Property(property) => {
                if property.is_list && name == "length" {
                    return self.length_property(
                        property.type_.unwrap_or(self.builtins.list_property_type),
                    );
                }
                match property.type_ {
                    Some(type_) => self.member_type_of(type_, name),
                    None => RegisterContent::invalid(),
                }
            }
            RegisterKind::Enumeration {
                enumeration,
                member,
            } => {
                if member.is_some() || !enumeration.has_key(name) {
                    return RegisterContent::invalid();
                }
                RegisterContent::from_enumeration(
                    self.stored_type(self.builtins.int_type),
                    enumeration.clone(),
                    Some(name.to_owned()),
                    ContentVariant::ObjectEnum,
                    container.scope_type(),
                )
            }
            RegisterKind::Method(_) => RegisterContent::from_property(
                self.builtins.script_value_type,
                self.script_value_property(name),
                ContentVariant::ScriptObjectProperty,
                Some(self.builtins.script_value_type),
            ),
            RegisterKind::ImportNamespace(prefix) => {
                let scope = container.scope_type();
                let is_reference = scope.is_some_and(|s| {
                    self.arena.get(s).access_semantics() == AccessSemantics::Reference
                });
                if !is_reference {
                    self.sink.warn(
                        format!(
                            "Cannot use a non-reference type as base of the namespaced name \
                             \"{prefix}.{name}\""
                        ),
                        SourceLocation::default(),
                    );
                    return RegisterContent::invalid();
                }
                self.register_content_for_name(
                    &format!("{prefix}.{name}"),
                    scope,
                    container.variant() == ContentVariant::ObjectModulePrefix,
                )
            }
            RegisterKind::Conversion { result, .. } => {
                let member = self.member_type_of(*result, name);
                if member.is_valid() {
                    member
                } else {
                    self.member_enum_type(container.scope_type(), name)
                }
            }
        }
    }

    /// Member lookup directly on a type.
    pub fn member_type_of(&self, type_: ScopeId, name: &str) -> RegisterContent {
        let b = &self.builtins;

        // Plain type references carry no members; their enums live on the
        // scope they were found through.
        if self.equals(type_, b.metatype_type) {
            return RegisterContent::invalid();
        }

        if self.equals(type_, b.script_value_type) {
            return RegisterContent::from_property(
                b.script_value_type,
                self.script_value_property(name),
                ContentVariant::ScriptObjectProperty,
                Some(type_),
            );
        }

        if (self.equals(type_, b.string_type)
            || self.arena.get(type_).access_semantics() == AccessSemantics::Sequence)
            && name == "length"
        {
            return self.length_property(type_);
        }

        let mut result = RegisterContent::invalid();
        let found = self.arena.search_base_and_extension_types(type_, |id, mode| {
            let found_scope = self.arena.get(id);
            if let Some(property) = found_scope.own_property(name) {
                result = self.property_content(
                    property.clone(),
                    match mode {
                        ExtensionKind::ExtensionType => ContentVariant::ExtensionObjectProperty,
                        ExtensionKind::NotExtension => ContentVariant::ObjectProperty,
                    },
                    id,
                );
                return true;
            }

            if found_scope.has_own_method(name) {
                result = RegisterContent::from_methods(
                    b.script_value_type,
                    found_scope.own_methods(name).to_vec(),
                    match mode {
                        ExtensionKind::ExtensionType => ContentVariant::ExtensionObjectMethod,
                        ExtensionKind::NotExtension => ContentVariant::ObjectMethod,
                    },
                    Some(id),
                );
                return true;
            }

            if found_scope.find_script_identifier(name).is_some() {
                result = RegisterContent::from_property(
                    b.script_value_type,
                    self.script_value_property(name),
                    ContentVariant::ScriptObject,
                    Some(type_),
                );
                return true;
            }

            if let Some(content) = self.check_enums(id, name, mode) {
                result = content;
                return true;
            }

            false
        });
        if found {
            return result;
        }

        // An attaching type used as a member: `Keys` in `item.Keys`.
        if let Some(attached_base) = self.type_for_name(name) {
            if let Some(attached) = self.arena.get(attached_base).attached_type() {
                return RegisterContent::from_type(
                    self.stored_type(attached),
                    attached,
                    ContentVariant::ObjectAttached,
                    Some(attached_base),
                );
            }
        }

        RegisterContent::invalid()
    }

    fn register_content_for_name(
        &self,
        name: &str,
        scope: Option<ScopeId>,
        has_object_module_prefix: bool,
    ) -> RegisterContent {
        if self.import_qualifiers.contains(name) {
            return RegisterContent::from_import_namespace(
                self.builtins.script_value_type,
                name,
                if has_object_module_prefix {
                    ContentVariant::ObjectModulePrefix
                } else {
                    ContentVariant::ScopeModulePrefix
                },
                scope,
            );
        }

        let Some(type_) = self.type_for_name(name) else {
            return RegisterContent::invalid();
        };

        let type_scope = self.arena.get(type_);
        if type_scope.is_singleton() {
            return RegisterContent::from_type(
                self.stored_type(type_),
                type_,
                ContentVariant::Singleton,
                scope,
            );
        }
        if type_scope.is_script() {
            return RegisterContent::from_type(
                self.stored_type(type_),
                type_,
                ContentVariant::Script,
                scope,
            );
        }

        if let Some(attached) = type_scope.attached_type() {
            if type_scope.access_semantics() != AccessSemantics::Reference {
                self.sink.warn(
                    format!(
                        "Cannot retrieve attached object for non-reference type \"{}\"",
                        self.display_name(type_)
                    ),
                    type_scope.source_location(),
                );
                return RegisterContent::invalid();
            }
            return RegisterContent::from_type(
                self.stored_type(attached),
                attached,
                if has_object_module_prefix {
                    ContentVariant::ObjectAttached
                } else {
                    ContentVariant::ScopeAttached
                },
                Some(type_),
            );
        }

        match type_scope.access_semantics() {
            // A plain reference to a type. Its enums stay reachable
            // through the scope type.
            AccessSemantics::None | AccessSemantics::Reference => RegisterContent::from_type(
                self.builtins.metatype_type,
                self.builtins.metatype_type,
                ContentVariant::MetaType,
                Some(type_),
            ),
            // Value and sequence types are not values themselves.
            AccessSemantics::Value | AccessSemantics::Sequence => RegisterContent::invalid(),
        }
    }

    fn member_enum_type(&self, scope: Option<ScopeId>, name: &str) -> RegisterContent {
        let Some(scope) = scope else {
            return RegisterContent::invalid();
        };
        let mut result = RegisterContent::invalid();
        let found = self.arena.search_base_and_extension_types(scope, |id, mode| {
            if let Some(content) = self.check_enums(id, name, mode) {
                result = content;
                true
            } else {
                false
            }
        });
        if found {
            result
        } else {
            RegisterContent::invalid()
        }
    }

    fn check_enums(&self, scope: ScopeId, name: &str, mode: ExtensionKind) -> Option<RegisterContent> {
        // Lower case enum names cannot be spelled in a document.
        if !name.chars().next().is_some_and(char::is_uppercase) {
            return None;
        }

        let variant = match mode {
            ExtensionKind::ExtensionType => ContentVariant::ExtensionObjectEnum,
            ExtensionKind::NotExtension => ContentVariant::ObjectEnum,
        };
        let stored = self.stored_type(self.builtins.int_type);

        for enumeration in self.arena.get(scope).own_enumerations() {
            if enumeration.name == name {
                return Some(RegisterContent::from_enumeration(
                    stored,
                    enumeration.clone(),
                    None,
                    variant,
                    Some(scope),
                ));
            }
            if enumeration.has_key(name) {
                return Some(RegisterContent::from_enumeration(
                    stored,
                    enumeration.clone(),
                    Some(name.to_owned()),
                    variant,
                    Some(scope),
                ));
            }
        }
        None
    }

    /// A member introduced at a later revision than the referring scope's
    /// base import is not visible. Members with an unset or zero revision
    /// always are.
    pub fn is_revision_allowed(&self, member: TypeRevision, scope: ScopeId) -> bool {
        if !member.is_valid() || member == TypeRevision::zero() {
            return true;
        }
        // Without a non-composite base revision there is nothing we can
        // say about the member.
        let reached = self.arena.non_composite_base_revision(scope);
        reached.is_valid() && reached >= member
    }

    // ========================================================================
    // Content construction
    // ========================================================================

    pub fn builtin_type(&self, type_: ScopeId) -> RegisterContent {
        RegisterContent::from_type(self.stored_type(type_), type_, ContentVariant::Builtin, None)
    }

    pub fn global_type(&self, type_: ScopeId) -> RegisterContent {
        RegisterContent::from_type(self.stored_type(type_), type_, ContentVariant::Unknown, None)
    }

    pub fn return_type(
        &self,
        type_: ScopeId,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> RegisterContent {
        RegisterContent::from_type(self.stored_type(type_), type_, variant, scope)
    }

    /// Reinterprets `from` as a conversion into `to`, keeping the origins.
    pub fn convert(&self, from: &RegisterContent, to: ScopeId) -> RegisterContent {
        let origins = if from.is_conversion() {
            from.conversion_origins().to_vec()
        } else {
            self.contained_type(from).into_iter().collect()
        };
        RegisterContent::from_conversion(
            self.stored_type(to),
            origins,
            to,
            from.variant(),
            from.scope_type(),
        )
    }

    /// The element content of an indexed list, or invalid if `list` does
    /// not denote anything indexable.
    pub fn value_type(&self, list: &RegisterContent) -> RegisterContent {
        let element_of = |type_: ScopeId| -> Option<ScopeId> {
            let scope = self.arena.get(type_);
            if scope.access_semantics() == AccessSemantics::Sequence {
                scope.value_type()
            } else if self.equals(type_, self.builtins.script_value_type)
                || self.equals(type_, self.builtins.var_type)
            {
                Some(self.builtins.var_type)
            } else {
                None
            }
        };

        let (scope, value) = match list.kind() {
            RegisterKind::Type(type_) => (Some(*type_), element_of(*type_)),
            RegisterKind::Conversion { result, .. } => (list.scope_type(), element_of(*result)),
            RegisterKind::Property(property) => {
                if property.is_list {
                    // A list property of T holds Ts.
                    (property.type_, property.type_)
                } else {
                    (property.type_, property.type_.and_then(element_of))
                }
            }
            _ => (None, None),
        };

        let Some(value) = value else {
            return RegisterContent::invalid();
        };

        let mut property = MetaProperty::new("[]");
        property.type_name = self.arena.get(value).internal_name().to_owned();
        property.type_ = Some(value);

        RegisterContent::from_property(
            self.stored_type(value),
            property,
            ContentVariant::ListValue,
            scope,
        )
    }

    fn property_content(
        &self,
        property: MetaProperty,
        variant: ContentVariant,
        scope: ScopeId,
    ) -> RegisterContent {
        let stored = if property.is_list {
            self.builtins.list_property_type
        } else {
            self.stored_for(property.type_)
        };
        RegisterContent::from_property(stored, property, variant, Some(scope))
    }

    fn length_property(&self, container: ScopeId) -> RegisterContent {
        let mut property = MetaProperty::with_type("length", "int");
        property.type_ = Some(self.builtins.int_type);
        RegisterContent::from_property(
            self.builtins.int_type,
            property,
            ContentVariant::Builtin,
            Some(container),
        )
    }

    fn script_value_property(&self, name: &str) -> MetaProperty {
        let mut property = MetaProperty::with_type(name, "scriptvalue");
        property.type_ = Some(self.builtins.script_value_type);
        property
    }

    fn display_name(&self, type_: ScopeId) -> String {
        let scope = self.arena.get(type_);
        if !scope.internal_name().is_empty() {
            scope.internal_name().to_owned()
        } else if !scope.base_type_name().is_empty() {
            scope.base_type_name().to_owned()
        } else {
            "<anonymous>".to_owned()
        }
    }

    // ========================================================================
    // Storage and generalization
    // ========================================================================

    /// The type a value of `type_` is physically held in.
    pub fn stored_type(&self, type_: ScopeId) -> ScopeId {
        if self.equals(type_, self.builtins.void_type) {
            return type_;
        }
        let scope = self.arena.get(type_);
        if scope.is_script() {
            return self.builtins.script_value_type;
        }
        if scope.is_composite() {
            return self
                .arena
                .non_composite_base_type(type_)
                .unwrap_or_else(|| self.generic_type(type_, ComponentIsGeneric::No));
        }
        if scope.internal_name().is_empty() {
            return self.generic_type(type_, ComponentIsGeneric::No);
        }
        type_
    }

    fn stored_for(&self, type_: Option<ScopeId>) -> ScopeId {
        type_.map_or(self.builtins.var_type, |t| self.stored_type(t))
    }

    /// The canonical type a value of `type_` generalizes to once all
    /// specific knowledge is given up.
    pub fn generic_type(&self, type_: ScopeId, allow_component: ComponentIsGeneric) -> ScopeId {
        let b = &self.builtins;
        let scope = self.arena.get(type_);

        if scope.is_script() {
            return b.script_value_type;
        }
        if self.equals(type_, b.metatype_type) {
            return b.metatype_type;
        }

        if scope.access_semantics() == AccessSemantics::Reference {
            let mut seen = FxHashSet::default();
            let mut base = Some(type_);
            while let Some(id) = base {
                if !seen.insert(id) {
                    break;
                }
                let base_scope = self.arena.get(id);
                if base_scope.internal_name() == "Object" {
                    return id;
                }
                if allow_component == ComponentIsGeneric::Yes
                    && base_scope.internal_name() == "Component"
                {
                    return id;
                }
                base = base_scope.base_type();
            }
            self.sink.warn(
                format!(
                    "Object type \"{}\" is not derived from Object or Component",
                    self.display_name(type_)
                ),
                scope.source_location(),
            );
            return b.script_value_type;
        }

        if self.is_primitive(type_)
            || self.equals(type_, b.script_value_type)
            || self.equals(type_, b.list_property_type)
            || self.equals(type_, b.url_type)
            || self.equals(type_, b.date_time_type)
            || self.equals(type_, b.variant_list_type)
            || self.equals(type_, b.var_type)
            || self.equals(type_, b.string_list_type)
            || self.equals(type_, b.empty_list_type)
            || self.equals(type_, b.byte_array_type)
        {
            return type_;
        }

        if scope.kind() == ScopeKind::EnumScope {
            return b.int_type;
        }

        if self.is_numeric(type_) {
            return b.real_type;
        }

        if scope.access_semantics() == AccessSemantics::Sequence {
            if let Some(value) = scope.value_type() {
                if self.arena.get(value).access_semantics() == AccessSemantics::Reference {
                    return b.object_list_type;
                }
                if self.equals(self.generic_type(value, ComponentIsGeneric::No), b.string_type) {
                    return b.string_list_type;
                }
            }
            return b.variant_list_type;
        }

        b.var_type
    }

    // ========================================================================
    // Tracked types
    // ========================================================================

    /// Hands out a clone of `type_` that can be adjusted as a pass learns
    /// more. Tracking an already tracked type chains back to its original.
    pub fn tracked_type(&mut self, type_: ScopeId) -> ScopeId {
        if self.clone_mode == CloneMode::DoNotCloneTypes {
            return type_;
        }
        let original = self.tracked.get(&type_).map_or(type_, |entry| entry.original);
        let clone = self.arena.clone_scope(original);
        self.tracked.insert(
            clone,
            TrackedType {
                original,
                replacement: None,
                clone,
            },
        );
        debug!(original = original.0, clone = clone.0, "tracking type");
        clone
    }

    /// Overwrites the tracked clone `type_` with `adjusted` and records
    /// the adjusted identity for comparisons. Returns false if `type_` is
    /// not tracked.
    pub fn adjust_tracked_type(&mut self, type_: ScopeId, adjusted: ScopeId) -> bool {
        if self.clone_mode == CloneMode::DoNotCloneTypes {
            return true;
        }
        let replacement = self.comparable_type(adjusted);
        let Some(entry) = self.tracked.get_mut(&type_) else {
            return false;
        };
        entry.replacement = Some(replacement);
        let clone = entry.clone;
        self.arena.overwrite(clone, adjusted);
        true
    }

    /// Adjusts the tracked clone `type_` to the merge of all `origins`.
    /// Rejects the adjustment when no primitive conversion path from the
    /// tracked type to the merged result exists; the new type would be
    /// unreachable from the values already seen.
    pub fn adjust_tracked_type_conversions(&mut self, type_: ScopeId, origins: &[ScopeId]) -> bool {
        if self.clone_mode == CloneMode::DoNotCloneTypes {
            return true;
        }
        let Some(&first) = origins.first() else {
            return false;
        };
        let mut result = first;
        for &origin in &origins[1..] {
            result = self.merge(result, origin);
        }
        if !self.can_primitively_convert_from_to(type_, result) {
            trace!(
                tracked = type_.0,
                result = result.0,
                "rejecting tracked adjustment without a conversion path"
            );
            return false;
        }
        self.adjust_tracked_type(type_, result)
    }

    /// Collapses the tracked clone `type_` and its recorded identities to
    /// their generic types. After this the clone compares equal to the
    /// canonical generalization.
    pub fn generalize_type(&mut self, type_: ScopeId) {
        if self.clone_mode == CloneMode::DoNotCloneTypes {
            return;
        }
        let Some(entry) = self.tracked.get(&type_) else {
            debug_assert!(false, "generalizing an untracked type");
            return;
        };
        let (original, replacement, clone) = (entry.original, entry.replacement, entry.clone);

        let generic = self.generic_type(type_, ComponentIsGeneric::No);
        self.arena.overwrite(clone, generic);

        let original = self.generic_type(original, ComponentIsGeneric::No);
        let replacement = replacement.map(|r| self.generic_type(r, ComponentIsGeneric::No));
        if let Some(entry) = self.tracked.get_mut(&type_) {
            entry.original = original;
            entry.replacement = replacement;
        }
    }

    /// A copy of `origin` in which every type is a fresh tracked clone.
    pub fn tracked_content(&mut self, origin: &RegisterContent) -> RegisterContent {
        let stored = origin.stored_type().map(|t| self.tracked_type(t));
        let scope = origin.scope_type().map(|t| self.tracked_type(t));
        let variant = origin.variant();
        match origin.kind().clone() {
            RegisterKind::None => RegisterContent::invalid(),
            RegisterKind::Type(type_) => {
                let type_ = self.tracked_type(type_);
                RegisterContent::from_type(stored.unwrap_or(type_), type_, variant, scope)
            }
            RegisterKind::Property(mut property) => {
                property.type_ = property.type_.map(|t| self.tracked_type(t));
                RegisterContent::from_property(
                    stored.unwrap_or(self.builtins.var_type),
                    property,
                    variant,
                    scope,
                )
            }
            RegisterKind::Method(methods) => RegisterContent::from_methods(
                stored.unwrap_or(self.builtins.script_value_type),
                methods,
                variant,
                scope,
            ),
            RegisterKind::Enumeration {
                mut enumeration,
                member,
            } => {
                enumeration.type_ = enumeration.type_.map(|t| self.tracked_type(t));
                RegisterContent::from_enumeration(
                    stored.unwrap_or(self.builtins.int_type),
                    enumeration,
                    member,
                    variant,
                    scope,
                )
            }
            RegisterKind::ImportNamespace(prefix) => RegisterContent::from_import_namespace(
                stored.unwrap_or(self.builtins.script_value_type),
                prefix,
                variant,
                scope,
            ),
            RegisterKind::Conversion { origins, result } => {
                let result = self.tracked_type(result);
                RegisterContent::from_conversion(
                    stored.unwrap_or_else(|| self.stored_type(result)),
                    origins,
                    result,
                    variant,
                    scope,
                )
            }
        }
    }

    /// A copy of `origin` in which every tracked clone is replaced by the
    /// type it was cloned from.
    pub fn original_content(&self, origin: &RegisterContent) -> RegisterContent {
        let stored = origin.stored_type().map(|t| self.original_type(t));
        let scope = origin.scope_type().map(|t| self.original_type(t));
        let variant = origin.variant();
        match origin.kind().clone() {
            RegisterKind::None => RegisterContent::invalid(),
            RegisterKind::Type(type_) => {
                let type_ = self.original_type(type_);
                RegisterContent::from_type(stored.unwrap_or(type_), type_, variant, scope)
            }
            RegisterKind::Property(mut property) => {
                property.type_ = property.type_.map(|t| self.original_type(t));
                RegisterContent::from_property(
                    stored.unwrap_or(self.builtins.var_type),
                    property,
                    variant,
                    scope,
                )
            }
            RegisterKind::Method(methods) => RegisterContent::from_methods(
                stored.unwrap_or(self.builtins.script_value_type),
                methods,
                variant,
                scope,
            ),
            RegisterKind::Enumeration {
                mut enumeration,
                member,
            } => {
                enumeration.type_ = enumeration.type_.map(|t| self.original_type(t));
                RegisterContent::from_enumeration(
                    stored.unwrap_or(self.builtins.int_type),
                    enumeration,
                    member,
                    variant,
                    scope,
                )
            }
            RegisterKind::ImportNamespace(prefix) => RegisterContent::from_import_namespace(
                stored.unwrap_or(self.builtins.script_value_type),
                prefix,
                variant,
                scope,
            ),
            RegisterKind::Conversion { origins, result } => {
                let result = self.original_type(result);
                RegisterContent::from_conversion(
                    stored.unwrap_or_else(|| self.stored_type(result)),
                    origins,
                    result,
                    variant,
                    scope,
                )
            }
        }
    }
}
