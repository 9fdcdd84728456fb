//! The scope graph builder.
//!
//! One top-down walk over the document creates the scope tree, records
//! declared members and ids, and resolves named types against the imported
//! type mapping. A breadth-first pass over the finished tree then resolves
//! alias properties through the id index.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use quill_common::{Diagnostic, DiagnosticSink, SourceLocation};

use crate::ast::{
    Binding, BindingValue, Document, Expression, FunctionDeclaration, Member, ObjectDefinition,
    Statement, VariableScope,
};
use crate::meta::{MetaMethod, MetaProperty, MethodKind};
use crate::scope::{
    ScopeArena, ScopeFlags, ScopeId, ScopeKind, ScriptIdentifier, ScriptIdentifierKind,
};
use crate::scopes_by_id::ScopesById;

/// Bound on syntactic nesting. Exceeding it aborts the offending subtree
/// with a diagnostic; sibling subtrees still process.
pub const MAX_RECURSION_DEPTH: usize = 1024;

/// The reserved property binding an object's id: `id: root`.
const ID_PROPERTY: &str = "id";

/// Base type name that roots an inline component.
const COMPONENT_TYPE: &str = "Component";

/// Everything the builder produces: the populated arena, the exported root
/// scope, the id index, and the accumulated diagnostics.
#[derive(Debug)]
pub struct BindResult {
    pub arena: ScopeArena,
    pub root: ScopeId,
    pub global: ScopeId,
    pub ids: ScopesById,
    pub imports: FxHashMap<String, ScopeId>,
    pub import_qualifiers: FxHashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ScopeGraphBuilder {
    arena: ScopeArena,
    imports: FxHashMap<String, ScopeId>,
    import_qualifiers: FxHashSet<String>,
    current: ScopeId,
    global: ScopeId,
    root: Option<ScopeId>,
    ids: ScopesById,
    sink: DiagnosticSink,
    depth: usize,
}

impl ScopeGraphBuilder {
    /// `imports` is the name-to-type mapping supplied by the external
    /// import resolution, typically built with
    /// [`crate::import::materialize_types`] over the same arena.
    pub fn new(mut arena: ScopeArena, imports: FxHashMap<String, ScopeId>) -> Self {
        let global = arena.create(ScopeKind::FunctionScope, None);
        arena.get_mut(global).set_flag(ScopeFlags::COMPOSITE, true);
        Self {
            arena,
            imports,
            import_qualifiers: FxHashSet::default(),
            current: global,
            global,
            root: None,
            ids: ScopesById::new(),
            sink: DiagnosticSink::new(),
            depth: 0,
        }
    }

    pub fn build(mut self, document: &Document) -> BindResult {
        for import in &document.imports {
            if let Some(qualifier) = &import.qualifier {
                self.import_qualifiers.insert(qualifier.clone());
            }
        }

        self.visit_object(&document.root);
        self.resolve_aliases();

        let root = self.root.unwrap_or(self.global);
        debug!(scopes = self.arena.len(), "scope graph built");
        BindResult {
            arena: self.arena,
            root,
            global: self.global,
            ids: self.ids,
            imports: self.imports,
            import_qualifiers: self.import_qualifiers,
            diagnostics: self.sink.take(),
        }
    }

    // Scope stack management.

    fn enter_environment(&mut self, kind: ScopeKind, name: &str, location: SourceLocation) {
        let scope = self.arena.create(kind, Some(self.current));
        {
            let scope = self.arena.get_mut(scope);
            match kind {
                ScopeKind::GroupedPropertyScope | ScopeKind::AttachedPropertyScope => {
                    scope.set_internal_name(name);
                }
                _ => scope.set_base_type_name(name),
            }
            scope.set_flag(ScopeFlags::COMPOSITE, true);
            scope.set_source_location(location);
        }
        self.current = scope;
    }

    fn leave_environment(&mut self) {
        if let Some(parent) = self.arena.get(self.current).parent() {
            self.current = parent;
        }
    }

    fn enter_recursion(&mut self, location: SourceLocation) -> bool {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            self.depth -= 1;
            self.sink
                .error("Maximum statement or expression depth exceeded", location);
            return false;
        }
        true
    }

    fn leave_recursion(&mut self) {
        self.depth -= 1;
    }

    // Objects.

    fn visit_object(&mut self, definition: &ObjectDefinition) -> Option<ScopeId> {
        if !self.enter_recursion(definition.location) {
            return None;
        }

        let enclosing_object = self.arena.find_current_object_scope(self.current);
        self.enter_environment(ScopeKind::ObjectScope, &definition.type_name, definition.location);
        let scope = self.current;

        if self.root.is_none() {
            self.root = Some(scope);
            self.arena
                .get_mut(scope)
                .set_flag(ScopeFlags::COMPONENT_ROOT, true);
        } else if let Some(wrapper) = enclosing_object {
            // An object directly inside a `Component` roots a new component
            // for id lookup.
            if self.arena.get(wrapper).base_type_name() == COMPONENT_TYPE {
                self.arena
                    .get_mut(scope)
                    .set_flag(ScopeFlags::COMPONENT_ROOT, true);
            }
        }

        if !definition.type_name.is_empty() && !self.imports.contains_key(&definition.type_name) {
            self.sink.warn(
                format!("Unknown type \"{}\"", definition.type_name),
                definition.location,
            );
        }
        self.arena.resolve_types(scope, &self.imports);

        for member in &definition.members {
            self.visit_member(member);
        }

        self.arena.resolve_types(scope, &self.imports);
        self.leave_environment();
        self.leave_recursion();
        Some(scope)
    }

    fn visit_member(&mut self, member: &Member) {
        match member {
            Member::Property(property) => self.visit_property_member(property),
            Member::Signal(signal) => {
                let mut method = MetaMethod::new(&signal.name, MethodKind::Signal);
                for parameter in &signal.parameters {
                    method.add_parameter(
                        &parameter.name,
                        parameter.type_name.as_deref().unwrap_or("var"),
                    );
                }
                self.arena.get_mut(self.current).add_own_method(method);
            }
            Member::Enum(declaration) => {
                let mut enumeration = crate::meta::MetaEnum::new(&declaration.name);
                for (key, value) in &declaration.members {
                    enumeration.add_key(key, *value);
                }
                self.arena
                    .get_mut(self.current)
                    .add_own_enumeration(enumeration);
            }
            Member::Function(function) => self.visit_function(function),
            Member::Binding(binding) => self.visit_binding(binding),
            Member::Child(child) => {
                self.visit_object(child);
            }
        }
    }

    fn visit_property_member(&mut self, declaration: &crate::ast::PropertyMember) {
        let is_alias = declaration.type_name == "alias";

        let mut property = MetaProperty::new(&declaration.name);
        property.is_list = declaration.is_list;
        property.is_writable = !declaration.is_readonly;
        property.is_alias = is_alias;

        if is_alias {
            // The alias target is the binding expression; keep it textual
            // until the alias resolution pass.
            let target = declaration
                .binding
                .as_ref()
                .and_then(|value| match value {
                    BindingValue::Script(statement) => statement.as_expression(),
                    BindingValue::Object(_) => None,
                })
                .and_then(alias_target);
            property.type_name = target.unwrap_or_else(|| declaration.type_name.clone());
        } else if let Some(&resolved) = self.imports.get(&declaration.type_name) {
            property.type_ = Some(resolved);
            let internal = self.arena.get(resolved).internal_name();
            property.type_name = if internal.is_empty() {
                declaration.type_name.clone()
            } else {
                internal.to_owned()
            };
        } else {
            property.type_name = declaration.type_name.clone();
        }

        self.arena.insert_property_identifier(self.current, property);

        match &declaration.binding {
            Some(BindingValue::Script(statement)) if !is_alias => {
                self.visit_script_binding_value(statement, None);
            }
            Some(BindingValue::Object(object)) => {
                let child = self.visit_object(object);
                if let Some(child) = child {
                    if let Some(property) = self
                        .arena
                        .get_mut(self.current)
                        .own_property_mut(&declaration.name)
                    {
                        property.type_ = Some(child);
                        property.is_pointer = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, function: &FunctionDeclaration) {
        if !self.enter_recursion(function.location) {
            return;
        }

        let name = if function.name.is_empty() {
            "<anon>".to_owned()
        } else {
            function.name.clone()
        };

        if !function.name.is_empty() {
            let mut method = MetaMethod::new(&function.name, MethodKind::Method);
            for parameter in &function.parameters {
                method.add_parameter(
                    &parameter.name,
                    parameter.type_name.as_deref().unwrap_or("var"),
                );
            }
            method.return_type_name = function
                .return_type_name
                .clone()
                .unwrap_or_else(|| "var".to_owned());
            self.arena.get_mut(self.current).add_own_method(method);

            if self.arena.get(self.current).kind() != ScopeKind::ObjectScope {
                self.arena.insert_script_identifier(
                    self.current,
                    &function.name,
                    ScriptIdentifier {
                        kind: ScriptIdentifierKind::LexicalScoped,
                        location: function.location,
                    },
                );
            }
        }

        self.enter_environment(ScopeKind::FunctionScope, &name, function.location);
        for parameter in &function.parameters {
            self.arena.insert_script_identifier(
                self.current,
                &parameter.name,
                ScriptIdentifier {
                    kind: ScriptIdentifierKind::Parameter,
                    location: parameter.location,
                },
            );
        }
        for statement in &function.body {
            self.visit_statement(statement);
        }
        self.leave_environment();
        self.leave_recursion();
    }

    // Bindings.

    fn visit_binding(&mut self, binding: &Binding) {
        if binding.path.len() == 1 && binding.path[0] == ID_PROPERTY {
            self.visit_id_binding(binding);
            return;
        }

        // All but the terminal segment open auxiliary scopes: attached for
        // upper-case segments, grouped otherwise.
        for segment in &binding.path[..binding.path.len().saturating_sub(1)] {
            if segment.is_empty() {
                break;
            }
            let kind = if segment.chars().next().is_some_and(char::is_uppercase) {
                ScopeKind::AttachedPropertyScope
            } else {
                ScopeKind::GroupedPropertyScope
            };
            self.enter_environment(kind, segment, binding.location);
        }

        while matches!(
            self.arena.get(self.current).kind(),
            ScopeKind::GroupedPropertyScope | ScopeKind::AttachedPropertyScope
        ) {
            self.leave_environment();
        }

        let terminal = binding.path.last().map(String::as_str).unwrap_or_default();
        match &binding.value {
            BindingValue::Script(statement) => {
                self.visit_script_binding_value(statement, signal_name(terminal));
            }
            BindingValue::Object(object) => {
                let mut property = MetaProperty::with_type(terminal, &object.type_name);
                property.is_pointer = true;
                if let Some(&resolved) = self.imports.get(&object.type_name) {
                    property.type_ = Some(resolved);
                }
                self.arena.get_mut(self.current).add_own_property(property);

                let child = self.visit_object(object);
                if let Some(child) = child {
                    if let Some(property) =
                        self.arena.get_mut(self.current).own_property_mut(terminal)
                    {
                        property.type_ = Some(child);
                    }
                }
            }
        }
    }

    fn visit_id_binding(&mut self, binding: &Binding) {
        let name = match &binding.value {
            BindingValue::Script(statement) => match statement.as_expression() {
                Some(Expression::Identifier(name, _)) => name.clone(),
                _ => {
                    self.sink
                        .error("id must be followed by an identifier", binding.location);
                    return;
                }
            },
            BindingValue::Object(_) => {
                self.sink
                    .error("id must be followed by an identifier", binding.location);
                return;
            }
        };

        let object = self
            .arena
            .find_current_object_scope(self.current)
            .unwrap_or(self.current);

        if self.ids.scope(&name, object, &self.arena).is_some() {
            // First binding wins.
            self.sink.error(
                format!("Duplicate id \"{name}\" in the same component"),
                binding.location,
            );
            return;
        }
        self.ids.insert(name, object);
    }

    /// Script binding values get a synthetic function scope unless the
    /// expression is itself a function definition, which opens its own.
    /// Signal handlers additionally see the signal's parameters as
    /// injected identifiers.
    fn visit_script_binding_value(&mut self, statement: &Statement, handled_signal: Option<String>) {
        if let Some(Expression::Function(function)) = statement.as_expression() {
            self.visit_function(function);
            return;
        }

        self.enter_environment(
            ScopeKind::FunctionScope,
            "binding",
            statement_location(statement),
        );

        if let Some(signal) = handled_signal {
            if let Some(object) = self.arena.find_current_object_scope(self.current) {
                let parameters: Vec<String> = self
                    .arena
                    .methods(object, &signal)
                    .iter()
                    .filter(|method| method.kind == MethodKind::Signal)
                    .flat_map(|method| method.parameters.iter().map(|(name, _)| name.clone()))
                    .collect();
                for parameter in parameters {
                    self.arena.insert_script_identifier(
                        self.current,
                        parameter,
                        ScriptIdentifier {
                            kind: ScriptIdentifierKind::Injected,
                            location: statement_location(statement),
                        },
                    );
                }
            }
        }

        self.visit_statement(statement);
        self.leave_environment();
    }

    // Statements and expressions.

    fn visit_statement(&mut self, statement: &Statement) {
        if !self.enter_recursion(statement_location(statement)) {
            return;
        }

        match statement {
            Statement::Block(statements, location) => {
                self.enter_environment(ScopeKind::LexicalScope, "block", *location);
                for statement in statements {
                    self.visit_statement(statement);
                }
                self.leave_environment();
            }
            Statement::Variable(declarations) => {
                for declaration in declarations {
                    let kind = if declaration.scope == VariableScope::Var {
                        ScriptIdentifierKind::FunctionScoped
                    } else {
                        ScriptIdentifierKind::LexicalScoped
                    };
                    self.arena.insert_script_identifier(
                        self.current,
                        &declaration.name,
                        ScriptIdentifier {
                            kind,
                            location: declaration.location,
                        },
                    );
                    if let Some(initializer) = &declaration.initializer {
                        self.visit_expression(initializer);
                    }
                }
            }
            Statement::Expression(expression) => self.visit_expression(expression),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expression(condition);
                self.visit_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_statement(else_branch);
                }
            }
            Statement::For { body, location } => {
                self.enter_environment(ScopeKind::LexicalScope, "forloop", *location);
                self.visit_statement(body);
                self.leave_environment();
            }
            Statement::ForEach {
                declaration,
                iterable,
                body,
                location,
            } => {
                self.visit_expression(iterable);
                self.enter_environment(ScopeKind::LexicalScope, "foreachloop", *location);
                self.arena.insert_script_identifier(
                    self.current,
                    &declaration.name,
                    ScriptIdentifier {
                        kind: ScriptIdentifierKind::LexicalScoped,
                        location: declaration.location,
                    },
                );
                self.visit_statement(body);
                self.leave_environment();
            }
            Statement::Case {
                discriminant,
                body,
                location,
            } => {
                self.visit_expression(discriminant);
                self.enter_environment(ScopeKind::LexicalScope, "case", *location);
                for statement in body {
                    self.visit_statement(statement);
                }
                self.leave_environment();
            }
            Statement::Catch {
                parameter,
                body,
                location,
            } => {
                self.enter_environment(ScopeKind::LexicalScope, "catch", *location);
                self.arena.insert_script_identifier(
                    self.current,
                    &parameter.name,
                    ScriptIdentifier {
                        kind: ScriptIdentifierKind::LexicalScoped,
                        location: parameter.location,
                    },
                );
                self.visit_statement(body);
                self.leave_environment();
            }
            Statement::With {
                object,
                body,
                location,
            } => {
                self.visit_expression(object);
                self.enter_environment(ScopeKind::LexicalScope, "with", *location);
                self.visit_statement(body);
                self.leave_environment();
            }
            Statement::Return(Some(expression)) => self.visit_expression(expression),
            Statement::Return(None) | Statement::Empty => {}
        }

        self.leave_recursion();
    }

    fn visit_expression(&mut self, expression: &Expression) {
        if !self.enter_recursion(expression.location()) {
            return;
        }

        match expression {
            Expression::Identifier(..) | Expression::Literal(..) => {}
            Expression::Member { base, .. } => self.visit_expression(base),
            Expression::Call {
                callee, arguments, ..
            } => {
                self.visit_expression(callee);
                for argument in arguments {
                    self.visit_expression(argument);
                }
            }
            Expression::Binary { left, right, .. } => {
                self.visit_expression(left);
                self.visit_expression(right);
            }
            Expression::Unary { operand, .. } => self.visit_expression(operand),
            Expression::Array(items, _) => {
                for item in items {
                    self.visit_expression(item);
                }
            }
            Expression::Function(function) => self.visit_function(function),
        }

        self.leave_recursion();
    }

    // Alias resolution: post-order over the finished tree, breadth first.

    fn resolve_aliases(&mut self) {
        let Some(root) = self.root else {
            return;
        };

        let mut objects = VecDeque::from([root]);
        while let Some(object) = objects.pop_front() {
            let aliases: Vec<MetaProperty> = self
                .arena
                .get(object)
                .own_properties()
                .filter(|p| p.is_alias)
                .cloned()
                .collect();

            for mut property in aliases {
                if let Some((type_, type_name)) = self.resolve_alias_target(object, &property.type_name)
                {
                    property.type_ = type_;
                    if let Some(name) = type_name {
                        property.type_name = name;
                    }
                    self.arena.get_mut(object).add_own_property(property);
                }
                // Unresolved aliases keep their textual target so the type
                // resolver can report them.
            }

            for &child in self.arena.get(object).children() {
                objects.push_back(child);
            }
        }
    }

    /// Resolves `target` ("someId" or "someId.property...") relative to
    /// `referrer`. Returns the resolved type and its display name.
    fn resolve_alias_target(
        &self,
        referrer: ScopeId,
        target: &str,
    ) -> Option<(Option<ScopeId>, Option<String>)> {
        let mut segments = target.split('.');
        let id = segments.next()?;
        if id.is_empty() {
            return None;
        }

        let mut scope = self.ids.scope(id, referrer, &self.arena)?;
        let mut resolved: Option<ScopeId> = Some(scope);
        let mut name = {
            let scope = self.arena.get(scope);
            if scope.internal_name().is_empty() {
                scope.base_type_name().to_owned()
            } else {
                scope.internal_name().to_owned()
            }
        };

        for segment in segments {
            let property = self.arena.property(scope, segment)?.clone();
            resolved = property.type_;
            name = property.type_name.clone();
            match property.type_ {
                Some(next) => scope = next,
                None => break,
            }
        }

        let name = if name.is_empty() { None } else { Some(name) };
        Some((resolved, name))
    }
}

/// Extracts the textual alias target from an alias binding expression:
/// a plain identifier or a dotted member chain.
fn alias_target(expression: &Expression) -> Option<String> {
    match expression {
        Expression::Identifier(name, _) => Some(name.clone()),
        Expression::Member { base, name, .. } => {
            alias_target(base).map(|prefix| format!("{prefix}.{name}"))
        }
        _ => None,
    }
}

/// `onClicked` handles `clicked`; anything else is not a handler.
fn signal_name(property: &str) -> Option<String> {
    let rest = property.strip_prefix("on")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(first.to_lowercase().collect::<String>() + chars.as_str())
}

fn statement_location(statement: &Statement) -> SourceLocation {
    match statement {
        Statement::Block(_, location)
        | Statement::For { location, .. }
        | Statement::ForEach { location, .. }
        | Statement::Case { location, .. }
        | Statement::Catch { location, .. }
        | Statement::With { location, .. } => *location,
        Statement::Expression(expression) => expression.location(),
        Statement::Variable(declarations) => declarations
            .first()
            .map(|d| d.location)
            .unwrap_or_default(),
        Statement::If { condition, .. } => condition.location(),
        Statement::Return(Some(expression)) => expression.location(),
        Statement::Return(None) | Statement::Empty => SourceLocation::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_name_for_handlers() {
        assert_eq!(signal_name("onClicked"), Some("clicked".to_owned()));
        assert_eq!(signal_name("onWidthChanged"), Some("widthChanged".to_owned()));
        assert_eq!(signal_name("once"), None);
        assert_eq!(signal_name("width"), None);
    }
}
