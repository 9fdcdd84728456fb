//! Name and member lookup over bound documents: ids, scope properties,
//! enums, attached types, import namespaces and revision gating.

use rustc_hash::FxHashSet;

use quill_binder::ast::{
    Binding, BindingValue, Document, Expression, Import, Literal, Member, ObjectDefinition,
    PropertyMember, Statement,
};
use quill_binder::{
    materialize_types, BindResult, MetaMethod, MetaProperty, MethodKind, ScopeArena, ScopeFlags,
    ScopeGraphBuilder, ScopeId, ScopeKind, ScopesById, TypeDescriptor,
};
use quill_common::{SourceLocation, TypeRevision};
use quill_resolver::{
    default_catalogue, register_aliases, BinaryOperator, ContentVariant, TypeResolver,
};

fn loc(line: u32) -> SourceLocation {
    SourceLocation::new(0, 0, line, 1)
}

fn fixture_types() -> Vec<(String, TypeDescriptor)> {
    let mut rectangle = TypeDescriptor::new("Rectangle");
    rectangle.base_type_name = "Object".into();
    rectangle.is_creatable = true;
    rectangle.properties = vec![
        MetaProperty::with_type("width", "double"),
        MetaProperty::with_type("height", "double"),
    ];
    let mut clicked = MetaMethod::new("clicked", MethodKind::Signal);
    clicked.add_parameter("pos", "var");
    rectangle.methods = vec![clicked];
    let mut direction = quill_binder::MetaEnum::new("Direction");
    direction.add_key("Up", 0);
    direction.add_key("Down", 1);
    rectangle.enumerations = vec![direction];

    let mut text = TypeDescriptor::new("Text");
    text.base_type_name = "Object".into();
    text.is_creatable = true;
    text.properties = vec![MetaProperty::with_type("text", "string")];

    let mut keys = TypeDescriptor::new("Keys");
    keys.base_type_name = "Object".into();
    keys.attached_type_name = "KeysAttached".into();

    let mut keys_attached = TypeDescriptor::new("KeysAttached");
    keys_attached.base_type_name = "Object".into();
    keys_attached.properties = vec![MetaProperty::with_type("enabled", "bool")];

    let mut widget = TypeDescriptor::new("Widget");
    widget.base_type_name = "Object".into();
    let mut modern = MetaProperty::with_type("modern", "int");
    modern.revision = TypeRevision::from_version(2, 0);
    let classic = MetaProperty::with_type("classic", "int");
    widget.properties = vec![modern, classic];

    let mut button = TypeDescriptor::new("Button");
    button.base_type_name = "Object".into();
    button.is_creatable = true;

    vec![
        ("Rectangle".to_owned(), rectangle),
        ("Text".to_owned(), text),
        ("Keys".to_owned(), keys),
        ("KeysAttached".to_owned(), keys_attached),
        ("Widget".to_owned(), widget),
        ("Ctrl.Button".to_owned(), button),
    ]
}

fn resolver_for(document: &Document) -> TypeResolver {
    let mut arena = ScopeArena::new();
    let mut catalogue: Vec<(String, TypeDescriptor)> = default_catalogue().into_iter().collect();
    catalogue.extend(fixture_types());
    let mut types = materialize_types(&mut arena, catalogue);
    register_aliases(&mut types);
    TypeResolver::new(ScopeGraphBuilder::new(arena, types).build(document))
}

fn document(root: ObjectDefinition) -> Document {
    Document {
        imports: Vec::new(),
        root,
    }
}

fn object(type_name: &str, members: Vec<Member>) -> ObjectDefinition {
    ObjectDefinition {
        type_name: type_name.to_owned(),
        members,
        location: loc(1),
    }
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_owned(), loc(1))
}

fn script(expression: Expression) -> BindingValue {
    BindingValue::Script(Statement::Expression(expression))
}

fn binding(path: &[&str], value: BindingValue) -> Member {
    Member::Binding(Binding {
        path: path.iter().map(|s| (*s).to_owned()).collect(),
        value,
        location: loc(1),
    })
}

fn id_binding(name: &str) -> Member {
    binding(&["id"], script(ident(name)))
}

fn handler_scope(resolver: &TypeResolver) -> ScopeId {
    resolver
        .arena()
        .get(resolver.root())
        .children()
        .iter()
        .copied()
        .find(|&c| resolver.arena().get(c).kind() == ScopeKind::FunctionScope)
        .expect("binding opens a function scope")
}

#[test]
fn id_reference_and_member_arithmetic_settle_on_a_number() {
    let resolver = resolver_for(&document(object(
        "Rectangle",
        vec![
            id_binding("r"),
            binding(&["width"], script(Expression::Literal(Literal::Int(10), loc(2)))),
        ],
    )));
    let b = resolver.builtins().clone();

    let scoped = resolver.scoped_type(resolver.root(), "r");
    assert_eq!(scoped.variant(), ContentVariant::ObjectById);
    assert_eq!(resolver.contained_type(&scoped), Some(resolver.root()));

    let width = resolver.member_type(&scoped, "width");
    assert!(width.is_property());
    assert!(resolver.equals(resolver.contained_type(&width).unwrap(), b.real_type));

    // r.width + 5 is numeric.
    let sum = resolver.type_for_binary_operation(
        BinaryOperator::Add,
        &width,
        &resolver.builtin_type(b.int_type),
    );
    assert!(resolver.equals(resolver.contained_type(&sum).unwrap(), b.real_type));
}

#[test]
fn scope_properties_resolve_unqualified() {
    let resolver = resolver_for(&document(object("Rectangle", vec![])));
    let b = resolver.builtins().clone();

    let width = resolver.scoped_type(resolver.root(), "width");
    assert_eq!(width.variant(), ContentVariant::ScopeProperty);
    assert!(resolver.equals(resolver.contained_type(&width).unwrap(), b.real_type));

    let clicked = resolver.scoped_type(resolver.root(), "clicked");
    assert_eq!(clicked.variant(), ContentVariant::ScopeMethod);
    assert_eq!(clicked.methods().len(), 1);
    assert_eq!(clicked.methods()[0].name, "clicked");

    assert!(!resolver.scoped_type(resolver.root(), "nonexistent").is_valid());
}

#[test]
fn alias_property_carries_the_target_type() {
    let resolver = resolver_for(&document(object(
        "Rectangle",
        vec![
            Member::Property(PropertyMember {
                name: "label".to_owned(),
                type_name: "alias".to_owned(),
                is_list: false,
                is_readonly: false,
                binding: Some(script(Expression::Member {
                    base: Box::new(ident("inner")),
                    name: "text".to_owned(),
                    location: loc(2),
                })),
                location: loc(2),
            }),
            Member::Child(object("Text", vec![id_binding("inner")])),
        ],
    )));
    let b = resolver.builtins().clone();

    let label = resolver.scoped_type(resolver.root(), "label");
    assert_eq!(label.variant(), ContentVariant::ScopeProperty);
    assert!(resolver.equals(resolver.contained_type(&label).unwrap(), b.string_type));
}

#[test]
fn enums_require_qualification() {
    let resolver = resolver_for(&document(object("Rectangle", vec![])));
    let b = resolver.builtins().clone();

    // Unqualified enum keys never resolve.
    assert!(!resolver.scoped_type(resolver.root(), "Up").is_valid());

    let metatype = resolver.scoped_type(resolver.root(), "Rectangle");
    assert_eq!(metatype.variant(), ContentVariant::MetaType);

    let key = resolver.member_type(&metatype, "Up");
    assert!(key.is_enumeration());
    assert_eq!(key.enum_member(), Some("Up"));
    assert!(resolver.equals(resolver.contained_type(&key).unwrap(), b.int_type));

    let group = resolver.member_type(&metatype, "Direction");
    assert!(group.is_enumeration());
    assert_eq!(group.enum_member(), None);

    let down = resolver.member_type(&group, "Down");
    assert_eq!(down.enum_member(), Some("Down"));
    assert!(!resolver.member_type(&group, "Sideways").is_valid());

    // Lower case names cannot be enum lookups.
    assert!(!resolver.member_type(&metatype, "up").is_valid());
}

#[test]
fn attached_types_resolve_by_name_and_expose_their_members() {
    let resolver = resolver_for(&document(object("Rectangle", vec![])));
    let b = resolver.builtins().clone();
    let keys_attached = resolver.type_for_name("KeysAttached").unwrap();

    let keys = resolver.scoped_type(resolver.root(), "Keys");
    assert_eq!(keys.variant(), ContentVariant::ScopeAttached);
    assert_eq!(resolver.contained_type(&keys), Some(keys_attached));

    let enabled = resolver.member_type(&keys, "enabled");
    assert!(enabled.is_property());
    assert!(resolver.equals(resolver.contained_type(&enabled).unwrap(), b.bool_type));
}

#[test]
fn import_namespaces_pivot_into_qualified_names() {
    let resolver = resolver_for(&Document {
        imports: vec![Import {
            uri: "Controls".to_owned(),
            version: TypeRevision::from_version(1, 0),
            qualifier: Some("Ctrl".to_owned()),
            location: loc(1),
        }],
        root: object("Rectangle", vec![]),
    });

    let namespace = resolver.scoped_type(resolver.root(), "Ctrl");
    assert!(namespace.is_import_namespace());
    assert_eq!(namespace.variant(), ContentVariant::ScopeModulePrefix);

    let button = resolver.member_type(&namespace, "Button");
    assert_eq!(button.variant(), ContentVariant::MetaType);
    assert_eq!(button.scope_type(), resolver.type_for_name("Ctrl.Button"));

    assert!(!resolver.member_type(&namespace, "Missing").is_valid());
}

#[test]
fn the_global_object_backs_unresolved_names() {
    let resolver = resolver_for(&document(object("Rectangle", vec![])));
    let b = resolver.builtins().clone();

    let parse_int = resolver.scoped_type(resolver.root(), "parseInt");
    assert_eq!(parse_int.variant(), ContentVariant::ScriptGlobal);
    assert!(parse_int.is_method());

    let nan = resolver.scoped_type(resolver.root(), "NaN");
    assert_eq!(nan.variant(), ContentVariant::ScriptGlobal);
    assert!(resolver.equals(resolver.contained_type(&nan).unwrap(), b.real_type));
}

#[test]
fn signal_handler_parameters_are_visible_inside_the_handler() {
    let resolver = resolver_for(&document(object(
        "Rectangle",
        vec![binding(&["onClicked"], script(ident("pos")))],
    )));
    let b = resolver.builtins().clone();

    let handler = handler_scope(&resolver);
    let pos = resolver.scoped_type(handler, "pos");
    assert_eq!(pos.variant(), ContentVariant::ScriptObject);
    assert!(resolver.equals(resolver.contained_type(&pos).unwrap(), b.script_value_type));

    // The parameter does not leak out of the handler.
    assert!(!resolver.scoped_type(resolver.root(), "pos").is_valid());
}

#[test]
fn strings_and_sequences_have_a_length() {
    let resolver = resolver_for(&document(object("Rectangle", vec![])));
    let b = resolver.builtins().clone();

    let on_string = resolver.member_type(&resolver.global_type(b.string_type), "length");
    assert!(on_string.is_property());
    assert!(resolver.equals(resolver.contained_type(&on_string).unwrap(), b.int_type));

    let on_list = resolver.member_type(&resolver.global_type(b.string_list_type), "length");
    assert!(resolver.equals(resolver.contained_type(&on_list).unwrap(), b.int_type));

    assert!(!resolver.member_type(&resolver.global_type(b.int_type), "length").is_valid());
}

fn widget_resolver(revision: TypeRevision) -> TypeResolver {
    let mut arena = ScopeArena::new();
    let mut catalogue: Vec<(String, TypeDescriptor)> = default_catalogue().into_iter().collect();
    catalogue.extend(fixture_types());
    let mut types = materialize_types(&mut arena, catalogue);
    register_aliases(&mut types);

    let scope = arena.create(ScopeKind::ObjectScope, None);
    {
        let scope = arena.get_mut(scope);
        scope.set_base_type_name("Widget");
        scope.set_base_type(types.get("Widget").copied());
        scope.set_base_type_revision(revision);
        scope.set_flag(ScopeFlags::COMPOSITE, true);
        scope.set_flag(ScopeFlags::COMPONENT_ROOT, true);
    }

    TypeResolver::new(BindResult {
        arena,
        root: scope,
        global: scope,
        ids: ScopesById::new(),
        imports: types,
        import_qualifiers: FxHashSet::default(),
        diagnostics: Vec::new(),
    })
}

#[test]
fn revisioned_members_are_gated_by_the_imported_revision() {
    let old = widget_resolver(TypeRevision::from_version(1, 0));
    assert!(!old.scoped_type(old.root(), "modern").is_valid());
    assert!(old.scoped_type(old.root(), "classic").is_valid());

    let new = widget_resolver(TypeRevision::from_version(2, 0));
    assert!(new.scoped_type(new.root(), "modern").is_valid());

    // Without a recorded base revision nothing can be said about the
    // member, so it stays hidden. Unrevisioned members are unaffected.
    let unversioned = widget_resolver(TypeRevision::none());
    assert!(!unversioned.scoped_type(unversioned.root(), "modern").is_valid());
    assert!(unversioned.scoped_type(unversioned.root(), "classic").is_valid());

    // The initial 0.0 import hides every revisioned member.
    let zero = widget_resolver(TypeRevision::zero());
    assert!(!zero.scoped_type(zero.root(), "modern").is_valid());
}
