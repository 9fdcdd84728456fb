//! Checks for the type lattice: merging, convertibility, operator typing
//! and the tracked-type overlay.

use quill_binder::ast::{Document, ObjectDefinition};
use quill_binder::{
    materialize_types, AccessSemantics, MetaProperty, ScopeArena, ScopeGraphBuilder, ScopeId,
    TypeDescriptor,
};
use quill_common::SourceLocation;
use quill_resolver::{
    default_catalogue, register_aliases, BinaryOperator, CloneMode, ComponentIsGeneric,
    TypeResolver, UnaryOperator,
};

fn fixture_types() -> Vec<(String, TypeDescriptor)> {
    let mut rectangle = TypeDescriptor::new("Rectangle");
    rectangle.base_type_name = "Object".into();
    rectangle.is_creatable = true;
    rectangle.properties = vec![
        MetaProperty::with_type("width", "double"),
        MetaProperty::with_type("height", "double"),
    ];

    vec![
        ("Rectangle".to_owned(), rectangle),
        (
            "color".to_owned(),
            TypeDescriptor::with_semantics("color", AccessSemantics::Value),
        ),
    ]
}

fn resolver() -> TypeResolver {
    let mut arena = ScopeArena::new();
    let mut catalogue: Vec<(String, TypeDescriptor)> = default_catalogue().into_iter().collect();
    catalogue.extend(fixture_types());
    let mut types = materialize_types(&mut arena, catalogue);
    register_aliases(&mut types);

    let document = Document {
        imports: Vec::new(),
        root: ObjectDefinition {
            type_name: "Rectangle".to_owned(),
            members: Vec::new(),
            location: SourceLocation::new(0, 0, 1, 1),
        },
    };
    TypeResolver::new(ScopeGraphBuilder::new(arena, types).build(&document))
}

#[test]
fn merge_is_reflexive_and_absorbs_into_dynamic_types() {
    let r = resolver();
    let b = r.builtins().clone();

    assert!(r.equals(r.merge(b.int_type, b.int_type), b.int_type));
    assert!(r.equals(r.merge(b.int_type, b.var_type), b.var_type));
    assert!(r.equals(r.merge(b.string_type, b.script_value_type), b.script_value_type));
}

#[test]
fn merge_widens_numerics() {
    let r = resolver();
    let b = r.builtins().clone();

    assert!(r.equals(r.merge(b.int_type, b.real_type), b.real_type));
    assert!(r.equals(r.merge(b.uint_type, b.float_type), b.real_type));
    assert!(r.equals(r.merge(b.bool_type, b.int_type), b.int_type));
    assert!(r.equals(r.merge(b.bool_type, b.uint_type), b.uint_type));
}

#[test]
fn merge_of_unrelated_primitives_is_the_primitive_box() {
    let r = resolver();
    let b = r.builtins().clone();

    let merged = r.merge(b.string_type, b.bool_type);
    assert!(r.equals(merged, b.primitive_type));
}

#[test]
fn integers_merge_with_strings_to_string() {
    let r = resolver();
    let b = r.builtins().clone();

    assert!(r.equals(r.merge(b.int_type, b.string_type), b.string_type));
    assert!(r.equals(r.merge(b.string_type, b.uint_type), b.string_type));
    // Non-integral numbers box instead.
    assert!(r.equals(r.merge(b.real_type, b.string_type), b.primitive_type));
}

#[test]
fn merge_finds_the_common_base() {
    let r = resolver();
    let b = r.builtins().clone();
    let rectangle = r.type_for_name("Rectangle").unwrap();

    assert!(r.equals(r.merge(rectangle, b.object_type), b.object_type));
    assert!(r.equals(r.merge(b.null_type, rectangle), rectangle));
}

#[test]
fn merge_is_commutative_across_the_lattice() {
    let r = resolver();
    let b = r.builtins().clone();
    let rectangle = r.type_for_name("Rectangle").unwrap();
    let samples = [
        b.int_type,
        b.real_type,
        b.bool_type,
        b.string_type,
        b.var_type,
        b.null_type,
        rectangle,
        b.object_type,
    ];

    for &x in &samples {
        for &y in &samples {
            assert!(
                r.equals(r.merge(x, y), r.merge(y, x)),
                "merge not commutative for {x:?} and {y:?}"
            );
        }
    }
}

#[test]
fn round_robin_folds_of_numerics_agree() {
    let r = resolver();
    let b = r.builtins().clone();
    let numerics = [b.int_type, b.uint_type, b.real_type, b.float_type];

    let fold =
        |order: &[ScopeId]| order.iter().fold(b.empty_type, |acc, &t| r.merge(acc, t));

    let reference = fold(&numerics);
    assert!(r.equals(reference, b.real_type));
    for rotation in 1..numerics.len() {
        let mut order = numerics.to_vec();
        order.rotate_left(rotation);
        assert!(
            r.equals(fold(&order), reference),
            "fold diverged at rotation {rotation}"
        );
    }

    // bool and string make the fold order-sensitive: bool widens into an
    // integral neighbor, and an integral meeting a string concatenates,
    // but neither survives contact with the other's result.
    assert!(r.equals(
        fold(&[b.bool_type, b.int_type, b.string_type]),
        b.string_type
    ));
    assert!(r.equals(
        fold(&[b.int_type, b.string_type, b.bool_type]),
        b.primitive_type
    ));
}

#[test]
fn merging_contents_keeps_the_origins() {
    let r = resolver();
    let b = r.builtins().clone();

    let merged = r.merge_contents(&r.global_type(b.real_type), &r.global_type(b.string_type));
    assert!(merged.is_conversion());
    assert_eq!(merged.conversion_origins().len(), 2);
    assert!(merged.conversion_origins().contains(&b.real_type));
    assert!(merged.conversion_origins().contains(&b.string_type));
    assert!(r.equals(merged.conversion_result().unwrap(), b.primitive_type));
}

#[test]
fn primitive_conversions() {
    let r = resolver();
    let b = r.builtins().clone();
    let rectangle = r.type_for_name("Rectangle").unwrap();

    assert!(r.can_convert_from_to(b.int_type, b.real_type));
    assert!(r.can_convert_from_to(b.real_type, b.bool_type));
    assert!(r.can_convert_from_to(b.string_type, b.int_type));
    assert!(r.can_convert_from_to(b.int_type, b.string_type));
    assert!(r.can_convert_from_to(b.string_type, b.url_type));
    assert!(r.can_convert_from_to(b.byte_array_type, b.string_type));
    assert!(r.can_convert_from_to(b.null_type, rectangle));
    assert!(r.can_convert_from_to(rectangle, b.string_type));
    assert!(r.can_convert_from_to(rectangle, b.object_type));
    assert!(r.can_convert_from_to(b.variant_list_type, b.string_list_type));
    assert!(r.can_convert_from_to(b.empty_list_type, b.object_list_type));
    assert!(r.can_convert_from_to(b.string_type, b.date_time_type));
    assert!(r.can_convert_from_to(b.primitive_type, rectangle));

    // void converts to and from everything.
    assert!(r.can_convert_from_to(b.int_type, b.void_type));
    assert!(r.can_convert_from_to(b.void_type, b.int_type));
    assert!(r.can_convert_from_to(b.void_type, rectangle));
    assert!(r.can_convert_from_to(rectangle, b.void_type));
}

#[test]
fn conversions_that_must_fail() {
    let r = resolver();
    let b = r.builtins().clone();
    let rectangle = r.type_for_name("Rectangle").unwrap();

    assert!(!r.can_convert_from_to(rectangle, b.int_type));
    assert!(!r.can_convert_from_to(b.object_type, rectangle));
    assert!(!r.can_convert_from_to(b.string_list_type, b.int_type));
}

#[test]
fn strings_construct_structured_value_types() {
    let r = resolver();
    let b = r.builtins().clone();
    let color = r.type_for_name("color").unwrap();

    assert!(r.can_convert_from_to(b.string_type, color));
    assert!(!r.can_convert_from_to(b.int_type, color));
}

#[test]
fn relational_and_bitwise_operators_have_fixed_types() {
    let r = resolver();
    let b = r.builtins().clone();
    let left = r.global_type(b.real_type);
    let right = r.global_type(b.int_type);

    for op in [
        BinaryOperator::Equal,
        BinaryOperator::LessThan,
        BinaryOperator::In,
        BinaryOperator::InstanceOf,
    ] {
        let result = r.type_for_binary_operation(op, &left, &right);
        assert!(r.equals(r.contained_type(&result).unwrap(), b.bool_type));
    }

    let and = r.type_for_binary_operation(BinaryOperator::BitAnd, &left, &right);
    assert!(r.equals(r.contained_type(&and).unwrap(), b.int_type));

    let shift = r.type_for_binary_operation(BinaryOperator::UnsignedRightShift, &left, &right);
    assert!(r.equals(r.contained_type(&shift).unwrap(), b.uint_type));
}

#[test]
fn addition_prefers_strings_then_numbers() {
    let r = resolver();
    let b = r.builtins().clone();

    let concat = r.type_for_binary_operation(
        BinaryOperator::Add,
        &r.global_type(b.string_type),
        &r.global_type(b.int_type),
    );
    assert!(r.equals(r.contained_type(&concat).unwrap(), b.string_type));

    let sum = r.type_for_binary_operation(
        BinaryOperator::Add,
        &r.global_type(b.int_type),
        &r.global_type(b.real_type),
    );
    assert!(r.equals(r.contained_type(&sum).unwrap(), b.real_type));

    let bools = r.type_for_binary_operation(
        BinaryOperator::Add,
        &r.global_type(b.bool_type),
        &r.global_type(b.bool_type),
    );
    assert!(r.equals(r.contained_type(&bools).unwrap(), b.int_type));
}

#[test]
fn division_and_unary_operators() {
    let r = resolver();
    let b = r.builtins().clone();

    let div = r.type_for_binary_operation(
        BinaryOperator::Div,
        &r.global_type(b.int_type),
        &r.global_type(b.int_type),
    );
    assert!(r.equals(r.contained_type(&div).unwrap(), b.real_type));

    let not = r.type_for_unary_operation(UnaryOperator::Not, &r.global_type(b.real_type));
    assert!(r.equals(r.contained_type(&not).unwrap(), b.bool_type));

    let negated = r.type_for_unary_operation(UnaryOperator::Minus, &r.global_type(b.bool_type));
    assert!(r.equals(r.contained_type(&negated).unwrap(), b.int_type));

    // Unary plus is a no-op on integrals.
    let operand = r.global_type(b.int_type);
    let plus = r.type_for_unary_operation(UnaryOperator::Plus, &operand);
    assert_eq!(plus, operand);
}

#[test]
fn generic_and_stored_types() {
    let r = resolver();
    let b = r.builtins().clone();
    let rectangle = r.type_for_name("Rectangle").unwrap();

    assert!(r.equals(r.generic_type(b.int_type, ComponentIsGeneric::No), b.int_type));
    assert!(r.equals(
        r.generic_type(b.string_list_type, ComponentIsGeneric::No),
        b.string_list_type
    ));
    assert!(r.equals(r.generic_type(r.root(), ComponentIsGeneric::No), b.object_type));

    // The composite document stores as its non-composite base.
    assert!(r.equals(r.stored_type(r.root()), rectangle));
    assert!(r.equals(r.stored_type(b.int_type), b.int_type));
}

#[test]
fn indexing_a_list_yields_its_element_type() {
    let r = resolver();
    let b = r.builtins().clone();

    let element = r.value_type(&r.global_type(b.string_list_type));
    assert!(element.is_property());
    assert_eq!(element.property().unwrap().name, "[]");
    assert!(r.equals(r.contained_type(&element).unwrap(), b.string_type));

    let dynamic = r.value_type(&r.global_type(b.var_type));
    assert!(r.equals(r.contained_type(&dynamic).unwrap(), b.var_type));

    assert!(!r.value_type(&r.global_type(b.int_type)).is_valid());
}

#[test]
fn tracked_types_compare_through_their_identity() {
    let mut r = resolver();
    let b = r.builtins().clone();

    let tracked = r.tracked_type(b.int_type);
    assert_ne!(tracked, b.int_type);
    assert!(r.equals(tracked, b.int_type));

    assert!(r.adjust_tracked_type(tracked, b.real_type));
    assert!(r.equals(tracked, b.real_type));
    assert!(!r.equals(tracked, b.int_type));
    assert!(r.equals(r.original_type(tracked), b.int_type));
}

#[test]
fn tracked_types_adjust_to_merged_conversion_origins() {
    let mut r = resolver();
    let b = r.builtins().clone();

    let tracked = r.tracked_type(b.int_type);
    assert!(r.adjust_tracked_type_conversions(tracked, &[b.int_type, b.real_type]));
    assert!(r.equals(tracked, b.real_type));
}

#[test]
fn adjustment_without_a_conversion_path_is_rejected() {
    let mut r = resolver();
    let b = r.builtins().clone();
    let rectangle = r.type_for_name("Rectangle").unwrap();

    // A reference type cannot become an int; the tracked clone keeps its
    // identity.
    let tracked = r.tracked_type(rectangle);
    assert!(!r.adjust_tracked_type_conversions(tracked, &[b.int_type]));
    assert!(r.equals(tracked, rectangle));
}

#[test]
fn generalization_collapses_to_the_canonical_type() {
    let mut r = resolver();
    let b = r.builtins().clone();

    let tracked = r.tracked_type(r.root());
    assert!(r.equals(tracked, r.root()));

    r.generalize_type(tracked);
    assert!(r.equals(tracked, b.object_type));
}

#[test]
fn clone_mode_can_disable_tracking() {
    let mut r = resolver();
    let b = r.builtins().clone();

    r.set_clone_mode(CloneMode::DoNotCloneTypes);
    assert_eq!(r.tracked_type(b.int_type), b.int_type);
}
