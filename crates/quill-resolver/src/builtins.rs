//! The built-in type universe.
//!
//! The resolver needs a handful of well-known types: the primitives of the
//! embedded scripting language, the sequence types, and the roots of the
//! object hierarchy. [`default_catalogue`] provides descriptors for all of
//! them in the same shape import resolution delivers user types, so a
//! document's import mapping is simply the default catalogue plus whatever
//! the modules bring in. [`BuiltinTypes`] then pins the resolved ids so the
//! lattice operations never have to go through name lookup.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use quill_binder::{
    AccessSemantics, MetaMethod, MetaProperty, MethodKind, ScopeArena, ScopeFlags, ScopeId,
    ScopeKind, TypeDescriptor,
};

fn value_type(name: &str) -> TypeDescriptor {
    TypeDescriptor::with_semantics(name, AccessSemantics::Value)
}

fn numeric_type(name: &str) -> TypeDescriptor {
    let mut descriptor = value_type(name);
    descriptor.extension_type_name = "NumberPrototype".into();
    descriptor
}

fn sequence_type(name: &str, value: &str) -> TypeDescriptor {
    let mut descriptor = TypeDescriptor::with_semantics(name, AccessSemantics::Sequence);
    descriptor.value_type_name = value.into();
    descriptor
}

fn method(name: &str, return_type: &str) -> MetaMethod {
    let mut method = MetaMethod::new(name, MethodKind::Method);
    method.return_type_name = return_type.into();
    method
}

/// Descriptors for every type the engine itself depends on, keyed by the
/// name documents use. Insertion order is the order the types materialize
/// in, which keeps scope ids stable across runs.
pub fn default_catalogue() -> IndexMap<String, TypeDescriptor> {
    let mut catalogue = IndexMap::new();
    let mut add = |name: &str, descriptor: TypeDescriptor| {
        catalogue.insert(name.to_owned(), descriptor);
    };

    add("void", value_type("void"));
    add("null", TypeDescriptor::with_semantics("null", AccessSemantics::None));
    add("bool", value_type("bool"));
    add("int", numeric_type("int"));
    add("uint", numeric_type("uint"));
    add("double", numeric_type("double"));
    add("float", numeric_type("float"));
    add("string", value_type("string"));
    add("stringlist", sequence_type("stringlist", "string"));
    add("bytearray", value_type("bytearray"));
    add("url", value_type("url"));
    add("datetime", value_type("datetime"));
    add("variantlist", sequence_type("variantlist", "var"));
    add("var", value_type("var"));
    add("scriptvalue", value_type("scriptvalue"));
    add("function", value_type("function"));
    add("listproperty", sequence_type("listproperty", "Object"));
    add("objectlist", sequence_type("objectlist", "Object"));

    let mut number_prototype = value_type("NumberPrototype");
    number_prototype.methods = vec![method("toFixed", "string"), method("toString", "string")];
    add("NumberPrototype", number_prototype);

    add("Array", sequence_type("Array", "var"));

    let mut global_object = TypeDescriptor::new("GlobalObject");
    global_object.methods = vec![
        {
            let mut m = method("parseInt", "int");
            m.add_parameter("string", "string");
            m
        },
        {
            let mut m = method("parseFloat", "double");
            m.add_parameter("string", "string");
            m
        },
        {
            let mut m = method("isNaN", "bool");
            m.add_parameter("value", "var");
            m
        },
        {
            let mut m = method("isFinite", "bool");
            m.add_parameter("value", "var");
            m
        },
        method("Number", "double"),
        method("String", "string"),
        method("Boolean", "bool"),
    ];
    global_object.properties = vec![
        MetaProperty::with_type("NaN", "double"),
        MetaProperty::with_type("Infinity", "double"),
        MetaProperty::with_type("undefined", "var"),
    ];
    add("GlobalObject", global_object);

    let mut object = TypeDescriptor::new("Object");
    object.is_creatable = true;
    object.properties = vec![MetaProperty::with_type("objectName", "string")];
    object.methods = vec![method("toString", "string")];
    add("Object", object);

    let mut component = TypeDescriptor::new("Component");
    component.base_type_name = "Object".into();
    component.is_creatable = true;
    add("Component", component);

    catalogue
}

/// Installs the spelling aliases documents may use for catalogue types.
/// Call after materializing; the aliases share the original's scope.
pub fn register_aliases(types: &mut FxHashMap<String, ScopeId>) {
    if let Some(&double) = types.get("double") {
        types.entry("real".to_owned()).or_insert(double);
    }
}

/// Resolved ids of the well-known types, plus a few synthetic types that
/// exist only inside the resolver and are never named by documents.
#[derive(Clone, Debug)]
pub struct BuiltinTypes {
    pub void_type: ScopeId,
    pub null_type: ScopeId,
    pub bool_type: ScopeId,
    pub int_type: ScopeId,
    pub uint_type: ScopeId,
    pub real_type: ScopeId,
    pub float_type: ScopeId,
    pub string_type: ScopeId,
    pub string_list_type: ScopeId,
    pub byte_array_type: ScopeId,
    pub url_type: ScopeId,
    pub date_time_type: ScopeId,
    pub variant_list_type: ScopeId,
    pub var_type: ScopeId,
    pub script_value_type: ScopeId,
    pub function_type: ScopeId,
    pub list_property_type: ScopeId,
    pub object_list_type: ScopeId,
    pub number_prototype: ScopeId,
    pub array_type: ScopeId,
    pub global_object: ScopeId,
    pub object_type: ScopeId,
    pub component_type: ScopeId,

    /// The boxed "any primitive" type arithmetic falls back to.
    pub primitive_type: ScopeId,
    /// The type of a type: what a plain type name evaluates to.
    pub metatype_type: ScopeId,
    /// The content of a failed lookup.
    pub empty_type: ScopeId,
    /// The type of `[]` before any element fixes it.
    pub empty_list_type: ScopeId,
}

impl BuiltinTypes {
    /// Pins the catalogue types out of `types` and allocates the synthetic
    /// ones. The mapping must contain the default catalogue; a missing
    /// entry is a caller error.
    pub fn resolve(arena: &mut ScopeArena, types: &FxHashMap<String, ScopeId>) -> Self {
        let lookup = |name: &str| -> ScopeId {
            types
                .get(name)
                .copied()
                .unwrap_or_else(|| panic!("builtin type {name} is missing from the catalogue"))
        };

        let synthesize = |arena: &mut ScopeArena, name: &str, semantics: AccessSemantics| {
            let id = arena.create(ScopeKind::ObjectScope, None);
            let scope = arena.get_mut(id);
            scope.set_internal_name(name);
            scope.set_access_semantics(semantics);
            scope.set_flag(ScopeFlags::CREATABLE, false);
            id
        };

        let primitive_type = synthesize(arena, "primitive", AccessSemantics::Value);
        let metatype_type = synthesize(arena, "metatype", AccessSemantics::Reference);
        let empty_type = synthesize(arena, "", AccessSemantics::None);
        let empty_list_type = synthesize(arena, "emptylist", AccessSemantics::Sequence);

        Self {
            void_type: lookup("void"),
            null_type: lookup("null"),
            bool_type: lookup("bool"),
            int_type: lookup("int"),
            uint_type: lookup("uint"),
            real_type: lookup("double"),
            float_type: lookup("float"),
            string_type: lookup("string"),
            string_list_type: lookup("stringlist"),
            byte_array_type: lookup("bytearray"),
            url_type: lookup("url"),
            date_time_type: lookup("datetime"),
            variant_list_type: lookup("variantlist"),
            var_type: lookup("var"),
            script_value_type: lookup("scriptvalue"),
            function_type: lookup("function"),
            list_property_type: lookup("listproperty"),
            object_list_type: lookup("objectlist"),
            number_prototype: lookup("NumberPrototype"),
            array_type: lookup("Array"),
            global_object: lookup("GlobalObject"),
            object_type: lookup("Object"),
            component_type: lookup("Component"),
            primitive_type,
            metatype_type,
            empty_type,
            empty_list_type,
        }
    }
}
