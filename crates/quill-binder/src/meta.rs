//! Declared members of a type: methods, properties, enumerations.
//!
//! These mirror the shapes the external reflection catalogue supplies for
//! built-in types, so composite (document-defined) and built-in members can
//! be looked up uniformly. Resolved-type fields point into the scope arena
//! and stay `None` until `ScopeArena::resolve_types` runs.

use quill_common::TypeRevision;

use crate::scope::ScopeId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Signal,
    Slot,
    Method,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetaMethod {
    pub name: String,
    pub kind: MethodKind,
    /// Parameter name/type-name pairs, in declaration order.
    pub parameters: Vec<(String, String)>,
    pub parameter_types: Vec<Option<ScopeId>>,
    pub return_type_name: String,
    pub return_type: Option<ScopeId>,
    pub revision: TypeRevision,
}

impl MetaMethod {
    pub fn new(name: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parameters: Vec::new(),
            parameter_types: Vec::new(),
            return_type_name: String::new(),
            return_type: None,
            revision: TypeRevision::none(),
        }
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, type_name: impl Into<String>) {
        self.parameters.push((name.into(), type_name.into()));
        self.parameter_types.push(None);
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct MetaProperty {
    pub name: String,
    pub type_name: String,
    pub type_: Option<ScopeId>,
    pub is_list: bool,
    pub is_writable: bool,
    pub is_pointer: bool,
    pub is_alias: bool,
    pub revision: TypeRevision,
}

impl MetaProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_writable: true,
            revision: TypeRevision::none(),
            ..Self::default()
        }
    }

    pub fn with_type(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let mut prop = Self::new(name);
        prop.type_name = type_name.into();
        prop
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct MetaEnum {
    pub name: String,
    pub keys: Vec<String>,
    pub values: Vec<i32>,
    /// The integer-capable type enum values are stored in.
    pub type_: Option<ScopeId>,
}

impl MetaEnum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_key(&mut self, key: impl Into<String>, value: i32) {
        self.keys.push(key.into());
        self.values.push(value);
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn value(&self, key: &str) -> Option<i32> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.values[i])
    }
}
