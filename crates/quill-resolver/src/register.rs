//! Register content: what is statically known about one value.
//!
//! Every expression and declaration the resolver touches gets one of
//! these. It records the *stored* type (what physically holds the value),
//! the content itself (a closed tagged union over type references,
//! properties, method overload sets, enumerations, import namespaces and
//! conversions), a provenance variant, and the scope the lookup was made
//! against. Failed lookups produce the invalid content rather than a null
//! type.

use smallvec::SmallVec;

use quill_binder::{MetaEnum, MetaMethod, MetaProperty, ScopeId};

/// How a register content came to be. Consumers use this to pick lookup
/// strategies (e.g. attached versus plain metatype access).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentVariant {
    #[default]
    Unknown,
    Builtin,
    ObjectById,
    Singleton,
    Script,
    MetaType,
    ScopeAttached,
    ObjectAttached,
    ScopeProperty,
    ExtensionScopeProperty,
    ScopeMethod,
    ExtensionScopeMethod,
    ObjectProperty,
    ExtensionObjectProperty,
    ObjectMethod,
    ExtensionObjectMethod,
    ObjectEnum,
    ExtensionObjectEnum,
    ScriptGlobal,
    ScriptObject,
    ScriptObjectProperty,
    MethodReturnValue,
    ScriptReturnValue,
    ListValue,
    ScopeModulePrefix,
    ObjectModulePrefix,
}

impl ContentVariant {
    /// Differing provenances merge to `Unknown`.
    pub fn merge(self, other: ContentVariant) -> ContentVariant {
        if self == other {
            self
        } else {
            ContentVariant::Unknown
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum RegisterKind {
    #[default]
    None,
    Type(ScopeId),
    Property(MetaProperty),
    Method(SmallVec<[MetaMethod; 1]>),
    Enumeration {
        enumeration: MetaEnum,
        member: Option<String>,
    },
    ImportNamespace(String),
    Conversion {
        origins: Vec<ScopeId>,
        result: ScopeId,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegisterContent {
    stored: Option<ScopeId>,
    scope: Option<ScopeId>,
    variant: ContentVariant,
    kind: RegisterKind,
}

impl RegisterContent {
    pub const fn invalid() -> Self {
        Self {
            stored: None,
            scope: None,
            variant: ContentVariant::Unknown,
            kind: RegisterKind::None,
        }
    }

    pub fn from_type(
        stored: ScopeId,
        type_: ScopeId,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> Self {
        Self {
            stored: Some(stored),
            scope,
            variant,
            kind: RegisterKind::Type(type_),
        }
    }

    pub fn from_property(
        stored: ScopeId,
        property: MetaProperty,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> Self {
        Self {
            stored: Some(stored),
            scope,
            variant,
            kind: RegisterKind::Property(property),
        }
    }

    pub fn from_methods(
        stored: ScopeId,
        methods: impl IntoIterator<Item = MetaMethod>,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> Self {
        Self {
            stored: Some(stored),
            scope,
            variant,
            kind: RegisterKind::Method(methods.into_iter().collect()),
        }
    }

    pub fn from_enumeration(
        stored: ScopeId,
        enumeration: MetaEnum,
        member: Option<String>,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> Self {
        Self {
            stored: Some(stored),
            scope,
            variant,
            kind: RegisterKind::Enumeration {
                enumeration,
                member,
            },
        }
    }

    pub fn from_import_namespace(
        stored: ScopeId,
        prefix: impl Into<String>,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> Self {
        Self {
            stored: Some(stored),
            scope,
            variant,
            kind: RegisterKind::ImportNamespace(prefix.into()),
        }
    }

    pub fn from_conversion(
        stored: ScopeId,
        origins: Vec<ScopeId>,
        result: ScopeId,
        variant: ContentVariant,
        scope: Option<ScopeId>,
    ) -> Self {
        Self {
            stored: Some(stored),
            scope,
            variant,
            kind: RegisterKind::Conversion { origins, result },
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.kind, RegisterKind::None)
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, RegisterKind::Type(_))
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, RegisterKind::Property(_))
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, RegisterKind::Method(_))
    }

    pub fn is_enumeration(&self) -> bool {
        matches!(self.kind, RegisterKind::Enumeration { .. })
    }

    pub fn is_import_namespace(&self) -> bool {
        matches!(self.kind, RegisterKind::ImportNamespace(_))
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self.kind, RegisterKind::Conversion { .. })
    }

    pub fn kind(&self) -> &RegisterKind {
        &self.kind
    }

    pub fn type_(&self) -> Option<ScopeId> {
        match &self.kind {
            RegisterKind::Type(type_) => Some(*type_),
            _ => None,
        }
    }

    pub fn property(&self) -> Option<&MetaProperty> {
        match &self.kind {
            RegisterKind::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn methods(&self) -> &[MetaMethod] {
        match &self.kind {
            RegisterKind::Method(methods) => methods,
            _ => &[],
        }
    }

    pub fn enumeration(&self) -> Option<&MetaEnum> {
        match &self.kind {
            RegisterKind::Enumeration { enumeration, .. } => Some(enumeration),
            _ => None,
        }
    }

    pub fn enum_member(&self) -> Option<&str> {
        match &self.kind {
            RegisterKind::Enumeration { member, .. } => member.as_deref(),
            _ => None,
        }
    }

    pub fn import_namespace(&self) -> Option<&str> {
        match &self.kind {
            RegisterKind::ImportNamespace(prefix) => Some(prefix),
            _ => None,
        }
    }

    pub fn conversion_result(&self) -> Option<ScopeId> {
        match &self.kind {
            RegisterKind::Conversion { result, .. } => Some(*result),
            _ => None,
        }
    }

    pub fn conversion_origins(&self) -> &[ScopeId] {
        match &self.kind {
            RegisterKind::Conversion { origins, .. } => origins,
            _ => &[],
        }
    }

    pub fn stored_type(&self) -> Option<ScopeId> {
        self.stored
    }

    pub fn scope_type(&self) -> Option<ScopeId> {
        self.scope
    }

    pub fn variant(&self) -> ContentVariant {
        self.variant
    }
}
