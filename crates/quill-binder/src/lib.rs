//! Scope graph construction for Quill documents.
//!
//! The binder consumes an already-parsed [`ast::Document`] and a mapping of
//! imported type names to resolved types, and produces:
//!
//! - a hierarchical scope graph (one [`scope::Scope`] per lexical or object
//!   scope, arena-allocated and addressed by [`scope::ScopeId`]),
//! - an id index mapping declared object ids to their scopes, and
//! - the diagnostics accumulated along the way.
//!
//! Parsing and module resolution are external collaborators; the binder
//! never performs I/O.

pub mod ast;
pub mod builder;
pub mod import;
pub mod meta;
pub mod scope;
pub mod scopes_by_id;

pub use builder::{BindResult, ScopeGraphBuilder, MAX_RECURSION_DEPTH};
pub use import::{materialize_types, resolve_imported_types, TypeDescriptor};
pub use meta::{MetaEnum, MetaMethod, MetaProperty, MethodKind};
pub use scope::{
    AccessSemantics, ExtensionKind, Scope, ScopeArena, ScopeFlags, ScopeId, ScopeKind,
    ScriptIdentifier, ScriptIdentifierKind,
};
pub use scopes_by_id::ScopesById;
