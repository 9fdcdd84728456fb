//! Static type resolution for Quill documents.
//!
//! Built on top of the binder's scope graph, this crate answers what names
//! and member accesses mean, which conversions are possible, and what type
//! an expression settles on:
//!
//! - [`builtins`] materializes the built-in type universe,
//! - [`register`] models what is statically known about one value,
//! - [`ops`] lists the script operators the resolver types, and
//! - [`resolver`] holds the lattice, the lookups and the tracked-type
//!   overlay.

pub mod builtins;
pub mod ops;
pub mod register;
pub mod resolver;

pub use builtins::{default_catalogue, register_aliases, BuiltinTypes};
pub use ops::{BinaryOperator, UnaryOperator};
pub use register::{ContentVariant, RegisterContent, RegisterKind};
pub use resolver::{CloneMode, ComponentIsGeneric, TypeResolver};
