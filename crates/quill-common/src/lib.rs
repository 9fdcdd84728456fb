//! Common types shared across the Quill compiler crates: source locations,
//! type revisions, and the diagnostic sink.

pub mod diagnostics;
pub mod location;
pub mod revision;

pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSink};
pub use location::SourceLocation;
pub use revision::TypeRevision;
