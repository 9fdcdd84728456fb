use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::location::SourceLocation;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub category: DiagnosticCategory,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn new(
        message: impl Into<String>,
        category: DiagnosticCategory,
        location: SourceLocation,
    ) -> Self {
        Self {
            message: message.into(),
            category,
            location,
        }
    }
}

/// Accumulates diagnostics during binding and type resolution.
///
/// Resolution queries are shared references into the engine, so the sink
/// uses interior mutability: a degraded lookup can report without the whole
/// query path threading `&mut`. The engine never aborts on an ordinary
/// unresolved name; it logs here and continues with degraded information.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    messages: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(
        &self,
        message: impl Into<String>,
        category: DiagnosticCategory,
        location: SourceLocation,
    ) {
        self.messages
            .borrow_mut()
            .push(Diagnostic::new(message, category, location));
    }

    pub fn warn(&self, message: impl Into<String>, location: SourceLocation) {
        self.log(message, DiagnosticCategory::Warning, location);
    }

    pub fn error(&self, message: impl Into<String>, location: SourceLocation) {
        self.log(message, DiagnosticCategory::Error, location);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .borrow()
            .iter()
            .any(|d| d.category == DiagnosticCategory::Error)
    }

    /// Drains all accumulated diagnostics, leaving the sink empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.messages.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_accumulates_and_drains() {
        let sink = DiagnosticSink::new();
        assert!(sink.is_empty());
        sink.warn("unresolved type Foo", SourceLocation::default());
        sink.error("duplicate id r", SourceLocation::new(10, 1, 2, 5));
        assert_eq!(sink.len(), 2);
        assert!(sink.has_errors());

        let taken = sink.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].category, DiagnosticCategory::Warning);
        assert!(sink.is_empty());
    }

    #[test]
    fn diagnostics_round_trip_through_json() {
        let diagnostic = Diagnostic::new(
            "unresolved type Foo",
            DiagnosticCategory::Warning,
            SourceLocation::new(10, 3, 2, 5),
        );
        let json = serde_json::to_string(&diagnostic).unwrap();
        let parsed: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, diagnostic);
    }
}
