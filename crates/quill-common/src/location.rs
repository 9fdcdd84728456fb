use serde::{Deserialize, Serialize};

/// A half-open region of a source document.
///
/// The default value is the invalid location; it compares equal to itself
/// and is used for synthesized scopes and diagnostics without a position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub offset: u32,
    pub length: u32,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub const fn new(offset: u32, length: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }

    /// A location is valid once it points at an actual line. Line numbers
    /// are 1-based, so the default (zeroed) location is invalid.
    pub const fn is_valid(&self) -> bool {
        self.line > 0
    }
}
