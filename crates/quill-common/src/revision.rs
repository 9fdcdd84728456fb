use serde::{Deserialize, Serialize};

/// An API revision tag: a major/minor version pair packed into sixteen bits.
///
/// Either half may be unset (encoded as 0xFF). Members of a type carry the
/// revision in which they were introduced; a consumer whose resolved base
/// type stops short of that revision must not see them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRevision(u16);

const UNSET: u8 = 0xFF;

impl TypeRevision {
    pub const fn from_encoded(encoded: u16) -> Self {
        Self(encoded)
    }

    pub const fn from_version(major: u8, minor: u8) -> Self {
        Self(((major as u16) << 8) | minor as u16)
    }

    pub const fn major_version(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn minor_version(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn has_major_version(self) -> bool {
        self.major_version() != UNSET
    }

    pub const fn has_minor_version(self) -> bool {
        self.minor_version() != UNSET
    }

    pub const fn is_valid(self) -> bool {
        self.has_major_version() || self.has_minor_version()
    }

    pub const fn zero() -> Self {
        Self::from_version(0, 0)
    }

    pub const fn none() -> Self {
        Self::from_version(UNSET, UNSET)
    }

    pub const fn encoded(self) -> u16 {
        self.0
    }
}

impl PartialOrd for TypeRevision {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeRevision {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Unset halves sort as zero so that a plain major-only revision
        // still orders sensibly against a full one.
        let key = |r: TypeRevision| {
            let major = if r.has_major_version() {
                r.major_version()
            } else {
                0
            };
            let minor = if r.has_minor_version() {
                r.minor_version()
            } else {
                0
            };
            ((major as u16) << 8) | minor as u16
        };
        key(*self).cmp(&key(*other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_revision_is_invalid() {
        assert!(!TypeRevision::none().is_valid());
        assert!(TypeRevision::zero().is_valid());
        assert!(TypeRevision::from_version(2, 15).is_valid());
    }

    #[test]
    fn ordering_uses_major_then_minor() {
        assert!(TypeRevision::from_version(2, 0) > TypeRevision::from_version(1, 15));
        assert!(TypeRevision::from_version(2, 3) > TypeRevision::from_version(2, 1));
        assert!(TypeRevision::from_version(6, 0) >= TypeRevision::from_version(6, 0));
    }
}
