//! The id index: declared object ids, scoped to their component.
//!
//! The same id may be declared in two sibling inline components without a
//! collision; within one component a duplicate is an error the builder
//! reports. Lookup is therefore always relative to a referrer scope.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::scope::{ScopeArena, ScopeId};

#[derive(Clone, Debug, Default)]
pub struct ScopesById {
    scopes_by_id: FxHashMap<String, SmallVec<[ScopeId; 1]>>,
    /// When components are bound, an inner component can see the ids of
    /// its enclosing components.
    components_are_bound: bool,
}

impl ScopesById {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_components_are_bound(&mut self, bound: bool) {
        self.components_are_bound = bound;
    }

    pub fn insert(&mut self, id: impl Into<String>, scope: ScopeId) {
        let id = id.into();
        debug_assert!(!id.is_empty());
        self.scopes_by_id.entry(id).or_default().push(scope);
    }

    /// The id bound to `scope`, if any.
    pub fn id(&self, scope: ScopeId) -> Option<&str> {
        self.scopes_by_id
            .iter()
            .find(|(_, scopes)| scopes.contains(&scope))
            .map(|(id, _)| id.as_str())
    }

    /// The scope that has id `id` in the component `referrer` belongs to.
    pub fn scope(&self, id: &str, referrer: ScopeId, arena: &ScopeArena) -> Option<ScopeId> {
        debug_assert!(!id.is_empty());
        let candidates = self.scopes_by_id.get(id)?;
        let referrer_root = Self::component_root(referrer, arena);

        candidates
            .iter()
            .copied()
            .find(|&candidate| {
                self.is_component_visible(Self::component_root(candidate, arena), referrer_root, arena)
            })
    }

    /// Whether `id` is bound anywhere in the document, even in an
    /// unrelated component. Use [`Self::scope`] to check whether it is
    /// visible from a given scope.
    pub fn exists_anywhere_in_document(&self, id: &str) -> bool {
        self.scopes_by_id.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.scopes_by_id.clear();
    }

    fn component_root(inner: ScopeId, arena: &ScopeArena) -> ScopeId {
        let mut scope = inner;
        while !arena.get(scope).is_component_root() {
            match arena.get(scope).parent() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    fn is_component_visible(&self, observed: ScopeId, observer: ScopeId, arena: &ScopeArena) -> bool {
        if !self.components_are_bound {
            return observed == observer;
        }

        let mut scope = Some(observer);
        while let Some(id) = scope {
            if id == observed {
                return true;
            }
            scope = arena.get(id).parent();
        }
        false
    }
}
