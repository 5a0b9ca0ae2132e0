//! Scope and leaf registrations
//!
//! The component layer registers two kinds of things with the engine:
//! scopes (animation boundaries that become animators once stable) and
//! leaves (individually animated elements that become sprites). Both are
//! collected into a [`RenderChanges`] batch between `begin_render` and
//! `finish_render`.

use slotmap::new_key_type;

use segue_core::ElementId;

new_key_type! {
    /// Handle to a registered scope
    pub struct ScopeId;
    /// Handle to a tracked participant
    pub struct ParticipantId;
    /// Handle to an element reference tree node
    pub struct NodeId;
}

/// An animation boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub element: ElementId,
    /// Optional label, used for logging
    pub id: Option<String>,
    initial_render_completed: bool,
    destroying: bool,
}

impl Scope {
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            id: None,
            initial_render_completed: false,
            destroying: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Survived one full render cycle and is not being torn down
    pub fn is_stable(&self) -> bool {
        self.initial_render_completed && !self.destroying
    }

    pub fn initial_render_completed(&self) -> bool {
        self.initial_render_completed
    }

    pub fn mark_initial_render_completed(&mut self) {
        self.initial_render_completed = true;
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying
    }

    pub fn mark_destroying(&mut self) {
        self.destroying = true;
    }
}

/// A tracked leaf element
///
/// `id` is the logical identity used for far matches; removals are matched
/// by `element` only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafRegistration {
    pub id: String,
    pub role: Option<String>,
    pub element: ElementId,
}

impl LeafRegistration {
    pub fn new(id: impl Into<String>, element: ElementId) -> Self {
        Self {
            id: id.into(),
            role: None,
            element,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Either kind of registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    Scope(ScopeId),
    Leaf(LeafRegistration),
}

/// Registrations collected during one render
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderChanges {
    pub inserted_scopes: Vec<ScopeId>,
    pub inserted_leaves: Vec<LeafRegistration>,
    pub removed_scopes: Vec<ScopeId>,
    pub removed_leaves: Vec<LeafRegistration>,
}

impl RenderChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, registration: Registration) {
        match registration {
            Registration::Scope(scope) => self.inserted_scopes.push(scope),
            Registration::Leaf(leaf) => self.inserted_leaves.push(leaf),
        }
    }

    pub fn remove(&mut self, registration: Registration) {
        match registration {
            Registration::Scope(scope) => self.removed_scopes.push(scope),
            Registration::Leaf(leaf) => self.removed_leaves.push(leaf),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserted_scopes.is_empty()
            && self.inserted_leaves.is_empty()
            && self.removed_scopes.is_empty()
            && self.removed_leaves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_stability() {
        let mut scope = Scope::new(ElementId(1)).with_id("root");
        assert!(!scope.is_stable());

        scope.mark_initial_render_completed();
        assert!(scope.is_stable());

        scope.mark_destroying();
        assert!(!scope.is_stable());
        assert!(scope.initial_render_completed());
    }

    #[test]
    fn test_changes_batch() {
        let mut changes = RenderChanges::new();
        assert!(changes.is_empty());

        let leaf = LeafRegistration::new("card", ElementId(2)).with_role("item");
        changes.insert(Registration::Leaf(leaf.clone()));
        changes.remove(Registration::Leaf(leaf.clone()));

        assert_eq!(changes.inserted_leaves, vec![leaf.clone()]);
        assert_eq!(changes.removed_leaves, vec![leaf]);
        assert!(!changes.is_empty());
    }
}
