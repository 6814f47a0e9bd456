//! [`Definition`]: a declarative record of how to build one service.
//!
//! Spec treats "definition classes' own internals" as an external concern,
//! but `resolveType`/`complete` are callbacks *driven by the definition's own
//! body* — so the body (a creator statement plus setup statements) is part
//! of the resolution domain. This crate models `Definition` as a concrete
//! struct rather than a trait object (see SPEC_FULL.md, Open Questions §2).

use std::cell::RefCell;

use crate::entity::Statement;

/// Autowiring eligibility for a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Autowire {
    /// Eligible for any compatible type (the default).
    Yes,
    /// Never offered as an autowiring candidate.
    No,
    /// Eligible only for the listed types (narrowing autowiring).
    Only(Vec<String>),
}

impl Default for Autowire {
    fn default() -> Self {
        Self::Yes
    }
}

impl Autowire {
    pub fn accepts(&self, type_name: &str) -> bool {
        match self {
            Self::Yes => true,
            Self::No => false,
            Self::Only(types) => types.iter().any(|t| t == type_name),
        }
    }
}

/// A declarative record of how to build one service: the construction
/// statement (`creator`), any setup statements run afterward, and the
/// metadata the resolver/autowiring layer need.
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    /// Concrete class type, filled in by Phase 1. `None` until resolved.
    service_type: RefCell<Option<String>>,
    creator: RefCell<Statement>,
    setup: RefCell<Vec<Statement>>,
    autowired: Autowire,
    tags: Vec<String>,
}

impl Definition {
    pub fn new(name: impl Into<String>, creator: Statement) -> Self {
        Self {
            name: name.into(),
            service_type: RefCell::new(None),
            creator: RefCell::new(creator),
            setup: RefCell::new(Vec::new()),
            autowired: Autowire::Yes,
            tags: Vec::new(),
        }
    }

    pub fn with_setup(mut self, setup: Vec<Statement>) -> Self {
        self.setup = RefCell::new(setup);
        self
    }

    pub fn with_autowired(mut self, autowired: Autowire) -> Self {
        self.autowired = autowired;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_type(&self) -> Option<String> {
        self.service_type.borrow().clone()
    }

    pub fn set_service_type(&self, ty: String) {
        *self.service_type.borrow_mut() = Some(ty);
    }

    pub fn creator(&self) -> Statement {
        self.creator.borrow().clone()
    }

    pub fn set_creator(&self, s: Statement) {
        *self.creator.borrow_mut() = s;
    }

    pub fn setup(&self) -> Vec<Statement> {
        self.setup.borrow().clone()
    }

    pub fn set_setup(&self, setup: Vec<Statement>) {
        *self.setup.borrow_mut() = setup;
    }

    pub fn autowired(&self) -> &Autowire {
        &self.autowired
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// A human-readable identifier for diagnostics, e.g. `"Service 'one'"`
    /// — what `completeException`'s `[<descriptor>]` bracket wraps.
    pub fn descriptor(&self) -> String {
        format!("Service '{}'", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Arguments, Entity};

    #[test]
    fn autowire_only_narrows_candidates() {
        let aw = Autowire::Only(vec!["Logger".into()]);
        assert!(aw.accepts("Logger"));
        assert!(!aw.accepts("Database"));
    }

    #[test]
    fn descriptor_format() {
        let def = Definition::new("one", Statement::new(Entity::literal("Foo"), Arguments::new()));
        assert_eq!(def.descriptor(), "Service 'one'");
    }
}
