//! [`Registry`]: the `ContainerBuilder` facade the resolver queries.
//!
//! Holds every [`Definition`] in insertion order (required for deterministic
//! tagged/typed expansion, spec §8 scenario 4) behind a plain
//! `Vec` + name index rather than pulling in an ordered-map crate — the same
//! "hand-roll the data structure" instinct the teacher crate applies to its
//! thread-local hot cache and shard-sized `DashMap` construction.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use ahash::RandomState;

use crate::definition::Definition;
use crate::entity::{DynamicParameter, Value};
use crate::error::{MissingServiceError, NotAllowedDuringResolvingError, ServiceCreationError};
use crate::universe::TypeUniverse;

#[cfg(feature = "logging")]
use tracing::trace;

/// Reserved name the generated container exposes itself under; a bare
/// `Reference` statement is rewritten to call through it (spec §4.1,
/// `completeStatement`'s `Reference` case).
pub const THIS_CONTAINER: &str = "container";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    TypeResolution,
    Completion,
}

/// Error surface of [`Registry::get_by_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetByTypeError {
    NotAllowed(NotAllowedDuringResolvingError),
    Missing(MissingServiceError),
    Ambiguous(ServiceCreationError),
}

impl From<GetByTypeError> for crate::error::ResolverError {
    fn from(e: GetByTypeError) -> Self {
        match e {
            GetByTypeError::NotAllowed(e) => e.into(),
            GetByTypeError::Missing(e) => e.into(),
            GetByTypeError::Ambiguous(e) => e.into(),
        }
    }
}

/// Owns the set of service definitions and answers the lookups the
/// resolver needs: by name, by tag, by autowired type.
pub struct Registry {
    definitions: Vec<Definition>,
    index: HashMap<String, usize, RandomState>,
    phase: Cell<Phase>,
    dependencies: RefCell<Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            index: HashMap::with_hasher(RandomState::new()),
            phase: Cell::new(Phase::Completion),
            dependencies: RefCell::new(Vec::new()),
        }
    }

    /// Add a definition. Panics on a duplicate name — the loader layer (out
    /// of scope here) is responsible for rejecting duplicate keys before
    /// they reach the resolver.
    pub fn add_definition(&mut self, def: Definition) {
        assert!(
            !self.index.contains_key(def.name()),
            "duplicate definition name: {}",
            def.name()
        );
        self.index.insert(def.name().to_string(), self.definitions.len());
        self.definitions.push(def);
    }

    pub fn has_definition(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get_definition(&self, name: &str) -> Option<&Definition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Insertion-ordered view of every definition.
    pub fn get_definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter()
    }

    /// Definitions carrying `tag`, in insertion order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<&Definition> {
        self.definitions
            .iter()
            .filter(|d| d.tags().iter().any(|t| t == tag))
            .collect()
    }

    /// Definitions eligible for autowiring a `type_name` dependency, in
    /// insertion order: resolved type is-a `type_name`, and the definition
    /// hasn't opted out via `Autowire::No`/narrowed it away via `Only`.
    pub fn find_autowired<'a>(&'a self, type_name: &str, universe: &dyn TypeUniverse) -> Vec<&'a Definition> {
        self.definitions
            .iter()
            .filter(|d| {
                d.autowired().accepts(type_name)
                    && d.service_type()
                        .is_some_and(|t| universe.is_subclass_of(&t, type_name))
            })
            .collect()
    }

    /// Mark the registry as mid-Phase-1: `get_by_type` will refuse to answer
    /// (spec: `NotAllowedDuringResolvingException`) since not every
    /// definition's type is determined yet.
    pub fn begin_type_resolution(&self) {
        self.phase.set(Phase::TypeResolution);
    }

    pub fn end_type_resolution(&self) {
        self.phase.set(Phase::Completion);
    }

    /// Find the single autowired service of `type_name`.
    pub fn get_by_type(
        &self,
        type_name: &str,
        throw: bool,
        universe: &dyn TypeUniverse,
    ) -> Result<Option<String>, GetByTypeError> {
        if self.phase.get() == Phase::TypeResolution {
            return Err(GetByTypeError::NotAllowed(NotAllowedDuringResolvingError));
        }

        let candidates = self.find_autowired(type_name, universe);
        match candidates.as_slice() {
            [] => {
                if throw {
                    Err(GetByTypeError::Missing(MissingServiceError::new(type_name)))
                } else {
                    Ok(None)
                }
            }
            [single] => Ok(Some(single.name().to_string())),
            many => {
                let names: Vec<_> = many.iter().map(|d| d.name().to_string()).collect();
                Err(GetByTypeError::Ambiguous(ServiceCreationError::unresolved_dependency(
                    format!("Multiple services of type {type_name} found: {}.", names.join(", ")),
                )))
            }
        }
    }

    /// Record a reflection dependency (append-only, write-through to the
    /// builder — spec §5).
    pub fn add_dependency(&self, reflection_of: impl Into<String>) {
        let name = reflection_of.into();
        #[cfg(feature = "logging")]
        trace!(target: "resolver_core", dependency = %name, "recording reflection dependency");
        self.dependencies.borrow_mut().push(name);
    }

    pub fn dependencies(&self) -> Vec<String> {
        self.dependencies.borrow().clone()
    }

    /// An opaque raw-code marker: codegen treats this as a literal
    /// expression rather than something to normalize further.
    pub fn literal(&self, expr: impl Into<String>) -> Value {
        Value::Dynamic(DynamicParameter::new(expr))
    }

    /// The generated container's accessor method name for a given service.
    pub fn method_name(&self, service_name: &str) -> String {
        format!("get_{}", service_name.replace(['.', '-'], "_"))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Arguments, Entity, Statement};
    use crate::universe::StaticUniverse;

    fn def(name: &str) -> Definition {
        Definition::new(name, Statement::new(Entity::literal("Foo"), Arguments::new()))
    }

    #[test]
    fn lookup_by_name_and_insertion_order() {
        let mut reg = Registry::new();
        reg.add_definition(def("a"));
        reg.add_definition(def("b"));

        assert!(reg.has_definition("a"));
        assert!(!reg.has_definition("z"));

        let names: Vec<_> = reg.get_definitions().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn tag_lookup_preserves_insertion_order() {
        let mut reg = Registry::new();
        let h1 = def("h1").with_tags(vec!["handler".into()]);
        let h2 = def("h2").with_tags(vec!["handler".into()]);
        reg.add_definition(h1);
        reg.add_definition(def("unrelated"));
        reg.add_definition(h2);

        let tagged: Vec<_> = reg.find_by_tag("handler").iter().map(|d| d.name().to_string()).collect();
        assert_eq!(tagged, vec!["h1", "h2"]);
    }

    #[test]
    fn get_by_type_blocked_during_phase1() {
        let reg = Registry::new();
        reg.begin_type_resolution();
        let universe = StaticUniverse::new();
        let err = reg.get_by_type("Logger", true, &universe).unwrap_err();
        assert!(matches!(err, GetByTypeError::NotAllowed(_)));
    }

    #[test]
    fn get_by_type_missing_when_throw() {
        let reg = Registry::new();
        let universe = StaticUniverse::new();
        let err = reg.get_by_type("Logger", true, &universe).unwrap_err();
        assert!(matches!(err, GetByTypeError::Missing(_)));
    }

    #[test]
    fn get_by_type_none_when_not_throw() {
        let reg = Registry::new();
        let universe = StaticUniverse::new();
        assert_eq!(reg.get_by_type("Logger", false, &universe).unwrap(), None);
    }
}
