//! Two-phase type resolution and autowiring core for a dependency-injection
//! container compiler.
//!
//! A container compiler turns a set of declarative service definitions into
//! generated accessor code. This crate is the part of that pipeline that
//! decides, for every definition, what concrete type it produces and how
//! its constructor/method-call arguments are filled in — it does not parse
//! configuration and does not emit code.
//!
//! # Pipeline
//!
//! 1. Build a [`registry::Registry`] and add every [`definition::Definition`].
//! 2. Run [`resolve_all`] (Phase 1): each definition's creator statement is
//!    inspected to determine the concrete type it produces, resolving
//!    through references and nested calls as needed. Types are unknown
//!    to each other during this phase — [`registry::Registry::get_by_type`]
//!    refuses to answer until Phase 1 finishes.
//! 3. Run [`complete_all`] (Phase 2): each definition's creator and setup
//!    statements are normalized and autowired against the now-fully-typed
//!    registry.
//!
//! # Example
//!
//! ```rust
//! use resolver_core::entity::{Arguments, Statement};
//! use resolver_core::definition::Definition;
//! use resolver_core::registry::Registry;
//! use resolver_core::universe::{ClassInfo, StaticUniverse};
//! use resolver_core::{resolve_all, complete_all};
//!
//! let mut universe = StaticUniverse::new();
//! universe.add_class("Logger", ClassInfo::default());
//!
//! let mut registry = Registry::new();
//! registry.add_definition(Definition::new(
//!     "logger",
//!     Statement::class("Logger", Arguments::new()),
//! ));
//!
//! resolve_all(&registry, &universe).unwrap();
//! let completed = complete_all(&registry, &universe).unwrap();
//! assert_eq!(completed.len(), 1);
//! ```

pub mod autowire;
pub mod definition;
pub mod entity;
pub mod error;
pub mod expand;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod universe;

pub use error::{ResolverError, Result};
pub use resolver::Resolver;

/// Commonly paired imports for embedders wiring up a resolver from scratch.
pub mod prelude {
    pub use crate::definition::{Autowire, Definition};
    pub use crate::entity::{Arguments, Entity, EntityHead, Literal, Reference, Statement, Value};
    pub use crate::error::{ResolverError, Result};
    pub use crate::registry::Registry;
    pub use crate::resolver::Resolver;
    pub use crate::universe::{CallableSignature, ParamInfo, TypeRef, TypeUniverse};
    pub use crate::{complete_all, resolve_all};
}

use definition::Definition;
use registry::Registry;
use universe::TypeUniverse;

/// Run Phase 1 (type resolution) over every definition in `registry`.
///
/// Brackets the pass with [`Registry::begin_type_resolution`]/
/// [`Registry::end_type_resolution`], so [`Registry::get_by_type`] correctly
/// refuses to answer while any definition's type is still unknown.
pub fn resolve_all(registry: &Registry, universe: &dyn TypeUniverse) -> Result<()> {
    let resolver = Resolver::new(registry, universe);
    registry.begin_type_resolution();
    let outcome = (|| {
        for def in registry.get_definitions() {
            resolver.resolve_definition(def)?;
        }
        Ok(())
    })();
    registry.end_type_resolution();
    outcome
}

/// Run Phase 2 (statement completion) over every definition in `registry`,
/// returning each definition's fully completed creator statement in
/// insertion order. `complete_definition` rewrites each definition's
/// creator/setup statements in place (via `Definition::set_creator`/
/// `set_setup`); an embedder that needs the completed setup statements
/// reads [`definition::Definition::setup`] after calling this.
pub fn complete_all(registry: &Registry, universe: &dyn TypeUniverse) -> Result<Vec<entity::Statement>> {
    let resolver = Resolver::new(registry, universe);
    let mut out = Vec::new();
    for def in registry.get_definitions() {
        resolver.complete_definition(def)?;
        out.push(def.creator());
    }
    Ok(out)
}

#[cfg(test)]
mod end_to_end {
    use super::*;
    use crate::entity::{Arguments, EntityHead, Literal, Reference, Statement, Value};
    use crate::universe::{CallableSignature, ClassInfo, ParamInfo, StaticUniverse, TypeRef};

    fn logger_universe() -> StaticUniverse {
        let mut u = StaticUniverse::new();
        u.add_class(
            "Logger",
            ClassInfo {
                ..Default::default()
            },
        );
        u
    }

    /// spec §8 scenario 1: a factory chain — `one` is built by calling
    /// `Factory::create()`, and `two` depends on `one` by reference, with a
    /// setup call recorded against it.
    #[test]
    fn basic_factory_chain() {
        let mut universe = StaticUniverse::new();
        universe.add_class(
            "One",
            ClassInfo {
                methods: std::collections::HashMap::from([(
                    "mark".to_string(),
                    CallableSignature::public(vec![ParamInfo::new("source")]),
                )]),
                ..Default::default()
            },
        );
        universe.add_class(
            "Factory",
            ClassInfo {
                methods: std::collections::HashMap::from([(
                    "create".to_string(),
                    CallableSignature::public(vec![]).with_return(TypeRef::Class("One".into())),
                )]),
                ..Default::default()
            },
        );

        let mut registry = Registry::new();
        registry.add_definition(Definition::new(
            "factory",
            Statement::class("Factory", Arguments::new()),
        ));
        registry.add_definition(Definition::new(
            "one",
            Statement::call(
                EntityHead::Reference(Reference::name("factory")),
                "create",
                Arguments::new(),
            ),
        ));
        registry.add_definition(
            Definition::new("two", Statement::class("One", Arguments::new())).with_setup(vec![Statement::call(
                EntityHead::Reference(Reference::SelfRef),
                "mark",
                Arguments::positional(vec![Value::reference(Reference::name("one"))]),
            )]),
        );

        resolve_all(&registry, &universe).unwrap();
        assert_eq!(registry.get_definition("one").unwrap().service_type(), Some("One".into()));
        assert_eq!(registry.get_definition("two").unwrap().service_type(), Some("One".into()));

        let completed = complete_all(&registry, &universe).unwrap();
        assert_eq!(completed.len(), 3);

        let two_setup = registry.get_definition("two").unwrap().setup();
        assert_eq!(two_setup.len(), 1);
    }

    /// spec §8 scenario 2: `a` depends on `b` and `b` depends on `a` —
    /// cycle must be reported naming both services, in discovery order.
    #[test]
    fn cycle_detection_names_both_services() {
        let universe = StaticUniverse::new();
        let mut registry = Registry::new();
        registry.add_definition(Definition::new(
            "a",
            Statement::call(EntityHead::Reference(Reference::name("b")), "make", Arguments::new()),
        ));
        registry.add_definition(Definition::new(
            "b",
            Statement::call(EntityHead::Reference(Reference::name("a")), "make", Arguments::new()),
        ));

        let err = resolve_all(&registry, &universe).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("a, b"), "expected cycle naming in order, got: {message}");
    }

    /// spec §8 scenario 3: a constructor parameter typed `Logger` is
    /// autowired from the single matching definition in the registry.
    #[test]
    fn autowire_by_type_end_to_end() {
        let mut universe = logger_universe();
        universe.add_class(
            "Service",
            ClassInfo {
                constructor: Some(CallableSignature::public(vec![
                    ParamInfo::new("logger").with_type(TypeRef::Class("Logger".into()))
                ])),
                ..Default::default()
            },
        );

        let mut registry = Registry::new();
        registry.add_definition(Definition::new("logger", Statement::class("Logger", Arguments::new())));
        registry.add_definition(Definition::new("service", Statement::class("Service", Arguments::new())));

        resolve_all(&registry, &universe).unwrap();
        let completed = complete_all(&registry, &universe).unwrap();
        let service_statement = &completed[1];
        match &service_statement.arguments.0[..] {
            [arg] => assert_eq!(arg.value, Value::reference(Reference::name("logger"))),
            other => panic!("expected one autowired argument, got {other:?}"),
        }
    }

    /// spec §8 scenario 4: `typed(Handler)` expands to every definition
    /// whose resolved type is-a `Handler`, in insertion order.
    #[test]
    fn tagged_expansion_preserves_insertion_order() {
        let mut universe = StaticUniverse::new();
        universe.add_class("Handler", ClassInfo::default());
        universe.add_class(
            "FirstHandler",
            ClassInfo {
                parents: vec!["Handler".into()],
                ..Default::default()
            },
        );
        universe.add_class(
            "SecondHandler",
            ClassInfo {
                parents: vec!["Handler".into()],
                ..Default::default()
            },
        );
        universe.add_class(
            "Dispatcher",
            ClassInfo {
                constructor: Some(CallableSignature::public(vec![
                    ParamInfo::new("handlers").with_type(TypeRef::Array).with_array_doc_class("Handler")
                ])),
                ..Default::default()
            },
        );

        let mut registry = Registry::new();
        registry.add_definition(Definition::new("first", Statement::class("FirstHandler", Arguments::new())));
        registry.add_definition(Definition::new("second", Statement::class("SecondHandler", Arguments::new())));
        registry.add_definition(Definition::new("dispatcher", Statement::class("Dispatcher", Arguments::new())));

        resolve_all(&registry, &universe).unwrap();
        let completed = complete_all(&registry, &universe).unwrap();
        let dispatcher_statement = &completed[2];
        match &dispatcher_statement.arguments.0[..] {
            [arg] => match &arg.value {
                Value::Literal(Literal::List(items)) => {
                    assert_eq!(
                        items,
                        &vec![
                            Value::reference(Reference::name("first")),
                            Value::reference(Reference::name("second")),
                        ]
                    );
                }
                other => panic!("expected a list, got {other:?}"),
            },
            other => panic!("expected one argument, got {other:?}"),
        }
    }

    /// spec §8 scenario 5: `%placeholder%` expansion, including a
    /// `DynamicParameter` propagating through string concatenation.
    #[test]
    fn placeholder_expansion_with_dynamic_propagation() {
        use crate::expand::{expand, Param, ParamsBuilder};
        use crate::entity::DynamicParameter;

        let params = ParamsBuilder::new()
            .set("host", Param::str("x:"))
            .set("cfg", Param::Dynamic(DynamicParameter::new("$cfg['port']")))
            .build();

        let result = expand(&Value::str("%host%%cfg%"), &params, true).unwrap();
        match result {
            Value::Dynamic(d) => assert_eq!(d.0, "'x:' . ($cfg['port'])"),
            other => panic!("expected a dynamic parameter, got {other:?}"),
        }
    }

    /// spec §8 scenario 6: a placeholder that (indirectly) references itself
    /// must be rejected rather than looping forever.
    #[test]
    fn circular_placeholder_is_rejected() {
        use crate::expand::{expand, Param, ParamsBuilder};

        let params = ParamsBuilder::new()
            .set("a", Param::str("%b%"))
            .set("b", Param::str("%a%"))
            .build();

        assert!(expand(&Value::str("%a%"), &params, true).is_err());
    }
}
