//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use resolver_core::definition::Definition;
use resolver_core::entity::{Arguments, EntityHead, Reference, Statement};
use resolver_core::registry::Registry;
use resolver_core::universe::{CallableSignature, ClassInfo, ParamInfo, StaticUniverse, TypeRef};
use resolver_core::{complete_all, resolve_all};

fn main() {
    // Initialize logging - uses JSON if logging-json feature enabled,
    // pretty if logging-pretty enabled
    #[cfg(feature = "logging")]
    {
        resolver_core::logging::init();
    }

    println!("=== resolver-core Logging Demo ===\n");

    let mut universe = StaticUniverse::new();
    universe.add_class("Logger", ClassInfo::default());
    universe.add_class(
        "Database",
        ClassInfo {
            constructor: Some(CallableSignature::public(vec![
                ParamInfo::new("logger").with_type(TypeRef::Class("Logger".into()))
            ])),
            ..Default::default()
        },
    );

    let mut registry = Registry::new();

    // logs: "resolving definition type"
    registry.add_definition(Definition::new("logger", Statement::class("Logger", Arguments::new())));
    registry.add_definition(Definition::new("database", Statement::class("Database", Arguments::new())));

    // Phase 1: every definition's concrete type (logs: "resolving definition type")
    resolve_all(&registry, &universe).expect("type resolution failed");

    // Phase 2: autowired, normalized statements (logs: "completing definition")
    let completed = complete_all(&registry, &universe).expect("completion failed");

    println!("Resolved {} definitions:", completed.len());
    for (def, statement) in registry.get_definitions().zip(&completed) {
        println!("  {} -> {:?}", def.name(), statement);
    }

    // A reference to an unregistered service is reported with full context.
    registry.add_definition(Definition::new(
        "broken",
        Statement::call(EntityHead::Reference(Reference::name("missing")), "create", Arguments::new()),
    ));
    match resolve_all(&registry, &universe) {
        Ok(()) => println!("unexpectedly resolved"),
        Err(e) => println!("\nexpected failure for 'broken': {e}"),
    }

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
