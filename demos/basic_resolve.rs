//! Minimal end-to-end walkthrough of the two-phase resolution pipeline:
//! register a few definitions, run type resolution, then completion, and
//! print what came out.
//!
//! ```bash
//! cargo run --example basic_resolve
//! ```

use resolver_core::definition::Definition;
use resolver_core::entity::{Arguments, EntityHead, Reference, Statement, Value};
use resolver_core::registry::Registry;
use resolver_core::universe::{CallableSignature, ClassInfo, ParamInfo, StaticUniverse, TypeRef};
use resolver_core::{complete_all, resolve_all};

fn main() {
    let mut universe = StaticUniverse::new();
    universe.add_class("Logger", ClassInfo::default());
    universe.add_class(
        "Mailer",
        ClassInfo {
            constructor: Some(CallableSignature::public(vec![
                ParamInfo::new("logger").with_type(TypeRef::Class("Logger".into()))
            ])),
            methods: std::collections::HashMap::from([(
                "set_sender".to_string(),
                CallableSignature::public(vec![ParamInfo::new("address")]),
            )]),
            ..Default::default()
        },
    );

    let mut registry = Registry::new();
    registry.add_definition(Definition::new("logger", Statement::class("Logger", Arguments::new())));
    registry.add_definition(
        Definition::new("mailer", Statement::class("Mailer", Arguments::new())).with_setup(vec![Statement::call(
            EntityHead::Reference(Reference::SelfRef),
            "set_sender",
            Arguments::positional(vec![Value::str("no-reply@example.com")]),
        )]),
    );

    resolve_all(&registry, &universe).expect("type resolution failed");
    let completed = complete_all(&registry, &universe).expect("completion failed");

    for (def, statement) in registry.get_definitions().zip(&completed) {
        println!(
            "{} : {} -> {:?}",
            def.name(),
            def.service_type().unwrap_or_else(|| "?".into()),
            statement
        );
    }

    let mailer_setup = registry.get_definition("mailer").unwrap().setup();
    println!("mailer setup calls: {mailer_setup:?}");
}
