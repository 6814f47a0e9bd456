#![no_main]

//! Fuzz target for statement completion: feeds arbitrary `@reference`/
//! `Class::CONST`-shaped strings and argument shapes through
//! `filter_arguments` and `Resolver::complete_statement` against a small
//! fixed universe, checking only that nothing panics — an error return is
//! an expected, valid outcome for malformed input.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use resolver_core::definition::Definition;
use resolver_core::entity::{ArgKey, Argument, Arguments, Entity, EntityHead, Literal, Reference, Statement, Value};
use resolver_core::expand::filter_arguments;
use resolver_core::registry::Registry;
use resolver_core::resolver::Resolver;
use resolver_core::universe::{CallableSignature, ClassInfo, ParamInfo, StaticUniverse, TypeRef};

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    AtReference(String),
    ClassConst(String, String),
}

impl FuzzValue {
    fn into_value(self) -> Value {
        match self {
            FuzzValue::Null => Value::Literal(Literal::Null),
            FuzzValue::Bool(b) => Value::Literal(Literal::Bool(b)),
            FuzzValue::Int(i) => Value::Literal(Literal::Int(i)),
            FuzzValue::Str(s) => Value::str(s),
            FuzzValue::AtReference(name) => Value::str(format!("@{name}")),
            FuzzValue::ClassConst(class, member) => Value::str(format!("{class}::{member}")),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum FuzzArg {
    Positional(FuzzValue),
    Named(String, FuzzValue),
}

#[derive(Debug, Arbitrary)]
struct FuzzStatement {
    entity_name: String,
    member: String,
    is_callable: bool,
    args: Vec<FuzzArg>,
}

fn universe() -> StaticUniverse {
    let mut u = StaticUniverse::new();
    u.add_class(
        "Widget",
        ClassInfo {
            constructor: Some(CallableSignature::public(vec![
                ParamInfo::new("name").with_type(TypeRef::Scalar("string".into())).with_default(false)
            ])),
            methods: std::collections::HashMap::from([(
                "paint".to_string(),
                CallableSignature::public(vec![ParamInfo::new("color")]),
            )]),
            constants: std::collections::HashMap::from([("DEFAULT".to_string(), Literal::Str("plain".into()))]),
            enum_cases: vec!["RED".into()],
            ..Default::default()
        },
    );
    u
}

fuzz_target!(|input: FuzzStatement| {
    let mut arguments = Arguments::new();
    for (i, arg) in input.args.into_iter().enumerate() {
        match arg {
            FuzzArg::Positional(v) => arguments.push(Argument {
                key: ArgKey::Position(i),
                value: v.into_value(),
            }),
            FuzzArg::Named(name, v) => {
                if name.is_empty() {
                    continue;
                }
                arguments.push(Argument {
                    key: ArgKey::Name(name),
                    value: v.into_value(),
                })
            }
        }
    }

    let universe = universe();
    let _ = filter_arguments(&arguments, &universe);

    let entity = if input.is_callable {
        Entity::Callable {
            head: EntityHead::Class(input.entity_name),
            member: input.member,
        }
    } else {
        Entity::Literal(input.entity_name)
    };
    let statement = Statement::new(entity, arguments);

    let registry = Registry::new();
    let resolver = Resolver::new(&registry, &universe);
    let def = Definition::new("fuzz", statement.clone());
    let _ = resolver.resolve_definition(&def);
    let _ = resolver.complete_statement(&statement, false);
});
