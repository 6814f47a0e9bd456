//! Benchmarks for the resolver core

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use resolver_core::definition::Definition;
use resolver_core::entity::{Arguments, EntityHead, Reference, Statement, Value};
use resolver_core::expand::{expand, Param, ParamsBuilder};
use resolver_core::registry::Registry;
use resolver_core::universe::{CallableSignature, ClassInfo, ParamInfo, StaticUniverse, TypeRef};
use resolver_core::{complete_all, resolve_all};
use std::hint::black_box;

fn small_universe() -> StaticUniverse {
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
    universe.add_class(
        "UserRepository",
        ClassInfo {
            constructor: Some(CallableSignature::public(vec![
                ParamInfo::new("db").with_type(TypeRef::Class("Database".into()))
            ])),
            ..Default::default()
        },
    );
    universe
}

fn small_registry() -> Registry {
    let mut registry = Registry::new();
    registry.add_definition(Definition::new("logger", Statement::class("Logger", Arguments::new())));
    registry.add_definition(Definition::new("database", Statement::class("Database", Arguments::new())));
    registry.add_definition(Definition::new(
        "users",
        Statement::class("UserRepository", Arguments::new()),
    ));
    registry
}

fn bench_resolve_and_complete(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(3));

    group.bench_function("resolve_all_small_graph", |b| {
        let universe = small_universe();
        b.iter(|| {
            let registry = small_registry();
            resolve_all(&registry, &universe).unwrap();
            black_box(registry)
        })
    });

    group.bench_function("resolve_then_complete_small_graph", |b| {
        let universe = small_universe();
        b.iter(|| {
            let registry = small_registry();
            resolve_all(&registry, &universe).unwrap();
            let completed = complete_all(&registry, &universe).unwrap();
            black_box(completed)
        })
    });

    group.finish();
}

fn bench_autowiring(c: &mut Criterion) {
    let mut group = c.benchmark_group("autowiring");

    group.bench_function("single_dependency_constructor", |b| {
        let universe = small_universe();
        let registry = small_registry();
        resolve_all(&registry, &universe).unwrap();

        b.iter(|| black_box(complete_all(&registry, &universe).unwrap()))
    });

    group.bench_function("self_reference_setup_call", |b| {
        let universe = small_universe();
        let mut registry = Registry::new();
        registry.add_definition(
            Definition::new("logger", Statement::class("Logger", Arguments::new())).with_setup(vec![]),
        );
        resolve_all(&registry, &universe).unwrap();

        b.iter(|| black_box(complete_all(&registry, &universe).unwrap()))
    });

    group.finish();
}

fn bench_placeholder_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");

    group.bench_function("flat_placeholder", |b| {
        let params = ParamsBuilder::new().set("env", Param::str("production")).build();
        b.iter(|| black_box(expand(&Value::str("%env%"), &params, true).unwrap()))
    });

    group.bench_function("nested_concatenation", |b| {
        let params = ParamsBuilder::new()
            .set("host", Param::str("db.internal"))
            .set("port", Param::str("5432"))
            .build();
        b.iter(|| black_box(expand(&Value::str("%host%:%port%/app"), &params, true).unwrap()))
    });

    group.finish();
}

fn bench_cycle_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_detection");

    group.bench_function("rejects_two_node_cycle", |b| {
        let universe = StaticUniverse::new();
        b.iter(|| {
            let mut registry = Registry::new();
            registry.add_definition(Definition::new(
                "a",
                Statement::call(EntityHead::Reference(Reference::name("b")), "make", Arguments::new()),
            ));
            registry.add_definition(Definition::new(
                "b",
                Statement::call(EntityHead::Reference(Reference::name("a")), "make", Arguments::new()),
            ));
            black_box(resolve_all(&registry, &universe).unwrap_err())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve_and_complete,
    bench_autowiring,
    bench_placeholder_expansion,
    bench_cycle_detection,
);
criterion_main!(benches);
