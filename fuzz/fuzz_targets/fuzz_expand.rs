#![no_main]

//! Fuzz target for `%placeholder%` expansion.
//!
//! Builds a small parameter tree and a template string out of arbitrary
//! bytes, then checks that `expand` never panics — only ever returns `Ok`
//! or one of `PlaceholderError`'s variants.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use resolver_core::entity::Value;
use resolver_core::expand::{expand, Param, ParamsBuilder};

#[derive(Debug, Arbitrary)]
enum FuzzParam {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Placeholder(String),
}

impl FuzzParam {
    fn into_param(self) -> Param {
        match self {
            FuzzParam::Null => Param::Null,
            FuzzParam::Bool(b) => Param::Bool(b),
            FuzzParam::Int(i) => Param::Int(i),
            FuzzParam::Str(s) => Param::str(s),
            FuzzParam::Placeholder(name) => Param::str(format!("%{name}%")),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    entries: Vec<(String, FuzzParam)>,
    template: String,
    recursive: bool,
}

fuzz_target!(|input: FuzzInput| {
    let mut builder = ParamsBuilder::new();
    for (key, value) in input.entries {
        if key.is_empty() {
            continue;
        }
        builder = builder.set(key, value.into_param());
    }
    let params = builder.build();

    let _ = expand(&Value::str(input.template), &params, input.recursive);
});
