//! `autowire_arguments`: merge caller-supplied arguments with values
//! inferred from declared parameter types.
//!
//! Kept free of any `Resolver`/`Registry` dependency — it only needs a
//! [`Getter`] to ask "what service(s) satisfy this type", which lets it be
//! unit-tested against a fake getter instead of a full resolver + universe.

use std::collections::{HashMap, VecDeque};

use crate::entity::{ArgKey, Argument, Arguments, Literal, Value};
use crate::error::{ResolverError, Result, ServiceCreationError};
use crate::universe::{CallableSignature, ParamInfo, TypeRef};

/// What a type-based lookup hands back.
pub enum GetterResult {
    /// Result of a `single = true` lookup: `None` if nothing matched.
    Single(Option<Value>),
    /// Result of a `single = false` (array/doc-class) lookup: always a list,
    /// possibly empty.
    Many(Vec<Value>),
}

/// Abstraction over "find service(s) assignable to this type", so this
/// module doesn't need to know about `Registry`/`Resolver` directly.
pub trait Getter {
    fn get(&self, type_name: &str, single: bool) -> Result<GetterResult>;
}

/// Merge `supplied` against `sig`'s declared parameters, filling gaps via
/// `getter`. See spec §4.2 for the per-parameter algorithm.
pub fn autowire_arguments(sig: &CallableSignature, supplied: Arguments, getter: &dyn Getter) -> Result<Arguments> {
    let mut positional: VecDeque<Value> = VecDeque::new();
    let mut named: HashMap<String, Value> = HashMap::new();
    for arg in supplied.0 {
        match arg.key {
            ArgKey::Position(_) => positional.push_back(arg.value),
            ArgKey::Name(n) => {
                named.insert(n, arg.value);
            }
        }
    }

    let mut out = Arguments::new();
    let mut use_name = false;
    let mut position = 0usize;

    for param in &sig.params {
        if param.variadic {
            emit_variadic(param, &mut named, &mut positional, &mut out, use_name, &mut position);
            continue;
        }

        if let Some(v) = named.remove(&param.name) {
            push_param(&mut out, param, v, use_name, &mut position);
            continue;
        }

        if !use_name {
            if let Some(v) = positional.pop_front() {
                push_param(&mut out, param, v, use_name, &mut position);
                continue;
            }
        }

        match autowire_one(param, getter)? {
            Some(v) => push_param(&mut out, param, v, use_name, &mut position),
            None if param.has_default => {
                use_name = true;
            }
            None => {
                #[cfg(feature = "logging")]
                tracing::warn!(
                    target: "resolver_core",
                    param = %param.name,
                    "required parameter left unresolved by autowiring; emitting null (deprecated)"
                );
                push_param(&mut out, param, Value::Literal(Literal::Null), use_name, &mut position);
            }
        }
    }

    if use_name {
        if !positional.is_empty() || !named.is_empty() {
            return Err(ServiceCreationError::argument_mismatch(
                "Unable to pass specified arguments to the constructor/method.",
            )
            .into());
        }
    } else {
        for v in positional {
            out.push(Argument::positional(position, v));
            position += 1;
        }
        if !named.is_empty() {
            return Err(ServiceCreationError::argument_mismatch(format!(
                "Unknown named arguments: {}.",
                named.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
            .into());
        }
    }

    Ok(out)
}

fn emit_variadic(
    param: &ParamInfo,
    named: &mut HashMap<String, Value>,
    positional: &mut VecDeque<Value>,
    out: &mut Arguments,
    use_name: bool,
    position: &mut usize,
) {
    let items: Vec<Value> = if let Some(v) = named.remove(&param.name) {
        match v {
            Value::Literal(Literal::List(items)) => items,
            other => vec![other],
        }
    } else {
        positional.drain(..).collect()
    };
    for item in items {
        if use_name {
            out.push(Argument::named(param.name.clone(), item));
        } else {
            out.push(Argument::positional(*position, item));
            *position += 1;
        }
    }
}

fn push_param(out: &mut Arguments, param: &ParamInfo, value: Value, use_name: bool, position: &mut usize) {
    if use_name {
        out.push(Argument::named(param.name.clone(), value));
    } else {
        out.push(Argument::positional(*position, value));
        *position += 1;
    }
}

/// Try to satisfy one declared, unsupplied parameter by type. `Ok(None)`
/// means "no autowiring candidate" — the caller decides whether that's an
/// optional skip or a required-but-unresolved emission.
fn autowire_one(param: &ParamInfo, getter: &dyn Getter) -> Result<Option<Value>> {
    let Some(ty) = &param.ty else {
        return Ok(None);
    };

    match ty {
        TypeRef::Intersection(_) => Err(ServiceCreationError::intersection_unsupported(&param.name).into()),

        TypeRef::Class(c) | TypeRef::NullableClass(c) => single_lookup(c, param, getter),

        TypeRef::Union(names) if names.len() == 1 => single_lookup(&names[0], param, getter),

        TypeRef::Union(_) => {
            if param.has_default {
                Ok(None)
            } else {
                Err(ServiceCreationError::union_without_default(&param.name).into())
            }
        }

        TypeRef::Array => match &param.array_doc_class {
            Some(class) => match getter.get(class, false)? {
                GetterResult::Many(items) => Ok(Some(Value::Literal(Literal::List(items)))),
                GetterResult::Single(_) => unreachable!("list lookup returned a single value"),
            },
            None => Ok(None),
        },

        TypeRef::Mixed | TypeRef::Object if !param.has_default => {
            Err(ServiceCreationError::union_without_default(&param.name).into())
        }

        TypeRef::Mixed | TypeRef::Object | TypeRef::Void | TypeRef::Scalar(_) => Ok(None),
    }
}

fn single_lookup(class: &str, param: &ParamInfo, getter: &dyn Getter) -> Result<Option<Value>> {
    match getter.get(class, true) {
        Ok(GetterResult::Single(v)) => Ok(v),
        Ok(GetterResult::Many(_)) => unreachable!("single lookup returned a list"),
        Err(ResolverError::MissingService(_)) => Ok(None),
        Err(ResolverError::ServiceCreation(e)) => Err(ResolverError::ServiceCreation(e.required_by(&param.name))),
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Reference;
    use crate::universe::ParamInfo as PI;

    struct FakeGetter {
        answers: HashMap<String, Value>,
    }

    impl Getter for FakeGetter {
        fn get(&self, type_name: &str, single: bool) -> Result<GetterResult> {
            if single {
                Ok(GetterResult::Single(self.answers.get(type_name).cloned()))
            } else {
                Ok(GetterResult::Many(self.answers.get(type_name).cloned().into_iter().collect()))
            }
        }
    }

    #[test]
    fn autowires_single_class_param() {
        let sig = CallableSignature::public(vec![PI::new("logger").with_type(TypeRef::Class("Logger".into()))]);
        let getter = FakeGetter {
            answers: HashMap::from([("Logger".into(), Value::reference(Reference::name("logger")))]),
        };
        let result = autowire_arguments(&sig, Arguments::new(), &getter).unwrap();
        assert_eq!(result.0, vec![Argument::positional(0, Value::reference(Reference::name("logger")))]);
    }

    #[test]
    fn missing_optional_class_param_is_skipped() {
        let sig = CallableSignature::public(vec![PI::new("logger")
            .with_type(TypeRef::NullableClass("Logger".into()))
            .with_default(true)]);
        let getter = FakeGetter { answers: HashMap::new() };
        let result = autowire_arguments(&sig, Arguments::new(), &getter).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn supplied_positional_argument_wins_over_autowiring() {
        let sig = CallableSignature::public(vec![PI::new("logger").with_type(TypeRef::Class("Logger".into()))]);
        let getter = FakeGetter {
            answers: HashMap::from([("Logger".into(), Value::reference(Reference::name("wrong")))]),
        };
        let supplied = Arguments::positional(vec![Value::reference(Reference::name("explicit"))]);
        let result = autowire_arguments(&sig, supplied, &getter).unwrap();
        assert_eq!(result.0, vec![Argument::positional(0, Value::reference(Reference::name("explicit")))]);
    }

    #[test]
    fn intersection_type_is_rejected() {
        let sig = CallableSignature::public(vec![
            PI::new("x").with_type(TypeRef::Intersection(vec!["A".into(), "B".into()]))
        ]);
        let getter = FakeGetter { answers: HashMap::new() };
        assert!(autowire_arguments(&sig, Arguments::new(), &getter).is_err());
    }

    #[test]
    fn variadic_drains_remaining_positional_tail() {
        let sig = CallableSignature::public(vec![PI::new("rest").variadic()]);
        let supplied = Arguments::positional(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let getter = FakeGetter { answers: HashMap::new() };
        let result = autowire_arguments(&sig, supplied, &getter).unwrap();
        assert_eq!(result.len(), 3);
    }
}
