//! `%placeholder%` expansion against a [`Params`] tree, plus the
//! `escape`/`filter_arguments`/`prefix_service_name` helpers from spec §4.3.
//!
//! Modeled on the teacher's fluent [`crate::universe`]-adjacent builder
//! style (see `typed.rs`'s `TypedBuilder`): `ParamsBuilder` assembles a
//! `Params` tree without forcing callers to hand-build the `Param` enum.

use std::collections::HashSet;

use crate::entity::{Arguments, DynamicParameter, Entity, Literal, Reference, Statement, Value};
use crate::error::{PlaceholderError, Result};

/// One leaf or branch of the parameter tree consumed by `expand`.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Param>),
    Map(Vec<(String, Param)>),
    Dynamic(DynamicParameter),
}

impl Param {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    fn get(&self, key: &str) -> Option<&Param> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    fn as_scalar_string(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::List(_) | Self::Map(_) | Self::Dynamic(_) => None,
        }
    }
}

/// Fluent assembly of a [`Params`] tree.
#[derive(Debug, Default, Clone)]
pub struct ParamsBuilder {
    entries: Vec<(String, Param)>,
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: Param) -> Self {
        self.entries.push((key.into(), value));
        self
    }

    pub fn build(self) -> Params {
        Params(Param::Map(self.entries))
    }
}

/// Root of the parameter mapping `expand` resolves `%name%` placeholders
/// against; this crate's stand-in for the loader's config surface.
#[derive(Debug, Clone)]
pub struct Params(Param);

impl Params {
    pub fn root(&self) -> &Param {
        &self.0
    }

    fn lookup(&self, path: &str) -> Option<&Param> {
        let mut node = &self.0;
        for segment in path.split('.') {
            node = node.get(segment)?;
        }
        Some(node)
    }
}

/// Doubles every `%` and every leading `@` in strings, so literal config
/// values survive a later `expand`/reference pass unscathed.
pub fn escape(value: &Value) -> Value {
    match value {
        Value::Literal(Literal::Str(s)) => Value::Literal(Literal::Str(escape_str(s))),
        Value::Literal(Literal::List(items)) => Value::Literal(Literal::List(items.iter().map(escape).collect())),
        Value::Literal(Literal::Map(entries)) => Value::Literal(Literal::Map(
            entries.iter().map(|(k, v)| (escape_str(k), escape(v))).collect(),
        )),
        other => other.clone(),
    }
}

fn escape_str(s: &str) -> String {
    let doubled_percent = s.replace('%', "%%");
    if let Some(rest) = doubled_percent.strip_prefix('@') {
        format!("@@{rest}")
    } else {
        doubled_percent
    }
}

/// Recursively expand `%name%`/`%a.b%` placeholders in `value` against
/// `params`. `recursive` enables nested expansion (placeholders whose
/// substituted value itself contains placeholders) with cycle detection.
pub fn expand(value: &Value, params: &Params, recursive: bool) -> Result<Value> {
    expand_inner(value, params, recursive, &mut HashSet::new())
}

fn expand_inner(value: &Value, params: &Params, recursive: bool, visiting: &mut HashSet<String>) -> Result<Value> {
    match value {
        Value::Literal(Literal::Str(s)) => expand_str(s, params, recursive, visiting),
        Value::Literal(Literal::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(expand_inner(item, params, recursive, visiting)?);
            }
            Ok(Value::Literal(Literal::List(out)))
        }
        Value::Literal(Literal::Map(entries)) => {
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                out.push((k.clone(), expand_inner(v, params, recursive, visiting)?));
            }
            Ok(Value::Literal(Literal::Map(out)))
        }
        Value::Statement(s) => Ok(Value::statement(Statement::new(
            s.entity.clone(),
            expand_arguments(&s.arguments, params, recursive, visiting)?,
        ))),
        other => Ok(other.clone()),
    }
}

fn expand_arguments(
    args: &Arguments,
    params: &Params,
    recursive: bool,
    visiting: &mut HashSet<String>,
) -> Result<Arguments> {
    let mut out = Arguments::new();
    for arg in args.iter() {
        out.push(crate::entity::Argument {
            key: arg.key.clone(),
            value: expand_inner(&arg.value, params, recursive, visiting)?,
        });
    }
    Ok(out)
}

/// Split `s` on `%([\w.-]*)%` and resolve each placeholder.
fn expand_str(s: &str, params: &Params, recursive: bool, visiting: &mut HashSet<String>) -> Result<Value> {
    if s == "%parameters%" {
        return Ok(params_to_value(params.root()));
    }

    let mut pieces: Vec<(bool, String)> = Vec::new(); // (is_placeholder, text)
    let mut rest = s;
    while let Some(start) = rest.find('%') {
        if start > 0 {
            pieces.push((false, rest[..start].to_string()));
        }
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            pieces.push((false, rest[start..].to_string()));
            rest = "";
            break;
        };
        let name = &after[..end];
        if name.is_empty() {
            pieces.push((false, "%".to_string()));
        } else {
            pieces.push((true, name.to_string()));
        }
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        pieces.push((false, rest.to_string()));
    }

    if pieces.len() == 1 && pieces[0].0 {
        return resolve_placeholder(&pieces[0].1, params, recursive, visiting);
    }

    enum Acc {
        Str(String),
        Dyn(String),
    }

    let mut acc = Acc::Str(String::new());

    for (is_placeholder, text) in pieces {
        let resolved = if is_placeholder {
            resolve_placeholder(&text, params, recursive, visiting)?
        } else {
            Value::str(text)
        };

        acc = match (acc, &resolved) {
            (Acc::Str(s), Value::Dynamic(d)) => Acc::Dyn(format!("'{}' . ({})", s.replace('\'', "\\'"), d.0)),
            (Acc::Str(mut s), other) => {
                s.push_str(&value_as_scalar_string(other)?);
                Acc::Str(s)
            }
            (Acc::Dyn(e), Value::Dynamic(d)) => Acc::Dyn(format!("{e} . ({})", d.0)),
            (Acc::Dyn(e), other) => {
                let scalar = value_as_scalar_string(other)?;
                Acc::Dyn(format!("{e} . '{}'", scalar.replace('\'', "\\'")))
            }
        };
    }

    Ok(match acc {
        Acc::Str(s) => Value::str(s),
        Acc::Dyn(e) => Value::Dynamic(DynamicParameter::new(e)),
    })
}

fn resolve_placeholder(name: &str, params: &Params, recursive: bool, visiting: &mut HashSet<String>) -> Result<Value> {
    if recursive {
        if !visiting.insert(name.to_string()) {
            let mut names: Vec<_> = visiting.iter().cloned().collect();
            names.push(name.to_string());
            return Err(PlaceholderError::Circular(names.join(", ")).into());
        }
    }

    let found = params
        .lookup(name)
        .ok_or_else(|| PlaceholderError::Missing(name.to_string()))?
        .clone();

    let result = match &found {
        Param::Dynamic(d) => Ok(Value::Dynamic(d.clone())),
        other => {
            let as_value = param_to_value(other);
            if recursive {
                expand_inner(&as_value, params, recursive, visiting)
            } else {
                Ok(as_value)
            }
        }
    };

    if recursive {
        visiting.remove(name);
    }
    result
}

fn param_to_value(p: &Param) -> Value {
    match p {
        Param::Null => Value::Literal(Literal::Null),
        Param::Bool(b) => Value::Literal(Literal::Bool(*b)),
        Param::Int(i) => Value::Literal(Literal::Int(*i)),
        Param::Float(f) => Value::Literal(Literal::Float(*f)),
        Param::Str(s) => Value::str(s.clone()),
        Param::List(items) => Value::Literal(Literal::List(items.iter().map(param_to_value).collect())),
        Param::Map(entries) => Value::Literal(Literal::Map(
            entries.iter().map(|(k, v)| (k.clone(), param_to_value(v))).collect(),
        )),
        Param::Dynamic(d) => Value::Dynamic(d.clone()),
    }
}

fn params_to_value(p: &Param) -> Value {
    param_to_value(p)
}

fn value_as_scalar_string(v: &Value) -> Result<String> {
    match v {
        Value::Literal(l) => Ok(scalar_literal_to_string(l)?),
        Value::Dynamic(_) => unreachable!("dynamic values are handled by the caller before reaching here"),
        _ => Err(PlaceholderError::NonScalarConcat("<value>".into()).into()),
    }
}

fn scalar_literal_to_string(l: &Literal) -> Result<String> {
    match l {
        Literal::Null => Ok(String::new()),
        Literal::Bool(b) => Ok(b.to_string()),
        Literal::Int(i) => Ok(i.to_string()),
        Literal::Float(f) => Ok(f.to_string()),
        Literal::Str(s) => Ok(s.clone()),
        Literal::EnumCase(_, _) | Literal::List(_) | Literal::Map(_) => {
            Err(PlaceholderError::NonScalarConcat(l.to_string()).into())
        }
    }
}

/// Pre-normalizes raw config arguments: `@name` → `Reference`, `Class::CASE`
/// → enum literal marker, `Class::CONST` → resolved constant, nested
/// statements recurse.
pub fn filter_arguments(args: &Arguments, universe: &dyn crate::universe::TypeUniverse) -> Result<Arguments> {
    let mut out = Arguments::new();
    for arg in args.iter() {
        out.push(crate::entity::Argument {
            key: arg.key.clone(),
            value: filter_value(&arg.value, universe)?,
        });
    }
    Ok(out)
}

fn filter_value(value: &Value, universe: &dyn crate::universe::TypeUniverse) -> Result<Value> {
    match value {
        Value::Literal(Literal::Str(s)) if s.starts_with('@') && !s.starts_with("@@") => {
            Ok(Value::reference(Reference::name(s[1..].to_string())))
        }
        Value::Literal(Literal::Str(s)) => {
            if let Some((class, member)) = s.split_once("::") {
                if member.chars().all(|c| c.is_ascii_uppercase() || c == '_') && !member.is_empty() {
                    if universe.is_enum_case(class, member) {
                        return Ok(Value::Literal(Literal::EnumCase(class.to_string(), member.to_string())));
                    }
                    if let Some(literal) = universe.class_constant(class, member) {
                        return Ok(Value::Literal(literal));
                    }
                }
            }
            Ok(value.clone())
        }
        Value::Statement(s) => Ok(Value::statement(Statement::new(
            s.entity.clone(),
            filter_arguments(&s.arguments, universe)?,
        ))),
        Value::Literal(Literal::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(filter_value(item, universe)?);
            }
            Ok(Value::Literal(Literal::List(out)))
        }
        Value::Literal(Literal::Map(entries)) => {
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                out.push((k.clone(), filter_value(v, universe)?));
            }
            Ok(Value::Literal(Literal::Map(out)))
        }
        other => Ok(other.clone()),
    }
}

/// Rewrites `@extension.X` / `Reference("extension.X")` to carry `ns` as a
/// namespace prefix; recurses into statements and arrays.
pub fn prefix_service_name(value: &Value, ns: &str) -> Value {
    match value {
        Value::Reference(Reference::Name(n)) => Value::reference(Reference::name(format!("{ns}.{n}"))),
        Value::Literal(Literal::Str(s)) if s.starts_with('@') && !s.starts_with("@@") => {
            Value::str(format!("@{ns}.{}", &s[1..]))
        }
        Value::Statement(s) => Value::statement(Statement::new(
            prefix_entity(&s.entity, ns),
            Arguments(s.arguments.iter().map(|a| crate::entity::Argument {
                key: a.key.clone(),
                value: prefix_service_name(&a.value, ns),
            }).collect()),
        )),
        Value::Literal(Literal::List(items)) => {
            Value::Literal(Literal::List(items.iter().map(|v| prefix_service_name(v, ns)).collect()))
        }
        Value::Literal(Literal::Map(entries)) => Value::Literal(Literal::Map(
            entries.iter().map(|(k, v)| (k.clone(), prefix_service_name(v, ns))).collect(),
        )),
        other => other.clone(),
    }
}

fn prefix_entity(entity: &Entity, ns: &str) -> Entity {
    match entity {
        Entity::Reference(Reference::Name(n)) => Entity::Reference(Reference::name(format!("{ns}.{n}"))),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_spanning_whole_string_returns_raw_value() {
        let params = ParamsBuilder::new().set("flag", Param::Bool(true)).build();
        let result = expand(&Value::str("%flag%"), &params, false).unwrap();
        assert_eq!(result, Value::Literal(Literal::Bool(true)));
    }

    #[test]
    fn dotted_placeholder_concatenation() {
        let params = ParamsBuilder::new()
            .set(
                "db",
                Param::Map(vec![("host".into(), Param::str("x")), ("port".into(), Param::Int(5))]),
            )
            .build();
        let result = expand(&Value::str("%db.host%:%db.port%"), &params, false).unwrap();
        assert_eq!(result, Value::str("x:5"));
    }

    #[test]
    fn dynamic_parameter_propagates_through_concatenation() {
        let params = ParamsBuilder::new()
            .set(
                "db",
                Param::Map(vec![
                    ("host".into(), Param::str("x")),
                    ("port".into(), Param::Dynamic(DynamicParameter::new("$cfg['port']"))),
                ]),
            )
            .build();
        let result = expand(&Value::str("%db.host%:%db.port%"), &params, false).unwrap();
        match result {
            Value::Dynamic(d) => assert!(d.0.contains("$cfg['port']"), "got: {}", d.0),
            other => panic!("expected Dynamic, got {other:?}"),
        }
    }

    #[test]
    fn circular_placeholder_detected() {
        let params = ParamsBuilder::new().set("a", Param::str("%b%")).set("b", Param::str("%a%")).build();
        let err = expand(&Value::str("%a%"), &params, true).unwrap_err();
        match err {
            crate::error::ResolverError::Placeholder(PlaceholderError::Circular(names)) => {
                assert!(names.contains('a') && names.contains('b'));
            }
            other => panic!("expected Circular placeholder error, got {other:?}"),
        }
    }

    #[test]
    fn literal_double_percent_is_literal_percent() {
        let params = ParamsBuilder::new().build();
        let result = expand(&Value::str("100%% done"), &params, false).unwrap();
        assert_eq!(result, Value::str("100% done"));
    }

    #[test]
    fn escape_then_expand_round_trips() {
        let original = Value::str("50% @admin");
        let escaped = escape(&original);
        let params = ParamsBuilder::new().build();
        let result = expand(&escaped, &params, false).unwrap();
        assert_eq!(result, original);
    }

    #[test]
    fn missing_parameter_errors() {
        let params = ParamsBuilder::new().build();
        let err = expand(&Value::str("%nope%"), &params, false).unwrap_err();
        assert!(matches!(err, crate::error::ResolverError::Placeholder(PlaceholderError::Missing(_))));
    }
}
