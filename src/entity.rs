//! The symbolic data model: [`Reference`], [`Statement`], [`Value`] and the
//! literal scalars that flow through them.
//!
//! This is the "heterogeneous entity value" the design notes call out:
//! `entity` is a tagged sum (`Entity`) whose `Callable` variant itself nests
//! a tagged sum (`EntityHead`). Modeling it this way turns the recursive
//! descent in `complete_statement` into exhaustive pattern matching instead
//! of dynamic dispatch.

use std::fmt;

/// A symbolic pointer to a service: by name, by type, or to "the service
/// currently being resolved".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// The service currently being resolved (`@self` / setup callbacks).
    SelfRef,
    /// A definition key.
    Name(String),
    /// An unresolved class/interface name, to be revisited once the
    /// registry can answer type lookups.
    Type(String),
}

impl Reference {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn ty(name: impl Into<String>) -> Self {
        Self::Type(name.into())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfRef => write!(f, "@self"),
            Self::Name(n) => write!(f, "@{n}"),
            Self::Type(t) => write!(f, "@{t}"),
        }
    }
}

/// An expression whose concrete value is only known once the generated
/// container runs; carried symbolically as a fragment of target code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicParameter(pub String);

impl DynamicParameter {
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// Concatenate two dynamic-parameter expressions the way the host's
    /// `expand()` builds a PHP `.`-concatenation.
    pub fn concat(&self, other: &str) -> Self {
        Self(format!("{} . ({})", self.0, other))
    }
}

/// A literal scalar or composite config value (as produced by
/// `filterArguments`/`expand`, before/after normalization).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// `Class::CASE` — an enum literal marker kept symbolic (no runtime
    /// enum universe is assumed to exist in the reflection-consuming
    /// codegen layer).
    EnumCase(String, String),
    List(Vec<Value>),
    /// Insertion-ordered string-keyed map (config arrays with string keys).
    Map(Vec<(String, Value)>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::EnumCase(class, case) => write!(f, "{class}::{case}"),
            Self::List(_) | Self::Map(_) => write!(f, "<array>"),
        }
    }
}

/// Any value that can flow through a statement's argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(Literal),
    Reference(Reference),
    Statement(Box<Statement>),
    Dynamic(DynamicParameter),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Literal(Literal::Str(s.into()))
    }

    pub fn int(i: i64) -> Self {
        Self::Literal(Literal::Int(i))
    }

    pub fn reference(r: Reference) -> Self {
        Self::Reference(r)
    }

    pub fn statement(s: Statement) -> Self {
        Self::Statement(Box::new(s))
    }

    pub fn as_statement(&self) -> Option<&Statement> {
        match self {
            Self::Statement(s) => Some(s),
            _ => None,
        }
    }
}

/// The key under which an [`Argument`] is supplied: positional (its index in
/// declaration order) or named (a parameter name / config string key).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKey {
    Position(usize),
    Name(String),
}

impl ArgKey {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Position(_) => None,
        }
    }
}

/// One entry of a [`Statement`]'s argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub key: ArgKey,
    pub value: Value,
}

impl Argument {
    pub fn positional(index: usize, value: Value) -> Self {
        Self {
            key: ArgKey::Position(index),
            value,
        }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            key: ArgKey::Name(name.into()),
            value,
        }
    }
}

/// An ordered sequence of arguments mixing positional and named entries,
/// exactly as raw config does.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments(pub Vec<Argument>);

impl Arguments {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| Argument::positional(i, v))
                .collect(),
        )
    }

    pub fn push(&mut self, arg: Argument) {
        self.0.push(arg);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter()
    }
}

/// What a [`Statement`]'s `[head, member]` form calls through.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityHead {
    /// `head == ""` — a free (global) function call.
    Global,
    Class(String),
    Reference(Reference),
    Statement(Box<Statement>),
}

/// The thing a [`Statement`] invokes or constructs.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A class name, a builtin pseudo-function (`not`/`bool`/`int`/`float`/
    /// `string`), or a raw literal expression containing `?` (passthrough).
    Literal(String),
    /// Alias/call the referenced service.
    Reference(Reference),
    /// `[head, member]`: a method call, property read, or array append.
    Callable { head: EntityHead, member: String },
}

impl Entity {
    pub fn literal(name: impl Into<String>) -> Self {
        Self::Literal(name.into())
    }

    pub fn is_raw_expression(name: &str) -> bool {
        name.contains('?')
    }

    pub const BUILTINS: &'static [&'static str] = &["not", "bool", "int", "float", "string"];

    pub fn is_builtin(name: &str) -> bool {
        Self::BUILTINS.contains(&name)
    }
}

/// A symbolic `(entity, arguments)` expression: a service construction or a
/// method/function/property invocation. First-class and nestable.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub entity: Entity,
    pub arguments: Arguments,
}

impl Statement {
    pub fn new(entity: Entity, arguments: Arguments) -> Self {
        Self { entity, arguments }
    }

    pub fn class(name: impl Into<String>, arguments: Arguments) -> Self {
        Self::new(Entity::Literal(name.into()), arguments)
    }

    pub fn call(head: EntityHead, member: impl Into<String>, arguments: Arguments) -> Self {
        Self::new(
            Entity::Callable {
                head,
                member: member.into(),
            },
            arguments,
        )
    }

    pub fn reference(r: Reference) -> Self {
        Self::new(Entity::Reference(r), Arguments::new())
    }
}

/// Member-name shape recognized by `complete_statement`:
/// `(\?ident)+(\[\])?`, optionally prefixed by `$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Plain `method` / `Nullsafe?method` call.
    Method,
    /// `$name` — property read.
    Property,
    /// `$name[]` — array append (requires exactly one argument).
    ArrayAppend,
}

/// Validate and classify a `member` string per the grammar in spec §4.1.
pub fn classify_member(member: &str) -> Option<(MemberKind, String)> {
    let (kind, body) = if let Some(rest) = member.strip_prefix('$') {
        if let Some(name) = rest.strip_suffix("[]") {
            (MemberKind::ArrayAppend, name)
        } else {
            (MemberKind::Property, rest)
        }
    } else {
        (MemberKind::Method, member)
    };

    if body.is_empty() || !is_dotted_ident_chain(body) {
        return None;
    }
    Some((kind, body.to_string()))
}

/// `(\?ident)+` — one or more `?`-prefixed identifier segments concatenated
/// (nullsafe chaining is represented textually, not structurally).
fn is_dotted_ident_chain(s: &str) -> bool {
    let mut rest = s;
    let mut saw_segment = false;
    while !rest.is_empty() {
        rest = rest.strip_prefix('?').unwrap_or(rest);
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            return false;
        }
        saw_segment = true;
        rest = &rest[end..];
    }
    saw_segment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plain_method() {
        assert_eq!(classify_member("create"), Some((MemberKind::Method, "create".into())));
    }

    #[test]
    fn classifies_property_read() {
        assert_eq!(classify_member("$name"), Some((MemberKind::Property, "name".into())));
    }

    #[test]
    fn classifies_array_append() {
        assert_eq!(classify_member("$items[]"), Some((MemberKind::ArrayAppend, "items".into())));
    }

    #[test]
    fn classifies_nullsafe_chain() {
        assert_eq!(
            classify_member("?foo?bar"),
            Some((MemberKind::Method, "?foo?bar".into()))
        );
    }

    #[test]
    fn rejects_malformed_member() {
        assert_eq!(classify_member(""), None);
        assert_eq!(classify_member("$"), None);
        assert_eq!(classify_member("not valid!"), None);
    }

    #[test]
    fn builtin_recognition() {
        assert!(Entity::is_builtin("bool"));
        assert!(!Entity::is_builtin("Database"));
    }

    #[test]
    fn raw_expression_detection() {
        assert!(Entity::is_raw_expression("$a ? 1 : 0"));
        assert!(!Entity::is_raw_expression("Database"));
    }
}
