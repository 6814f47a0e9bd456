//! Error types for the resolver core.
//!
//! Mirrors the host language's exception hierarchy (`ServiceCreationException`,
//! `MissingServiceException`, `NotAllowedDuringResolvingException`) as a small
//! set of `thiserror` types rather than mutable-message exceptions. Context is
//! layered on at the two wrapping boundaries (`resolve_definition` /
//! `complete_definition` / `complete_statement`) instead of being mutated in
//! place, per the "Mutable-message exceptions" design note.

use thiserror::Error;

/// Which invariant a [`ServiceCreationError`] violates.
///
/// Kept alongside the message so callers that want to branch on error class
/// (rather than pattern-match strings) have something stable to match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CircularReference,
    UnknownServiceType,
    ClassNotFound,
    ClassIsAbstract,
    NonPublicConstructor,
    UnexpectedConstructorArgs,
    MethodNotCallable,
    UnknownConstant,
    FunctionNotFound,
    BadEntityName,
    ArgumentMismatch,
    IntersectionTypeUnsupported,
    UnionWithoutDefault,
    UnresolvedDependency,
    Other,
}

/// The resolver's primary error: equivalent to `ServiceCreationException`.
///
/// Carries a `kind` for programmatic matching and a `message` that
/// accumulates context (`[<descriptor>]\n` prefix, `\nRelated to ...` suffix)
/// as it crosses wrapping boundaries. Composition is idempotent: a message
/// that already starts with `[Service ` is not re-prefixed, and one that
/// already contains `\nRelated to` is not re-annotated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceCreationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceCreationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn circular_reference(cycle: &[String]) -> Self {
        Self::new(
            ErrorKind::CircularReference,
            format!("Circular reference detected for services: {}.", cycle.join(", ")),
        )
    }

    pub fn unknown_type(descriptor: &str) -> Self {
        Self::new(
            ErrorKind::UnknownServiceType,
            format!("Type of service '{descriptor}' is unknown."),
        )
    }

    pub fn not_found_in_definitions(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownServiceType,
            format!("Service '{name}' not found in definitions."),
        )
    }

    pub fn class_not_found(name: &str, is_interface: bool) -> Self {
        let mut message = format!("Class '{name}' not found.");
        if is_interface {
            message.push_str(" (did you mean 'implement'?)");
        }
        Self::new(ErrorKind::ClassNotFound, message)
    }

    pub fn class_is_abstract(name: &str) -> Self {
        Self::new(
            ErrorKind::ClassIsAbstract,
            format!("Class '{name}' is abstract and cannot be instantiated."),
        )
    }

    pub fn non_public_constructor(class: &str, method: &str) -> Self {
        Self::new(
            ErrorKind::NonPublicConstructor,
            format!("{class}::{method}() is not callable."),
        )
    }

    pub fn unexpected_constructor_args(class: &str) -> Self {
        Self::new(
            ErrorKind::UnexpectedConstructorArgs,
            format!("Unable to pass arguments, class '{class}' has no constructor."),
        )
    }

    pub fn method_not_callable(class: &str, method: &str) -> Self {
        Self::new(
            ErrorKind::MethodNotCallable,
            format!("{class}::{method}() is not callable."),
        )
    }

    pub fn constant_not_found(class: &str, name: &str) -> Self {
        Self::new(ErrorKind::UnknownConstant, format!("{class}::{name} constant doesn't exist."))
    }

    pub fn function_not_found(name: &str) -> Self {
        Self::new(ErrorKind::FunctionNotFound, format!("Function {name}() doesn't exist."))
    }

    pub fn bad_entity_name(name: &str) -> Self {
        Self::new(ErrorKind::BadEntityName, format!("Expected method name, '{name}' given."))
    }

    pub fn argument_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentMismatch, message)
    }

    pub fn intersection_unsupported(param: &str) -> Self {
        Self::new(
            ErrorKind::IntersectionTypeUnsupported,
            format!("Parameter ${param}: intersection types must be specified explicitly."),
        )
    }

    pub fn union_without_default(param: &str) -> Self {
        Self::new(
            ErrorKind::UnionWithoutDefault,
            format!("Parameter ${param}: union types must have a default value."),
        )
    }

    pub fn unresolved_dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnresolvedDependency, message)
    }

    /// Prefix with `[<descriptor>]\n`, unless the message is already wrapped.
    pub fn with_descriptor(mut self, descriptor: &str) -> Self {
        if !self.message.starts_with("[Service ") {
            self.message = format!("[{descriptor}]\n{}", strip_class_prefixes(&self.message));
        }
        self
    }

    /// Append `\nRelated to <entity>[ in setup]`, unless already present.
    pub fn related_to(mut self, entity: &str, in_setup: bool) -> Self {
        if !self.message.contains("\nRelated to") {
            let suffix = if in_setup { " in setup" } else { "" };
            self.message = format!("{}\nRelated to {entity}{suffix}", self.message);
        }
        self
    }

    /// Append ` Required by parameter $<name>`, used when re-throwing a
    /// `ServiceCreationError` raised while autowiring an argument.
    pub fn required_by(mut self, param: &str) -> Self {
        self.message = format!("{} (required by parameter ${param})", self.message);
        self
    }
}

/// Readability pass: `ClassName::method` substrings lose their fully
/// qualified prefix. Mirrors the host's `completeException` behavior of
/// stripping namespace noise from reflection-derived messages.
fn strip_class_prefixes(message: &str) -> String {
    message
        .split_inclusive(|c: char| c.is_whitespace())
        .map(|word| match word.rfind("\\") {
            Some(idx) if word.contains("::") => word[idx + 1..].to_string(),
            _ => word.to_string(),
        })
        .collect()
}

/// Equivalent to `MissingServiceException`: raised when `getByType` cannot
/// find (or is not allowed to return) a matching service, and converted to
/// `None` by the autowiring argument matcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Service of type '{type_name}' not found.")]
pub struct MissingServiceError {
    pub type_name: String,
}

impl MissingServiceError {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

/// Equivalent to `NotAllowedDuringResolvingException`: raised by the
/// registry when a type-based lookup cannot be answered yet because Phase 1
/// is still in progress. Caught by `normalize_reference`, which leaves the
/// reference unresolved (`Reference::Type`) rather than propagating.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("Not allowed during resolving.")]
pub struct NotAllowedDuringResolvingError;

/// Raised by `expand()`/`escape()` helpers; distinct from
/// `ServiceCreationError` because the host raises these as
/// `InvalidArgumentException`, not `ServiceCreationException`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("Missing parameter '{0}'.")]
    Missing(String),

    #[error("Circular reference detected for parameters: {0}.")]
    Circular(String),

    #[error("Unable to concatenate non-scalar parameter '{0}'.")]
    NonScalarConcat(String),
}

/// Top-level error returned by every public resolver operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error(transparent)]
    ServiceCreation(#[from] ServiceCreationError),

    #[error(transparent)]
    MissingService(#[from] MissingServiceError),

    #[error(transparent)]
    NotAllowedDuringResolving(#[from] NotAllowedDuringResolvingError),

    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),
}

impl ResolverError {
    /// Wrap at a Phase 1/2 boundary, adding the descriptor prefix. Only
    /// `ServiceCreationError` carries context; other variants pass through
    /// unchanged (they are not supposed to escape a single definition).
    pub fn with_descriptor(self, descriptor: &str) -> Self {
        match self {
            Self::ServiceCreation(e) => Self::ServiceCreation(e.with_descriptor(descriptor)),
            other => other,
        }
    }

    pub fn related_to(self, entity: &str, in_setup: bool) -> Self {
        match self {
            Self::ServiceCreation(e) => Self::ServiceCreation(e.related_to(entity, in_setup)),
            other => other,
        }
    }

    pub fn is_missing_service(&self) -> bool {
        matches!(self, Self::MissingService(_))
    }
}

/// Result type alias used throughout the resolver.
pub type Result<T> = std::result::Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_prefix_is_idempotent() {
        let e = ServiceCreationError::unknown_type("one").with_descriptor("Service one");
        let e2 = e.clone().with_descriptor("Service one (again)");
        assert_eq!(e, e2, "re-wrapping an already-prefixed message is a no-op");
        assert!(e.message.starts_with("[Service one]\n"));
    }

    #[test]
    fn related_to_is_idempotent() {
        let e = ServiceCreationError::unknown_type("one")
            .related_to("Factory::create()", false)
            .related_to("SomethingElse", true);
        assert_eq!(e.message.matches("Related to").count(), 1);
        assert!(e.message.ends_with("Related to Factory::create()"));
    }

    #[test]
    fn strips_namespace_prefix_from_method_refs() {
        let e = ServiceCreationError::new(ErrorKind::Other, "App\\Services\\Factory::create() failed");
        let wrapped = e.with_descriptor("Service one");
        assert!(wrapped.message.contains("Factory::create() failed"));
        assert!(!wrapped.message.contains("App\\Services\\Factory"));
    }

    #[test]
    fn missing_service_converts_cleanly() {
        let err: ResolverError = MissingServiceError::new("Logger").into();
        assert!(err.is_missing_service());
    }
}
