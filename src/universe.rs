//! [`TypeUniverse`]: the read-only reflection surface the resolver needs
//! over the host's class/interface/function/enum universe.
//!
//! Rust has no ambient runtime reflection API, so (per spec Design Notes)
//! this crate defines the abstraction explicitly and leaves supplying a
//! concrete implementation to the embedder — typically something that
//! parses class declarations out of the source language being compiled for.
//! `demos/basic_resolve.rs` and the test suite use a small in-memory
//! `StaticUniverse` built directly from Rust literals.

use std::collections::HashMap;

/// Visibility of a reflected method or constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// A reflected declared type, collapsed to what the resolver cares about:
/// is it a single class, a nullable class, a union/intersection of names,
/// or one of the non-class pseudo-types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Class(String),
    NullableClass(String),
    Union(Vec<String>),
    Intersection(Vec<String>),
    Mixed,
    Object,
    Array,
    /// `string`, `int`, `bool`, `float`, etc.
    Scalar(String),
    Void,
}

impl TypeRef {
    /// A declared type counts as a "class type" for return-type inference
    /// (`resolveEntityType`) only if it is a single class name (nullable or
    /// not); `object`, `mixed`, and plain unions/intersections don't.
    pub fn as_single_class(&self) -> Option<&str> {
        match self {
            Self::Class(c) | Self::NullableClass(c) => Some(c),
            Self::Union(names) | Self::Intersection(names) if names.len() == 1 => {
                Some(names[0].as_str())
            }
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::NullableClass(_))
    }
}

/// One declared parameter of a reflected constructor, method, or function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub has_default: bool,
    /// `true` when the default value is specifically `null` (distinct from
    /// "has some default"), since that's what makes a required-but-missing
    /// class type legal to bind as `null`.
    pub default_is_null: bool,
    pub variadic: bool,
    /// For an `array`-typed parameter, the element class parsed out of a
    /// `@param Class[] $name` / `@param array<int, Class> $name` doc-comment,
    /// already resolved against the declaring class's namespace.
    pub array_doc_class: Option<String>,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            has_default: false,
            default_is_null: false,
            variadic: false,
            array_doc_class: None,
        }
    }

    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_default(mut self, is_null: bool) -> Self {
        self.has_default = true;
        self.default_is_null = is_null;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn with_array_doc_class(mut self, class: impl Into<String>) -> Self {
        self.array_doc_class = Some(class.into());
        self
    }
}

/// A reflected constructor, method, or free function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableSignature {
    pub visibility: Visibility,
    /// `true` for a method declared directly on a trait (not re-declared by
    /// the implementing class) — only relevant for non-static trait methods,
    /// which are rejected as non-callable per spec §4.1.
    pub is_trait_method: bool,
    pub is_static: bool,
    pub return_type: Option<TypeRef>,
    pub params: Vec<ParamInfo>,
}

impl CallableSignature {
    pub fn public(params: Vec<ParamInfo>) -> Self {
        Self {
            visibility: Visibility::Public,
            is_trait_method: false,
            is_static: false,
            return_type: None,
            params,
        }
    }

    pub fn with_return(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn is_callable_as_method(&self) -> bool {
        self.visibility == Visibility::Public && !(self.is_trait_method && !self.is_static)
    }
}

/// Read-only view of the host's class/interface/function/enum universe.
pub trait TypeUniverse {
    fn class_exists(&self, name: &str) -> bool;
    fn interface_exists(&self, name: &str) -> bool;
    fn is_abstract(&self, class: &str) -> bool;
    fn is_subclass_of(&self, class: &str, of: &str) -> bool;

    fn constructor(&self, class: &str) -> Option<CallableSignature>;
    fn method(&self, class: &str, method: &str) -> Option<CallableSignature>;
    fn function(&self, name: &str) -> Option<CallableSignature>;

    /// Resolve `Class::CONST`. `None` means the constant doesn't exist.
    fn class_constant(&self, class: &str, name: &str) -> Option<crate::entity::Literal>;
    /// Whether `Class::Case` names an enum case (vs. a plain constant).
    fn is_enum_case(&self, class: &str, name: &str) -> bool;

    fn record_dependency(&self, _reflection_of: &str) {}
}

/// A small, in-memory [`TypeUniverse`] built directly from Rust literals.
/// Useful for tests, demos, and any embedder that wants to hand-describe a
/// fixed set of classes rather than parse them out of source.
#[derive(Debug, Default, Clone)]
pub struct StaticUniverse {
    pub classes: HashMap<String, ClassInfo>,
    pub functions: HashMap<String, CallableSignature>,
}

#[derive(Debug, Default, Clone)]
pub struct ClassInfo {
    pub is_interface: bool,
    pub is_abstract: bool,
    pub parents: Vec<String>,
    pub constructor: Option<CallableSignature>,
    pub methods: HashMap<String, CallableSignature>,
    pub constants: HashMap<String, crate::entity::Literal>,
    pub enum_cases: Vec<String>,
}

impl StaticUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, name: impl Into<String>, info: ClassInfo) {
        self.classes.insert(name.into(), info);
    }

    pub fn add_function(&mut self, name: impl Into<String>, sig: CallableSignature) {
        self.functions.insert(name.into(), sig);
    }
}

impl TypeUniverse for StaticUniverse {
    fn class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    fn interface_exists(&self, name: &str) -> bool {
        self.classes.get(name).is_some_and(|c| c.is_interface)
    }

    fn is_abstract(&self, class: &str) -> bool {
        self.classes.get(class).is_some_and(|c| c.is_abstract)
    }

    fn is_subclass_of(&self, class: &str, of: &str) -> bool {
        if class == of {
            return true;
        }
        let Some(info) = self.classes.get(class) else {
            return false;
        };
        info.parents.iter().any(|p| p == of || self.is_subclass_of(p, of))
    }

    fn constructor(&self, class: &str) -> Option<CallableSignature> {
        self.classes.get(class)?.constructor.clone()
    }

    fn method(&self, class: &str, method: &str) -> Option<CallableSignature> {
        if let Some(sig) = self.classes.get(class)?.methods.get(method) {
            return Some(sig.clone());
        }
        let info = self.classes.get(class)?;
        info.parents.iter().find_map(|p| self.method(p, method))
    }

    fn function(&self, name: &str) -> Option<CallableSignature> {
        self.functions.get(name).cloned()
    }

    fn class_constant(&self, class: &str, name: &str) -> Option<crate::entity::Literal> {
        self.classes.get(class)?.constants.get(name).cloned()
    }

    fn is_enum_case(&self, class: &str, name: &str) -> bool {
        self.classes
            .get(class)
            .is_some_and(|c| c.enum_cases.iter().any(|case| case == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subclass_walks_parent_chain() {
        let mut u = StaticUniverse::new();
        u.add_class(
            "Base",
            ClassInfo {
                ..Default::default()
            },
        );
        u.add_class(
            "Mid",
            ClassInfo {
                parents: vec!["Base".into()],
                ..Default::default()
            },
        );
        u.add_class(
            "Leaf",
            ClassInfo {
                parents: vec!["Mid".into()],
                ..Default::default()
            },
        );
        assert!(u.is_subclass_of("Leaf", "Base"));
        assert!(!u.is_subclass_of("Base", "Leaf"));
    }

    #[test]
    fn trait_method_non_static_is_not_callable() {
        let sig = CallableSignature {
            visibility: Visibility::Public,
            is_trait_method: true,
            is_static: false,
            return_type: None,
            params: vec![],
        };
        assert!(!sig.is_callable_as_method());
    }

    #[test]
    fn single_class_extraction() {
        assert_eq!(TypeRef::Class("Foo".into()).as_single_class(), Some("Foo"));
        assert_eq!(TypeRef::Mixed.as_single_class(), None);
        assert_eq!(TypeRef::Object.as_single_class(), None);
    }
}
