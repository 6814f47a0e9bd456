//! [`Resolver`]: the two-phase `resolveDefinition`/`completeDefinition`
//! pipeline — the centerpiece of this crate.
//!
//! Phase 1 (type resolution) may recurse into other definitions through
//! references; Phase 2 (statement completion) never creates new definitions.
//! The recursion set and the `currentService*` scope are both pair-managed:
//! entered at the top of an operation, always cleared on every exit path,
//! success or failure alike.

use std::cell::RefCell;

use crate::autowire::{self, Getter, GetterResult};
use crate::definition::Definition;
use crate::entity::{ArgKey, Argument, Arguments, Entity, EntityHead, Literal, Reference, Statement, Value};
use crate::error::{MissingServiceError, ResolverError, Result, ServiceCreationError};
use crate::registry::{GetByTypeError, Registry};
use crate::universe::TypeUniverse;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct ScopeState {
    current_service: Option<String>,
    current_service_type: Option<String>,
    current_service_allowed: bool,
}

pub struct Resolver<'r> {
    registry: &'r Registry,
    universe: &'r dyn TypeUniverse,
    recursive: RefCell<Vec<String>>,
    scope: RefCell<Option<ScopeState>>,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, universe: &'r dyn TypeUniverse) -> Self {
        Self {
            registry,
            universe,
            recursive: RefCell::new(Vec::new()),
            scope: RefCell::new(None),
        }
    }

    fn current_service_name(&self) -> Option<String> {
        self.scope.borrow().as_ref().and_then(|s| s.current_service.clone())
    }

    fn current_service_type(&self) -> Option<String> {
        self.scope.borrow().as_ref().and_then(|s| s.current_service_type.clone())
    }

    fn current_service_allowed(&self) -> bool {
        self.scope.borrow().as_ref().is_some_and(|s| s.current_service_allowed)
    }

    fn enter_scope<T>(&self, state: ScopeState, f: impl FnOnce() -> Result<T>) -> Result<T> {
        *self.scope.borrow_mut() = Some(state);
        let result = f();
        *self.scope.borrow_mut() = None;
        result
    }

    fn with_service_allowed<T>(&self, allowed: bool, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let previous = self.scope.borrow().as_ref().map(|s| s.current_service_allowed);
        if let Some(s) = self.scope.borrow_mut().as_mut() {
            s.current_service_allowed = allowed;
        }
        let result = f();
        if let Some(prev) = previous {
            if let Some(s) = self.scope.borrow_mut().as_mut() {
                s.current_service_allowed = prev;
            }
        }
        result
    }

    // ---- Phase 1: type resolution -----------------------------------

    pub fn resolve_definition(&self, def: &Definition) -> Result<()> {
        let name = def.name().to_string();
        if self.recursive.borrow().iter().any(|n| n == &name) {
            let cycle = self.recursive.borrow().clone();
            return Err(ServiceCreationError::circular_reference(&cycle).into());
        }

        #[cfg(feature = "logging")]
        trace!(target: "resolver_core", service = %name, "resolving definition type");

        self.recursive.borrow_mut().push(name.clone());
        let outcome = self.resolve_definition_inner(def);
        self.recursive.borrow_mut().retain(|n| n != &name);

        outcome.map_err(|e| e.with_descriptor(&def.descriptor()))
    }

    fn resolve_definition_inner(&self, def: &Definition) -> Result<()> {
        if def.service_type().is_none() {
            if let Some(ty) = self.resolve_entity_type(&def.creator())? {
                def.set_service_type(ty);
            }
        }
        if def.service_type().is_none() {
            return Err(ServiceCreationError::unknown_type(&def.descriptor()).into());
        }
        Ok(())
    }

    pub fn resolve_entity_type(&self, statement: &Statement) -> Result<Option<String>> {
        match &statement.entity {
            Entity::Literal(name) => {
                if Entity::is_raw_expression(name) || Entity::is_builtin(name) {
                    return Ok(None);
                }
                if !self.universe.class_exists(name) {
                    return Err(
                        ServiceCreationError::class_not_found(name, self.universe.interface_exists(name)).into(),
                    );
                }
                Ok(Some(name.clone()))
            }
            Entity::Reference(r) => self.resolve_reference_type(r),
            Entity::Callable { head, member } => self.resolve_callable_return_type(head, member),
        }
    }

    fn resolve_callable_return_type(&self, head: &EntityHead, member: &str) -> Result<Option<String>> {
        let head_type = match head {
            EntityHead::Global => None,
            EntityHead::Class(c) => Some(c.clone()),
            EntityHead::Reference(r) => self.resolve_reference_type(r)?,
            EntityHead::Statement(s) => self.resolve_entity_type(s)?,
        };

        let (sig, class_for_err) = if matches!(head, EntityHead::Global) {
            let sig = self
                .universe
                .function(member)
                .ok_or_else(|| ServiceCreationError::function_not_found(member))?;
            (sig, String::new())
        } else {
            let class = head_type
                .clone()
                .ok_or_else(|| ServiceCreationError::unknown_type(member))?;
            let sig = self
                .universe
                .method(&class, member)
                .ok_or_else(|| ServiceCreationError::method_not_callable(&class, member))?;
            (sig, class)
        };

        if !sig.is_callable_as_method() {
            return Err(ServiceCreationError::method_not_callable(&class_for_err, member).into());
        }

        if matches!(head, EntityHead::Global) {
            self.registry.add_dependency(member.to_string());
        } else {
            self.registry.add_dependency(format!("{class_for_err}::{member}"));
        }

        Ok(sig.return_type.as_ref().and_then(|t| t.as_single_class()).map(str::to_string))
    }

    pub fn resolve_reference_type(&self, r: &Reference) -> Result<Option<String>> {
        match r {
            Reference::SelfRef => Ok(self.current_service_type()),
            Reference::Type(t) => Ok(Some(t.trim_start_matches('\\').to_string())),
            Reference::Name(n) => {
                let def = self
                    .registry
                    .get_definition(n)
                    .ok_or_else(|| ServiceCreationError::not_found_in_definitions(n))?;
                if def.service_type().is_none() {
                    self.resolve_definition(def)?;
                }
                Ok(def.service_type())
            }
        }
    }

    // ---- Phase 2: statement completion -------------------------------

    pub fn complete_definition(&self, def: &Definition) -> Result<()> {
        #[cfg(feature = "logging")]
        debug!(target: "resolver_core", service = %def.name(), "completing definition");

        let current_service = self.registry.has_definition(def.name()).then(|| def.name().to_string());
        let state = ScopeState {
            current_service,
            current_service_type: def.service_type(),
            current_service_allowed: false,
        };

        let outcome = self.enter_scope(state, || self.complete_definition_inner(def));

        if let Some(ty) = def.service_type() {
            self.registry.add_dependency(ty);
        }

        outcome.map_err(|e| e.with_descriptor(&def.descriptor()))
    }

    fn complete_definition_inner(&self, def: &Definition) -> Result<()> {
        let creator = self.complete_statement(&def.creator(), false)?;
        def.set_creator(creator);

        let mut setups = Vec::with_capacity(def.setup().len());
        for s in def.setup() {
            setups.push(self.complete_statement(&s, true)?);
        }
        def.set_setup(setups);
        Ok(())
    }

    /// Applies to every statement found under a definition's creator or
    /// setup. `current_service_allowed` enables self-injection (only valid
    /// for setup statements).
    pub fn complete_statement(&self, statement: &Statement, current_service_allowed: bool) -> Result<Statement> {
        let result = self.with_service_allowed(current_service_allowed, || self.complete_statement_inner(statement));
        result.map_err(|e| {
            let described = entity_to_string(&statement.entity, false);
            e.related_to(&described, current_service_allowed)
        })
    }

    fn complete_statement_inner(&self, statement: &Statement) -> Result<Statement> {
        let entity = self.normalize_entity(statement)?;
        let arguments = self.convert_references(&statement.arguments)?;

        let (entity, arguments) = match &entity {
            Entity::Literal(name) if Entity::is_raw_expression(name) => (entity.clone(), arguments),

            Entity::Literal(name) if Entity::is_builtin(name) => {
                if arguments.len() != 1 {
                    return Err(ServiceCreationError::argument_mismatch(format!(
                        "{name}() expects exactly one argument."
                    ))
                    .into());
                }
                (entity.clone(), arguments)
            }

            Entity::Literal(class) => self.complete_class_instantiation(class, entity.clone(), arguments)?,

            Entity::Reference(r) => self.complete_reference_alias(r, arguments)?,

            Entity::Callable { head, member } => self.complete_callable(head, member, arguments)?,
        };

        let arguments = self.complete_arguments(&arguments)?;
        Ok(Statement::new(entity, arguments))
    }

    fn complete_class_instantiation(&self, class: &str, entity: Entity, arguments: Arguments) -> Result<(Entity, Arguments)> {
        if !self.universe.class_exists(class) {
            return Err(ServiceCreationError::class_not_found(class, self.universe.interface_exists(class)).into());
        }
        if self.universe.is_abstract(class) {
            return Err(ServiceCreationError::class_is_abstract(class).into());
        }

        let arguments = match self.universe.constructor(class) {
            Some(sig) => {
                if !sig.is_callable_as_method() {
                    return Err(ServiceCreationError::non_public_constructor(class, "__construct").into());
                }
                self.registry.add_dependency(format!("{class}::__construct"));
                self.autowire(&sig, arguments)?
            }
            None => {
                if !arguments.is_empty() {
                    return Err(ServiceCreationError::unexpected_constructor_args(class).into());
                }
                arguments
            }
        };

        Ok((entity, arguments))
    }

    fn complete_reference_alias(&self, r: &Reference, arguments: Arguments) -> Result<(Entity, Arguments)> {
        if !arguments.is_empty() {
            return Err(ServiceCreationError::argument_mismatch("Unable to pass arguments when aliasing a service.").into());
        }
        let ref_name = match r {
            Reference::SelfRef => self
                .current_service_name()
                .ok_or_else(|| ServiceCreationError::bad_entity_name("@self"))?,
            Reference::Name(n) => n.clone(),
            Reference::Type(t) => t.clone(),
        };
        let entity = Entity::Callable {
            head: EntityHead::Reference(Reference::name(crate::registry::THIS_CONTAINER)),
            member: self.registry.method_name(&ref_name),
        };
        Ok((entity, arguments))
    }

    fn complete_callable(&self, head: &EntityHead, member: &str, arguments: Arguments) -> Result<(Entity, Arguments)> {
        let (kind, _body) =
            crate::entity::classify_member(member).ok_or_else(|| ServiceCreationError::bad_entity_name(member))?;

        if matches!(head, EntityHead::Global) {
            if arguments.iter().any(|a| matches!(a.key, ArgKey::Name(_))) {
                return Err(
                    ServiceCreationError::argument_mismatch("Global function calls accept only positional arguments.")
                        .into(),
                );
            }
            let sig = self
                .universe
                .function(member)
                .ok_or_else(|| ServiceCreationError::function_not_found(member))?;
            self.registry.add_dependency(member.to_string());
            let arguments = self.autowire(&sig, arguments)?;
            return Ok((Entity::Callable { head: head.clone(), member: member.to_string() }, arguments));
        }

        let head_type = match head {
            EntityHead::Class(c) => Some(c.clone()),
            EntityHead::Reference(r) => self.resolve_reference_type(r)?,
            EntityHead::Statement(inner) => {
                let completed_head = self.complete_statement(inner, false)?;
                let head_type = self.resolve_entity_type(&completed_head)?;
                return self.complete_member_access(
                    EntityHead::Statement(Box::new(completed_head)),
                    head_type,
                    member,
                    kind,
                    arguments,
                );
            }
            EntityHead::Global => unreachable!("handled above"),
        };

        self.complete_member_access(head.clone(), head_type, member, kind, arguments)
    }

    fn complete_member_access(
        &self,
        head: EntityHead,
        head_type: Option<String>,
        member: &str,
        kind: crate::entity::MemberKind,
        arguments: Arguments,
    ) -> Result<(Entity, Arguments)> {
        use crate::entity::MemberKind;

        let entity = Entity::Callable { head, member: member.to_string() };
        match kind {
            MemberKind::Method => {
                let class = head_type.ok_or_else(|| ServiceCreationError::unknown_type(member))?;
                let sig = self
                    .universe
                    .method(&class, member)
                    .ok_or_else(|| ServiceCreationError::method_not_callable(&class, member))?;
                if !sig.is_callable_as_method() {
                    return Err(ServiceCreationError::method_not_callable(&class, member).into());
                }
                self.registry.add_dependency(format!("{class}::{member}"));
                let arguments = self.autowire(&sig, arguments)?;
                Ok((entity, arguments))
            }
            MemberKind::Property => {
                if arguments.len() > 1 {
                    return Err(ServiceCreationError::argument_mismatch(format!(
                        "Property access ${member} accepts at most one argument."
                    ))
                    .into());
                }
                Ok((entity, arguments))
            }
            MemberKind::ArrayAppend => {
                if arguments.is_empty() {
                    return Err(ServiceCreationError::argument_mismatch(format!(
                        "Array-append ${member}[] requires exactly one argument."
                    ))
                    .into());
                }
                if arguments.len() > 1 {
                    return Err(ServiceCreationError::argument_mismatch(format!(
                        "Array-append ${member}[] accepts exactly one argument."
                    ))
                    .into());
                }
                Ok((entity, arguments))
            }
        }
    }

    fn autowire(&self, sig: &crate::universe::CallableSignature, arguments: Arguments) -> Result<Arguments> {
        let getter = ResolverGetter { resolver: self };
        autowire::autowire_arguments(sig, arguments, &getter)
    }

    // ---- normalization --------------------------------------------

    fn normalize_entity(&self, statement: &Statement) -> Result<Entity> {
        match &statement.entity {
            Entity::Reference(r) => Ok(Entity::Reference(self.normalize_reference(r)?)),
            Entity::Callable { head, member } => {
                let head = match head {
                    EntityHead::Reference(r) => EntityHead::Reference(self.normalize_reference(r)?),
                    other => other.clone(),
                };
                Ok(Entity::Callable { head, member: member.clone() })
            }
            other => Ok(other.clone()),
        }
    }

    fn normalize_reference(&self, r: &Reference) -> Result<Reference> {
        match r {
            Reference::SelfRef => Ok(Reference::SelfRef),
            Reference::Name(n) => {
                if !self.registry.has_definition(n) {
                    return Err(ServiceCreationError::not_found_in_definitions(n).into());
                }
                if self.current_service_name().as_deref() == Some(n.as_str()) {
                    Ok(Reference::SelfRef)
                } else {
                    Ok(Reference::Name(n.clone()))
                }
            }
            Reference::Type(t) => match self.get_by_type(t) {
                Ok(resolved) => Ok(resolved),
                Err(ResolverError::NotAllowedDuringResolving(_)) => Ok(Reference::Name(t.clone())),
                Err(e) => Err(e),
            },
        }
    }

    /// Resolve a type to the single `Reference` naming the service that
    /// satisfies it, honoring the "local autowiring to self" rule.
    fn get_by_type(&self, type_name: &str) -> Result<Reference> {
        if self.current_service_name().is_some() && self.current_service_allowed() {
            if let Some(cst) = self.current_service_type() {
                if self.universe.is_subclass_of(&cst, type_name) {
                    return Ok(Reference::SelfRef);
                }
            }
        }

        match self.registry.get_by_type(type_name, true, self.universe) {
            Ok(Some(name)) => {
                if self.current_service_name().as_deref() == Some(name.as_str()) && !self.current_service_allowed() {
                    return Err(MissingServiceError::new(type_name).into());
                }
                Ok(Reference::Name(name))
            }
            Ok(None) => unreachable!("throw=true never returns Ok(None)"),
            Err(GetByTypeError::NotAllowed(e)) => Err(e.into()),
            Err(GetByTypeError::Missing(e)) => Err(e.into()),
            Err(GetByTypeError::Ambiguous(e)) => Err(e.into()),
        }
    }

    fn convert_references(&self, args: &Arguments) -> Result<Arguments> {
        let mut out = Arguments::new();
        for arg in args.iter() {
            out.push(Argument {
                key: arg.key.clone(),
                value: self.convert_reference_value(&arg.value)?,
            });
        }
        Ok(out)
    }

    fn convert_reference_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Literal(Literal::Str(s)) if s.starts_with('@') => self.parse_at_reference(s),
            Value::Statement(s) => Ok(Value::statement(Statement::new(
                s.entity.clone(),
                self.convert_references(&s.arguments)?,
            ))),
            Value::Literal(Literal::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.convert_reference_value(item)?);
                }
                Ok(Value::Literal(Literal::List(out)))
            }
            Value::Literal(Literal::Map(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    out.push((k.clone(), self.convert_reference_value(v)?));
                }
                Ok(Value::Literal(Literal::Map(out)))
            }
            other => Ok(other.clone()),
        }
    }

    /// `@service`, `@service::CONST`, `@service::property`, `@@literal`.
    ///
    /// `@service::CONST` resolves straight to the referenced service's class
    /// constant rather than through `complete_callable`'s method dispatch:
    /// by the time Phase 2 runs this, `resolve_all` has already determined
    /// every definition's concrete type, so the lookup never has to defer.
    fn parse_at_reference(&self, s: &str) -> Result<Value> {
        let Some(rest) = s.strip_prefix('@') else {
            return Ok(Value::str(s));
        };
        if let Some(stripped) = rest.strip_prefix('@') {
            return Ok(Value::str(format!("@{stripped}")));
        }
        if let Some((name, member)) = rest.split_once("::") {
            let is_const = !member.is_empty() && member.chars().all(|c| c.is_ascii_uppercase() || c == '_');
            if is_const {
                return self.resolve_service_constant(name, member);
            }
            let head = EntityHead::Reference(Reference::name(name));
            return Ok(Value::statement(Statement::new(
                Entity::Callable { head, member: format!("${member}") },
                Arguments::new(),
            )));
        }
        Ok(Value::reference(Reference::name(rest)))
    }

    fn resolve_service_constant(&self, name: &str, member: &str) -> Result<Value> {
        let class = self
            .registry
            .get_definition(name)
            .ok_or_else(|| ServiceCreationError::not_found_in_definitions(name))?
            .service_type()
            .ok_or_else(|| ServiceCreationError::unknown_type(name))?;
        if self.universe.is_enum_case(&class, member) {
            return Ok(Value::Literal(Literal::EnumCase(class, member.to_string())));
        }
        match self.universe.class_constant(&class, member) {
            Some(literal) => Ok(Value::Literal(literal)),
            None => Err(ServiceCreationError::constant_not_found(&class, member).into()),
        }
    }

    fn complete_arguments(&self, args: &Arguments) -> Result<Arguments> {
        let mut out = Arguments::new();
        for arg in args.iter() {
            out.push(Argument {
                key: arg.key.clone(),
                value: self.complete_argument_value(&arg.value)?,
            });
        }
        Ok(out)
    }

    fn complete_argument_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Statement(s) => match &s.entity {
                Entity::Literal(name) if name == "typed" || name == "tagged" => {
                    self.expand_typed_or_tagged(name, &s.arguments)
                }
                _ => Ok(Value::statement(self.complete_statement(s, false)?)),
            },
            Value::Reference(r) => Ok(Value::reference(self.normalize_reference(r)?)),
            Value::Literal(Literal::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.complete_argument_value(item)?);
                }
                Ok(Value::Literal(Literal::List(out)))
            }
            Value::Literal(Literal::Map(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    out.push((k.clone(), self.complete_argument_value(v)?));
                }
                Ok(Value::Literal(Literal::Map(out)))
            }
            other => Ok(other.clone()),
        }
    }

    /// `typed`/`tagged` expansion sentinels: replace the nested statement
    /// with an ordered list of references, skipping the current service.
    fn expand_typed_or_tagged(&self, kind: &str, args: &Arguments) -> Result<Value> {
        let current = self.current_service_name();
        let mut refs = Vec::new();

        for arg in args.iter() {
            let key = match &arg.value {
                Value::Literal(Literal::Str(s)) => s.clone(),
                _ => {
                    return Err(ServiceCreationError::argument_mismatch(format!(
                        "{kind}() expects a string argument naming a type or tag."
                    ))
                    .into())
                }
            };

            let names: Vec<String> = if kind == "typed" {
                self.registry
                    .find_autowired(&key, self.universe)
                    .iter()
                    .map(|d| d.name().to_string())
                    .collect()
            } else {
                self.registry.find_by_tag(&key).iter().map(|d| d.name().to_string()).collect()
            };

            for name in names {
                if current.as_deref() == Some(name.as_str()) {
                    continue;
                }
                refs.push(Value::reference(Reference::name(name)));
            }
        }

        Ok(Value::Literal(Literal::List(refs)))
    }
}

struct ResolverGetter<'a, 'r> {
    resolver: &'a Resolver<'r>,
}

impl Getter for ResolverGetter<'_, '_> {
    fn get(&self, type_name: &str, single: bool) -> Result<GetterResult> {
        if single {
            match self.resolver.get_by_type(type_name) {
                Ok(r) => Ok(GetterResult::Single(Some(Value::reference(r)))),
                Err(e) => Err(e),
            }
        } else {
            let current = self.resolver.current_service_name();
            let values = self
                .resolver
                .registry
                .find_autowired(type_name, self.resolver.universe)
                .iter()
                .filter(|d| current.as_deref() != Some(d.name()))
                .map(|d| Value::reference(Reference::name(d.name())))
                .collect();
            Ok(GetterResult::Many(values))
        }
    }
}

/// Format a statement's entity for diagnostics (`Related to …`).
fn entity_to_string(entity: &Entity, inner: bool) -> String {
    match entity {
        Entity::Literal(s) => {
            if inner {
                s.clone()
            } else {
                format!("{s}()")
            }
        }
        Entity::Reference(r) => r.to_string(),
        Entity::Callable { head, member } => {
            let head_str = match head {
                EntityHead::Global => String::new(),
                EntityHead::Class(c) => c.clone(),
                EntityHead::Reference(r) => r.to_string(),
                EntityHead::Statement(s) => entity_to_string(&s.entity, true),
            };
            format!("{head_str}::{member}()")
        }
    }
}
