//! Construction and validation kernel
//!
//! Every constructed instance passes through
//! `Allocated → PropertiesBound → DefaultsApplied → Initialized → Verified`.
//! Delegation to parents (`inherit`, `super`) reruns the middle phases for
//! the parent on the same instance; verification happens once, for the
//! type actually being constructed.

use crate::object::Instance;
use crate::runtime::Gem;
use crate::types::{Flavor, PrimitiveKind, TypeDescriptor, TypeId};
use crate::value::Value;
use crate::{GemError, GemResult};
use std::rc::Rc;

/// Construction phase, reached in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Fresh instance
    Allocated,
    /// The type's accessors apply to the instance
    PropertiesBound,
    /// Literal defaults written into slots
    DefaultsApplied,
    /// `init` ran, or record arguments were merged
    Initialized,
    /// Required fields present, no undeclared keys
    Verified,
}

fn enter(phase: Phase, desc: &TypeDescriptor, target: &Instance) {
    log::trace!("{}#{} as {}: {:?}", target.type_name(), target.id(), desc.name(), phase);
}

/// Construct a value of `ty`
///
/// Primitives produce plain values; composed types produce instances.
pub fn construct(gem: &Gem, ty: TypeId, args: &[Value]) -> GemResult<Value> {
    let desc = gem.descriptor(ty)?;
    match desc.flavor() {
        Flavor::Meta => Err(GemError::MetaType {
            name: desc.name().to_string(),
        }),
        Flavor::Abstract | Flavor::Interface => Err(GemError::Abstract {
            name: desc.name().to_string(),
        }),
        Flavor::Primitive => construct_primitive(gem, &desc, args),
        Flavor::Composable | Flavor::Model | Flavor::Extension => {
            let target = Instance::allocate(ty, Rc::from(desc.name()));
            enter(Phase::Allocated, &desc, &target);
            initialize_as(gem, &desc, &target, args)?;
            verify(gem, &target)?;
            Ok(Value::Instance(target))
        }
    }
}

fn construct_primitive(gem: &Gem, desc: &TypeDescriptor, args: &[Value]) -> GemResult<Value> {
    let kind = desc
        .primitive()
        .ok_or_else(|| GemError::Definition(format!("{} has no primitive kind", desc.name())))?;
    match args.first() {
        None | Some(Value::Undefined) => Ok(kind.zero()),
        Some(Value::Text(text)) if kind != PrimitiveKind::Text => gem.parse(desc.id(), text),
        Some(value) if gem.defines(desc.id(), value) => Ok(value.clone()),
        Some(value) if kind == PrimitiveKind::Text => Ok(Value::text(gem.render(value)?)),
        Some(value) => Err(GemError::Parse {
            type_name: desc.name().to_string(),
            input: value.describe(),
            reason: format!("a {} cannot be converted", gem.type_name_of(value)),
        }),
    }
}

/// Run `desc`'s constructor strategy on `target`, without verification
pub(crate) fn initialize_as(
    gem: &Gem,
    desc: &TypeDescriptor,
    target: &Instance,
    args: &[Value],
) -> GemResult<()> {
    match desc.flavor() {
        Flavor::Meta => Err(GemError::MetaType {
            name: desc.name().to_string(),
        }),
        Flavor::Primitive => {
            let kind = desc.primitive().ok_or_else(|| {
                GemError::Definition(format!("{} has no primitive kind", desc.name()))
            })?;
            let payload = match args.first() {
                Some(value) if kind.admits(value) => value.clone(),
                Some(Value::Text(text)) => gem.parse(desc.id(), text)?,
                _ => kind.zero(),
            };
            target.set_native(payload);
            Ok(())
        }
        Flavor::Abstract | Flavor::Interface | Flavor::Model => build(gem, desc, target, args, true),
        Flavor::Composable => {
            route_bundles(gem, desc, target, args)?;
            build(gem, desc, target, args, true)
        }
        Flavor::Extension => {
            let base = desc.parents().first().copied().ok_or_else(|| {
                GemError::Definition(format!("{} has no base type", desc.name()))
            })?;
            let base_desc = gem.descriptor(base)?;
            initialize_as(gem, &base_desc, target, args)?;

            // An init inherited from the base already ran with these args
            let inherited_init = match (desc.method("init"), base_desc.method("init")) {
                (Some(own), Some(base)) => Rc::ptr_eq(&own, &base),
                _ => false,
            };
            build(gem, desc, target, args, !inherited_init)
        }
    }
}

fn build(
    gem: &Gem,
    desc: &TypeDescriptor,
    target: &Instance,
    args: &[Value],
    run_init: bool,
) -> GemResult<()> {
    enter(Phase::PropertiesBound, desc, target);

    let own = gem.descriptor(target.type_id())?;
    for (key, value) in desc.defaults() {
        if own.property(key).is_some() {
            target.store_slot(key, value.clone());
        } else {
            target.put_extra(key, value.clone());
        }
    }
    enter(Phase::DefaultsApplied, desc, target);

    if run_init {
        match desc.method("init") {
            Some(init) => {
                init.invoke(gem, target, args)?;
            }
            None => merge(gem, target, args)?,
        }
    }
    enter(Phase::Initialized, desc, target);
    Ok(())
}

/// Shallow-merge record and instance arguments, in order
fn merge(gem: &Gem, target: &Instance, args: &[Value]) -> GemResult<()> {
    for arg in args {
        let entries: Vec<(String, Value)> = match arg {
            Value::Record(record) => record
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Value::Instance(source) if !source.ptr_eq(target) => source.entries(gem)?,
            _ => continue,
        };
        for (key, value) in entries {
            target.assign(gem, &key, value)?;
        }
    }
    Ok(())
}

/// Reject undeclared keys, then check required fields
///
/// Undeclared keys are reported before missing fields. Types descending
/// from List are not verified.
pub fn verify(gem: &Gem, target: &Instance) -> GemResult<()> {
    let desc = gem.descriptor(target.type_id())?;
    if gem.is_same_or_ancestor(desc.id(), gem.builtins().list) {
        return Ok(());
    }

    if let Some(key) = target.extra_keys().into_iter().next() {
        return Err(GemError::UndefinedProperty {
            owner: desc.name().to_string(),
            key,
        });
    }

    for (key, accessor) in desc.properties() {
        if !accessor.is_enumerable() {
            continue;
        }
        let value = accessor.get(gem, target)?;
        let flags = accessor.field().flags();
        if flags.required && (value.is_undefined() || (value.is_null() && !flags.nullable)) {
            let expected = match accessor.field().resolve(gem) {
                Ok(ty) => gem.type_name(ty),
                Err(_) => "?".to_string(),
            };
            return Err(GemError::RequiredProperty {
                owner: desc.name().to_string(),
                key: key.clone(),
                expected,
            });
        }
    }
    enter(Phase::Verified, &desc, target);
    Ok(())
}

/// Initialize `target` as `parent`, which must be one of its type's parents
pub fn inherit(gem: &Gem, target: &Instance, parent: TypeId, args: &[Value]) -> GemResult<()> {
    let desc = gem.descriptor(target.type_id())?;
    if !desc.parents().contains(&parent) {
        return Err(GemError::Inherit {
            owner: desc.name().to_string(),
            parent: gem.type_name(parent),
        });
    }
    let parent_desc = gem.descriptor(parent)?;
    initialize_as(gem, &parent_desc, target, args)
}

/// Initialize `target` as every parent of its type, one bundle per parent
///
/// A list bundle is spread into arguments; any other value is passed as the
/// single argument.
pub fn inherit_all(gem: &Gem, target: &Instance, bundles: &[Value]) -> GemResult<()> {
    let desc = gem.descriptor(target.type_id())?;
    route_bundles(gem, &desc, target, bundles)
}

fn route_bundles(
    gem: &Gem,
    desc: &TypeDescriptor,
    target: &Instance,
    bundles: &[Value],
) -> GemResult<()> {
    if bundles.len() != desc.parents().len() {
        return Err(GemError::MultiInherit {
            owner: desc.name().to_string(),
            parents: desc.parents().len(),
            bundles: bundles.len(),
        });
    }
    for (parent, bundle) in desc.parents().iter().zip(bundles) {
        let args = match bundle {
            Value::List(items) => items.borrow().clone(),
            other => vec![other.clone()],
        };
        let parent_desc = gem.descriptor(*parent)?;
        initialize_as(gem, &parent_desc, target, &args)?;
    }
    Ok(())
}

/// Run `ty`'s constructor strategy on `target` without any ancestry check
///
/// Used by `init` methods that delegate to a grandparent the way a
/// constructor chain would.
pub fn initialize(gem: &Gem, target: &Instance, ty: TypeId, args: &[Value]) -> GemResult<()> {
    let desc = gem.descriptor(ty)?;
    initialize_as(gem, &desc, target, args)
}
