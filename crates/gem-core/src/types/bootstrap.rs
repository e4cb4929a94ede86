//! Startup registration of the meta types and primitives
//!
//! The root meta type `Type` is built by hand as an instance of itself. Each
//! flavor's meta type has `Type` as its parent, and every primitive is an
//! instance of the `Composition` meta type.

use super::descriptor::{Flavor, TypeDescriptor, TypeId};
use super::primitives::{PrimitiveKind, PrimitiveSpec, PrimitiveTable};
use super::registry::TypeRegistry;
use super::statics::{Statics, TypeTest};
use crate::compose::Composition;
use crate::runtime::Gem;
use crate::value::Value;
use crate::{GemError, GemResult};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Handles of the meta types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaTypes {
    /// `Type`, the meta type of meta types
    pub root: TypeId,
    /// Meta type of composable types
    pub composable: TypeId,
    /// Meta type of abstract types
    pub abstract_type: TypeId,
    /// Meta type of models
    pub model: TypeId,
    /// Meta type of single-base extensions
    pub extension: TypeId,
    /// Meta type of interfaces
    pub interface: TypeId,
}

impl MetaTypes {
    /// Meta type producing types of `flavor`
    pub fn for_flavor(&self, flavor: Flavor) -> TypeId {
        match flavor {
            Flavor::Meta => self.root,
            Flavor::Primitive | Flavor::Composable => self.composable,
            Flavor::Abstract => self.abstract_type,
            Flavor::Model => self.model,
            Flavor::Extension => self.extension,
            Flavor::Interface => self.interface,
        }
    }
}

/// Handles of the built-in types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtins {
    /// Meta types
    pub meta: MetaTypes,
    /// Text
    pub text: TypeId,
    /// Number
    pub number: TypeId,
    /// Boolean
    pub boolean: TypeId,
    /// BigInt
    pub bigint: TypeId,
    /// Callable
    pub callable: TypeId,
    /// Record, the universal base
    pub record: TypeId,
    /// List
    pub list: TypeId,
    /// Timestamp
    pub timestamp: TypeId,
    /// Set
    pub set: TypeId,
    /// Map
    pub map: TypeId,
}

impl Builtins {
    /// Canonical type of a primitive kind
    pub fn for_kind(&self, kind: PrimitiveKind) -> TypeId {
        match kind {
            PrimitiveKind::Text => self.text,
            PrimitiveKind::Number => self.number,
            PrimitiveKind::Boolean => self.boolean,
            PrimitiveKind::BigInt => self.bigint,
            PrimitiveKind::Callable => self.callable,
            PrimitiveKind::Record => self.record,
            PrimitiveKind::List => self.list,
            PrimitiveKind::Timestamp => self.timestamp,
            PrimitiveKind::Set => self.set,
            PrimitiveKind::Map => self.map,
        }
    }
}

fn meta_descriptor(id: TypeId, name: &str, root: TypeId) -> TypeDescriptor {
    let parents = if id == root { Vec::new() } else { vec![root] };
    TypeDescriptor {
        id,
        name: name.to_string(),
        flavor: Flavor::Meta,
        meta: root,
        native_parent: None,
        primitive: None,
        composition: Composition {
            parents,
            ..Composition::default()
        },
        statics: Statics::new(),
    }
}

fn primitive_statics(spec: &PrimitiveSpec) -> GemResult<Statics> {
    let mut statics = Statics::new();
    if let Some(pattern) = &spec.expression {
        statics = statics.with_expression(pattern)?;
    }

    let parse = spec.parse;
    statics.parse = Some(Rc::new(
        move |_gem: &Gem, desc: &TypeDescriptor, text: &str| -> GemResult<Value> {
            parse(text).map_err(|reason| GemError::Parse {
                type_name: desc.name.clone(),
                input: text.to_string(),
                reason,
            })
        },
    ));
    if let Some(stringify) = spec.stringify {
        statics.stringify = Some(Rc::new(
            move |gem: &Gem, _desc: &TypeDescriptor, value: &Value| stringify(gem, value),
        ));
    }
    if let Some(serialise) = spec.serialise {
        statics.serialise = Some(Rc::new(
            move |_gem: &Gem, _desc: &TypeDescriptor, value: &Value| Ok(serialise(value)),
        ));
    }
    if let Some(refine) = spec.refine {
        statics.test = TypeTest::Refined(Rc::new(refine));
    }
    Ok(statics)
}

/// Register the meta types and the primitive table
pub(crate) fn register_builtins(registry: &TypeRegistry, table: &PrimitiveTable) -> GemResult<Builtins> {
    let root = registry.next_id();
    registry.register(meta_descriptor(root, Flavor::Meta.meta_name(), root))?;

    let mut metas = Vec::new();
    for flavor in [
        Flavor::Composable,
        Flavor::Abstract,
        Flavor::Model,
        Flavor::Extension,
        Flavor::Interface,
    ] {
        let id = registry.next_id();
        registry.register(meta_descriptor(id, flavor.meta_name(), root))?;
        metas.push(id);
    }
    let meta = MetaTypes {
        root,
        composable: metas[0],
        abstract_type: metas[1],
        model: metas[2],
        extension: metas[3],
        interface: metas[4],
    };

    let mut by_name: FxHashMap<&str, TypeId> = FxHashMap::default();
    let mut canonical: FxHashMap<PrimitiveKind, TypeId> = FxHashMap::default();
    for spec in table.specs() {
        let native_parent = match &spec.extends {
            Some(parent) => Some(*by_name.get(parent.as_str()).ok_or_else(|| {
                GemError::Config(format!(
                    "primitive {} extends unknown primitive {}",
                    spec.name, parent
                ))
            })?),
            None => None,
        };
        let id = registry.next_id();
        registry.register(TypeDescriptor {
            id,
            name: spec.name.clone(),
            flavor: Flavor::Primitive,
            meta: meta.composable,
            native_parent,
            primitive: Some(spec.kind),
            composition: Composition::default(),
            statics: primitive_statics(spec)?,
        })?;
        by_name.insert(spec.name.as_str(), id);
        if native_parent.is_none() {
            canonical.entry(spec.kind).or_insert(id);
        }
    }

    let kind = |k: PrimitiveKind| -> GemResult<TypeId> {
        canonical
            .get(&k)
            .copied()
            .ok_or_else(|| GemError::Config(format!("primitive table has no {:?} type", k)))
    };
    let builtins = Builtins {
        meta,
        text: kind(PrimitiveKind::Text)?,
        number: kind(PrimitiveKind::Number)?,
        boolean: kind(PrimitiveKind::Boolean)?,
        bigint: kind(PrimitiveKind::BigInt)?,
        callable: kind(PrimitiveKind::Callable)?,
        record: kind(PrimitiveKind::Record)?,
        list: kind(PrimitiveKind::List)?,
        timestamp: kind(PrimitiveKind::Timestamp)?,
        set: kind(PrimitiveKind::Set)?,
        map: kind(PrimitiveKind::Map)?,
    };
    log::debug!(
        "bootstrapped {} meta types and {} primitives",
        metas.len() + 1,
        table.specs().len()
    );
    Ok(builtins)
}
