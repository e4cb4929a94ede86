//! Composition engine
//!
//! Merges an ordered parent list with one definition into a descriptor
//! bundle. Parents are never mutated: inherited field specs and accessors
//! are shared by `Rc`, own ones are compiled once here.

mod definition;

pub use definition::{Definition, Entry};
pub(crate) use definition::StaticOverrides;

use crate::descriptor::{FieldSpec, MethodSpec, PropertyAccessor};
use crate::events::is_valid_event_name;
use crate::runtime::Gem;
use crate::types::{TypeDescriptor, TypeId};
use crate::value::Value;
use crate::{GemError, GemResult};
use indexmap::IndexMap;
use std::rc::Rc;

/// Key of the built-in field exposing an instance's type
pub const SPECIES_KEY: &str = "Symbol.species";
/// Key of the built-in field exposing an instance's type name
pub const TAG_KEY: &str = "Symbol.toStringTag";

/// Merged descriptor bundle
#[derive(Debug, Clone, Default)]
pub struct Composition {
    /// Ordered parents
    pub parents: Vec<TypeId>,
    /// Field specs by key
    pub prescriptor: IndexMap<String, Rc<FieldSpec>>,
    /// Accessors by key; same key set as `prescriptor`
    pub properties: IndexMap<String, Rc<PropertyAccessor>>,
    /// Methods by name
    pub methods: IndexMap<String, Rc<MethodSpec>>,
    /// Literal defaults written into slots at construction
    pub defaults: IndexMap<String, Value>,
    /// Listeners by lowercased event name
    pub listeners: IndexMap<String, Vec<Rc<MethodSpec>>>,
}

impl Composition {
    fn insert_field(&mut self, field: Rc<FieldSpec>, accessor: Rc<PropertyAccessor>) {
        let key = accessor.key().to_string();
        self.prescriptor.insert(key.clone(), field);
        self.properties.insert(key, accessor);
    }
}

/// Own entries of a definition, partitioned
#[derive(Default)]
struct Partition {
    fields: Vec<FieldSpec>,
    methods: Vec<(String, MethodSpec)>,
    defaults: Vec<(String, Value)>,
    listeners: Vec<(String, MethodSpec)>,
}

fn listener_event(raw: &str) -> GemResult<String> {
    if !is_valid_event_name(raw) {
        return Err(GemError::Definition(format!(
            "listener key {:?} needs a non-empty event name without whitespace",
            raw
        )));
    }
    Ok(raw.to_ascii_lowercase())
}

fn partition(
    gem: &Gem,
    parents: &[Rc<TypeDescriptor>],
    definition: Definition,
) -> GemResult<Partition> {
    let markers = &gem.options().markers;
    let mut out = Partition::default();

    for (raw, entry) in definition.entries {
        let method = match &entry {
            Entry::Method(m) => Some(m.clone()),
            Entry::Value(Value::Callable(c)) => Some(MethodSpec::from_callable(c.clone())),
            _ => None,
        };
        if let Some(method) = method {
            match raw.strip_prefix(markers.listener) {
                Some(event) => out.listeners.push((listener_event(event)?, method)),
                None => out.methods.push((raw, method)),
            }
            continue;
        }

        let field = match entry {
            Entry::Value(value)
                if value.is_literal() && parents.iter().any(|p| p.property(&raw).is_some()) =>
            {
                out.defaults.push((raw, value));
                continue;
            }
            Entry::Value(value) => FieldSpec::infer(gem, &value)?,
            Entry::Type(ty) => FieldSpec::new(ty),
            Entry::Field(field) => field,
            Entry::Method(_) => continue,
        };
        out.fields.push(field.parse(&raw, markers)?);
    }

    for (event, method) in definition.listeners {
        out.listeners.push((listener_event(&event)?, method));
    }
    Ok(out)
}

fn builtin_fields(gem: &Gem) -> GemResult<Vec<FieldSpec>> {
    let markers = &gem.options().markers;
    let builtins = gem.builtins();
    Ok(vec![
        FieldSpec::getter(builtins.meta.root, |_, ctx| {
            Ok(Value::Type(ctx.target.type_id()))
        })
        .private()
        .builtin()
        .parse(SPECIES_KEY, markers)?,
        FieldSpec::getter(builtins.text, |_, ctx| Ok(Value::Text(ctx.target.type_name())))
            .private()
            .builtin()
            .parse(TAG_KEY, markers)?,
    ])
}

fn builtin_methods(gem: &Gem) -> GemResult<Vec<MethodSpec>> {
    let markers = &gem.options().markers;
    Ok(vec![
        MethodSpec::new(|gem, this, args| {
            let parent = args.first().and_then(Value::as_type).ok_or_else(|| {
                GemError::Definition("inherit expects a parent type as first argument".into())
            })?;
            this.inherit(gem, parent, &args[1..])?;
            Ok(Value::Undefined)
        })
        .builtin()
        .finish("inherit", markers)?,
        MethodSpec::new(|gem, this, args| {
            this.inherit_all(gem, args)?;
            Ok(Value::Undefined)
        })
        .builtin()
        .finish("super", markers)?,
    ])
}

/// Merge `parents` and `definition` into a descriptor bundle
///
/// Later parents override earlier ones and own entries override all
/// parents; listeners accumulate instead.
pub fn compose(gem: &Gem, parents: &[TypeId], definition: Definition) -> GemResult<Composition> {
    let parent_descs = parents
        .iter()
        .map(|p| gem.descriptor(*p))
        .collect::<GemResult<Vec<_>>>()?;
    let own = partition(gem, &parent_descs, definition)?;
    let markers = &gem.options().markers;

    let mut out = Composition {
        parents: parents.to_vec(),
        ..Composition::default()
    };

    for field in builtin_fields(gem)? {
        let field = Rc::new(field);
        let accessor = Rc::new(PropertyAccessor::compile(field.clone())?);
        out.insert_field(field, accessor);
    }
    for method in builtin_methods(gem)? {
        out.methods.insert(method.name().to_string(), Rc::new(method));
    }

    for parent in &parent_descs {
        for (key, accessor) in parent.properties() {
            if accessor.field().is_builtin() {
                continue;
            }
            out.prescriptor.insert(key.clone(), accessor.field().clone());
            out.properties.insert(key.clone(), accessor.clone());
        }
        for (name, method) in parent.methods() {
            if !method.is_builtin() {
                out.methods.insert(name.clone(), method.clone());
            }
        }
        for (key, value) in parent.defaults() {
            out.defaults.insert(key.clone(), value.clone());
        }
        for (event, listeners) in parent.listeners() {
            out.listeners
                .entry(event.clone())
                .or_default()
                .extend(listeners.iter().cloned());
        }
    }

    for field in own.fields {
        let field = Rc::new(field);
        let accessor = Rc::new(PropertyAccessor::compile(field.clone())?);
        out.insert_field(field, accessor);
    }
    for (name, method) in own.methods {
        let method = method.finish(&name, markers)?;
        out.methods.insert(name, Rc::new(method));
    }
    for (key, value) in own.defaults {
        out.defaults.insert(key, value);
    }
    for (event, method) in own.listeners {
        let method = method.finish(&event, markers)?;
        out.listeners.entry(event).or_default().push(Rc::new(method));
    }

    Ok(out)
}
