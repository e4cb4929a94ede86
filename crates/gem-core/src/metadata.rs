//! Declaration metadata
//!
//! A read-only, serializable view of a type's fields and methods, consumed by
//! declaration generators and editor tooling. Built-in fields and delegation
//! helpers are left out.

use crate::descriptor::{FieldFlags, FieldSpec, TypeRef};
use crate::runtime::Gem;
use crate::types::{Flavor, TypeId};
use crate::GemResult;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Metadata for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Field key
    pub key: String,
    /// Declared type name
    pub type_name: String,
    /// Modifier flags
    #[serde(flatten)]
    pub flags: FieldFlags,
    /// Writes are rejected
    pub read_only: bool,
    /// Declared in this type rather than inherited
    pub own: bool,
}

/// Metadata for one method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMetadata {
    /// Parameter name
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Admits anything
    pub nullable: bool,
}

/// Metadata for one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Method name
    pub name: String,
    /// Declared parameters
    pub params: Vec<ParamMetadata>,
    /// Declared return type name
    pub returns: Option<String>,
}

/// Metadata for one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    /// Type name
    pub name: String,
    /// Constructor strategy
    pub flavor: Flavor,
    /// Parent type names, in order
    pub parents: Vec<String>,
    /// Fields in declaration order
    pub fields: Vec<FieldMetadata>,
    /// Methods in declaration order
    pub methods: Vec<MethodMetadata>,
    /// Listened event names
    pub events: Vec<String>,
}

impl TypeMetadata {
    /// Look up a field by key
    pub fn field(&self, key: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Pretty JSON rendering
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn type_ref_name(gem: &Gem, ty: &TypeRef) -> String {
    match ty.resolve(gem) {
        Ok(id) => gem.type_name(id),
        Err(_) => match ty {
            TypeRef::Named(name) => name.clone(),
            _ => "unknown".to_string(),
        },
    }
}

impl Gem {
    /// Declaration metadata for a type
    pub fn metadata(&self, ty: TypeId) -> GemResult<TypeMetadata> {
        let desc = self.descriptor(ty)?;
        let parents = desc
            .parents()
            .iter()
            .map(|p| self.descriptor(*p))
            .collect::<GemResult<Vec<_>>>()?;
        // Inherited fields share the parent's spec
        let inherited = |key: &str, field: &Rc<FieldSpec>| {
            parents
                .iter()
                .any(|parent| parent.field(key).is_some_and(|f| Rc::ptr_eq(f, field)))
        };

        let fields = desc
            .prescriptor()
            .iter()
            .filter(|(_, field)| !field.is_builtin())
            .map(|(key, field)| FieldMetadata {
                key: key.clone(),
                type_name: type_ref_name(self, field.type_ref()),
                flags: field.flags(),
                read_only: field.is_read_only(),
                own: !inherited(key, field),
            })
            .collect();

        let methods = desc
            .methods()
            .values()
            .filter(|m| !m.is_builtin())
            .map(|m| MethodMetadata {
                name: m.name().to_string(),
                params: m
                    .params()
                    .iter()
                    .map(|p| ParamMetadata {
                        name: p.name.clone(),
                        type_name: type_ref_name(self, &p.ty),
                        nullable: p.flags.nullable,
                    })
                    .collect(),
                returns: m.return_type().map(|r| type_ref_name(self, r)),
            })
            .collect();

        Ok(TypeMetadata {
            name: desc.name().to_string(),
            flavor: desc.flavor(),
            parents: desc.parents().iter().map(|p| self.type_name(*p)).collect(),
            fields,
            methods,
            events: desc.listeners().keys().cloned().collect(),
        })
    }
}
