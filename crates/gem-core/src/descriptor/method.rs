//! Methods and typed parameters

use super::field::TypeRef;
use super::flags::{parse_key, FieldFlags};
use crate::object::Instance;
use crate::options::KeyMarkers;
use crate::runtime::Gem;
use crate::value::{Callable, Value};
use crate::{GemError, GemResult};
use std::fmt;
use std::rc::Rc;

/// Method body: runtime, receiver, arguments
pub type MethodFn = Rc<dyn Fn(&Gem, &Instance, &[Value]) -> GemResult<Value>>;

/// Declared method parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name, markers stripped once composed
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Parsed modifier flags
    pub flags: FieldFlags,
}

/// A method, listener or delegation helper
#[derive(Clone)]
pub struct MethodSpec {
    name: String,
    params: Vec<ParamSpec>,
    returns: Option<TypeRef>,
    body: MethodFn,
    builtin: bool,
}

impl MethodSpec {
    /// Untyped method
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Gem, &Instance, &[Value]) -> GemResult<Value> + 'static,
    {
        Self {
            name: String::new(),
            params: Vec::new(),
            returns: None,
            body: Rc::new(body),
            builtin: false,
        }
    }

    /// Method from a callable value; the receiver is not passed on
    pub fn from_callable(callable: Callable) -> Self {
        Self::new(move |gem, _this, args| callable.call(gem, args))
    }

    /// Declare the next positional parameter (`name?` admits anything)
    pub fn param(mut self, name: &str, ty: impl Into<TypeRef>) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty: ty.into(),
            flags: FieldFlags::default(),
        });
        self
    }

    /// Declare the return type
    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.returns = Some(ty.into());
        self
    }

    pub(crate) fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Name the method and parse its parameter markers
    pub(crate) fn finish(mut self, name: &str, markers: &KeyMarkers) -> GemResult<Self> {
        self.name = name.to_string();
        for param in &mut self.params {
            let (stripped, flags) = parse_key(&param.name, markers)?;
            param.name = stripped;
            param.flags = flags;
        }
        Ok(self)
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Declared return type
    pub fn return_type(&self) -> Option<&TypeRef> {
        self.returns.as_ref()
    }

    /// Check for built-in delegation helpers
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Call the method with argument and return type checks
    pub fn invoke(&self, gem: &Gem, this: &Instance, args: &[Value]) -> GemResult<Value> {
        for (i, param) in self.params.iter().enumerate() {
            let arg = args.get(i).cloned().unwrap_or_default();
            if arg.is_nullish() || param.flags.nullable {
                continue;
            }
            let ty = param.ty.resolve(gem)?;
            if !gem.has_instance(ty, &arg) {
                return Err(GemError::Argument {
                    param: param.name.clone(),
                    expected: gem.type_name(ty),
                    received: gem.type_name_of(&arg),
                });
            }
        }

        let result = (self.body)(gem, this, args)?;

        if let Some(returns) = &self.returns {
            let ty = returns.resolve(gem)?;
            if !gem.has_instance(ty, &result) {
                return Err(GemError::Return {
                    owner: this.type_name().to_string(),
                    method: self.name.clone(),
                    expected: gem.type_name(ty),
                    received: gem.type_name_of(&result),
                });
            }
        }
        Ok(result)
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish()
    }
}
