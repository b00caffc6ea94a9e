mod dict;
mod encode;
mod list;
mod ops;

#[cfg(test)]
mod test;

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;
use vimscript_syn::literal::str2nr;

use crate::error::{EvalError, Result};
use crate::func::UserFunc;

pub use dict::{Dict, DictItem, DictScope, ItemFlags};
pub(crate) use dict::DictInner;
pub use encode::format_float;
pub use list::{ItemKey, List, WatcherKey};
pub(crate) use list::ListInner;
pub use ops::{change_lock, check_lock, is_locked, Equality, MAX_NEST};
pub(crate) use ops::{copy_value, lock_contents};

/// Lock state of a value, a container or a container slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarLock {
    Unlocked,
    /// Locked with `:lockvar`, can be unlocked again.
    Locked,
    /// Locked forever (`a:` arguments, `v:` variables).
    Fixed,
}

impl Default for VarLock {
    fn default() -> Self {
        VarLock::Unlocked
    }
}

/// Type numbers as returned by `type()`.
pub mod type_id {
    pub const NUMBER: i64 = 0;
    pub const STRING: i64 = 1;
    pub const FUNC: i64 = 2;
    pub const LIST: i64 = 3;
    pub const DICT: i64 = 4;
    pub const FLOAT: i64 = 5;
}

/// A reference to a function.
#[derive(Clone)]
pub enum FuncRef {
    /// A named function, resolved at call time.
    Named(SmolStr),
    /// A numbered function, as created by `:function dict.name()`. Holding
    /// the reference keeps the function alive.
    Numbered(Rc<UserFunc>),
}

impl FuncRef {
    /// The name the function is called by.
    pub fn name(&self) -> SmolStr {
        match self {
            FuncRef::Named(name) => name.clone(),
            FuncRef::Numbered(f) => f.name().clone(),
        }
    }
}

impl PartialEq for FuncRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FuncRef::Numbered(a), FuncRef::Numbered(b)) => Rc::ptr_eq(a, b),
            _ => self.name() == other.name(),
        }
    }
}

impl fmt::Debug for FuncRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function('{}')", self.name())
    }
}

#[derive(Clone)]
pub enum Value {
    Number(i64),
    Float(f64),
    String(SmolStr),
    List(List),
    Dict(Dict),
    Func(FuncRef),
    /// Placeholder for "not evaluated".
    Unknown,
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0)
    }
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::String(SmolStr::new(s))
    }

    /// Returns `true` if the value is [`Number`].
    ///
    /// [`Number`]: Value::Number
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(..))
    }

    pub fn as_number(&self) -> Option<i64> {
        if let Self::Number(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    /// Returns `true` if the value is [`Float`].
    ///
    /// [`Float`]: Value::Float
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(..))
    }

    pub fn as_float(&self) -> Option<f64> {
        if let Self::Float(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    /// Returns `true` if the value is [`String`].
    ///
    /// [`String`]: Value::String
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(..))
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(v) = self {
            Some(v.as_str())
        } else {
            None
        }
    }

    /// Returns `true` if the value is [`List`].
    ///
    /// [`List`]: Value::List
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(..))
    }

    pub fn as_list(&self) -> Option<&List> {
        if let Self::List(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns `true` if the value is [`Dict`].
    ///
    /// [`Dict`]: Value::Dict
    pub fn is_dict(&self) -> bool {
        matches!(self, Self::Dict(..))
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        if let Self::Dict(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns `true` if the value is [`Func`].
    ///
    /// [`Func`]: Value::Func
    pub fn is_func(&self) -> bool {
        matches!(self, Self::Func(..))
    }

    pub fn as_func(&self) -> Option<&FuncRef> {
        if let Self::Func(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn try_into_list(self) -> Result<List, Self> {
        if let Self::List(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }

    pub fn try_into_dict(self) -> Result<Dict, Self> {
        if let Self::Dict(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }

    /// Number returned by `type()`.
    pub fn type_id(&self) -> i64 {
        match self {
            Value::Number(_) | Value::Unknown => type_id::NUMBER,
            Value::String(_) => type_id::STRING,
            Value::Func(_) => type_id::FUNC,
            Value::List(_) => type_id::LIST,
            Value::Dict(_) => type_id::DICT,
            Value::Float(_) => type_id::FLOAT,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Dict(_) => "Dictionary",
            Value::Func(_) => "Funcref",
            Value::Unknown => "Unknown",
        }
    }

    /// Convert to a Number. Strings are parsed like number literals, with an
    /// optional leading `-`; anything unparsable gives zero.
    pub fn get_number(&self) -> Result<i64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::String(s) => Ok(str2nr(s, true).0),
            Value::Float(_) => Err(EvalError::type_error("E805", "Using a Float as a Number")),
            Value::Func(_) => Err(EvalError::type_error("E703", "Using a Funcref as a Number")),
            Value::List(_) => Err(EvalError::type_error("E745", "Using a List as a Number")),
            Value::Dict(_) => {
                Err(EvalError::type_error("E728", "Using a Dictionary as a Number"))
            }
            Value::Unknown => Err(internal_error("get_number")),
        }
    }

    /// Convert a Number or Float to a Float.
    pub fn get_float(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            Value::Func(_) => Err(EvalError::type_error("E891", "Using a Funcref as a Float")),
            Value::String(_) => Err(EvalError::type_error("E892", "Using a String as a Float")),
            Value::List(_) => Err(EvalError::type_error("E893", "Using a List as a Float")),
            Value::Dict(_) => Err(EvalError::type_error("E894", "Using a Dictionary as a Float")),
            Value::Unknown => Err(internal_error("get_float")),
        }
    }

    /// Convert a Number, Float or String to a String.
    pub fn get_string(&self) -> Result<Cow<'_, str>> {
        match self {
            Value::Number(n) => Ok(Cow::Owned(n.to_string())),
            Value::Float(f) => Ok(Cow::Owned(format_float(*f))),
            Value::String(s) => Ok(Cow::Borrowed(s.as_str())),
            Value::Func(_) => Err(EvalError::type_error("E729", "Using a Funcref as a String")),
            Value::List(_) => Err(EvalError::type_error("E730", "Using a List as a String")),
            Value::Dict(_) => {
                Err(EvalError::type_error("E731", "Using a Dictionary as a String"))
            }
            Value::Unknown => Err(internal_error("get_string")),
        }
    }

    /// Truthiness as used by `if` and `while`: the value converted to a
    /// Number must not be zero.
    pub fn to_bool(&self) -> Result<bool> {
        self.get_number().map(|n| n != 0)
    }

    /// Returns `true` for zero, an empty String, List or Dictionary.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Number(n) => *n == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Dict(d) => d.is_empty(),
            Value::Func(_) => false,
            Value::Unknown => true,
        }
    }

    /// The representation used by `string()`: strings are quoted and
    /// containers are shown recursively.
    pub fn to_repr(&self) -> String {
        encode::to_string(self, false)
    }

    /// The representation used by `:echo`: like [`to_repr`](Value::to_repr)
    /// except that a top level String or Funcref is shown as is.
    pub fn to_echo(&self) -> String {
        encode::to_string(self, true)
    }
}

pub(crate) fn internal_error(what: &str) -> EvalError {
    EvalError::new(
        crate::error::ErrorKind::Type,
        "E685",
        format!("Internal error: {}", what),
    )
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_repr())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_repr())
    }
}

/// Structural equality, the same as `==#`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Equality::new().equal(self, other, false)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(b as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(SmolStr::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(SmolStr::from(s))
    }
}

impl From<SmolStr> for Value {
    fn from(s: SmolStr) -> Self {
        Value::String(s)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

impl From<FuncRef> for Value {
    fn from(f: FuncRef) -> Self {
        Value::Func(f)
    }
}
