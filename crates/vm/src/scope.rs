//! Mapping of variable names to the dictionaries that hold them.
//!
//! A name is either prefixed with a one-letter scope and a colon (`g:x`,
//! `l:x`, `s:x`, `a:x`, `v:x`, `b:x`, `w:x`, `t:x`) or bare. A bare name is
//! global outside of functions and local inside of them, except for the
//! few `v:` variables that are also visible without prefix.


use vimscript_syn::name::AUTOLOAD_CHAR;

use crate::error::{EvalError, Result};
use crate::interp::Interp;
use crate::value::{
    change_lock, check_lock, is_locked, lock_contents, type_id, Dict, DictItem, DictScope, ItemFlags,
    Value, VarLock,
};

/// Owner of a per-entity scope provided by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// `b:` variables.
    Buffer,
    /// `w:` variables.
    Window,
    /// `t:` variables.
    Tab,
}

impl EntityKind {
    fn index(self) -> usize {
        match self {
            EntityKind::Buffer => 0,
            EntityKind::Window => 1,
            EntityKind::Tab => 2,
        }
    }
}

/// `v:` variables that can also be used without prefix.
const COMPAT_VARS: &[&str] = &["version"];

/// Version number in `v:version`.
const VERSION: i64 = 800;

enum Init {
    Nr(i64),
    Str(&'static str),
    List,
}

/// `(name, read-only, initial value)` of every `v:` variable.
const VIMVARS: &[(&str, bool, Init)] = &[
    ("count", true, Init::Nr(0)),
    ("count1", true, Init::Nr(1)),
    ("prevcount", true, Init::Nr(0)),
    ("errmsg", false, Init::Str("")),
    ("warningmsg", false, Init::Str("")),
    ("statusmsg", false, Init::Str("")),
    ("shell_error", true, Init::Nr(0)),
    ("this_session", false, Init::Str("")),
    ("version", true, Init::Nr(VERSION)),
    ("lnum", true, Init::Nr(0)),
    ("exception", true, Init::Str("")),
    ("throwpoint", true, Init::Str("")),
    ("searchforward", false, Init::Nr(1)),
    ("hlsearch", false, Init::Nr(1)),
    ("oldfiles", false, Init::List),
    ("errors", false, Init::List),
    ("numbermax", true, Init::Nr(i64::MAX)),
    ("numbermin", true, Init::Nr(i64::MIN)),
    ("numbersize", true, Init::Nr(64)),
    ("t_number", true, Init::Nr(type_id::NUMBER)),
    ("t_string", true, Init::Nr(type_id::STRING)),
    ("t_func", true, Init::Nr(type_id::FUNC)),
    ("t_list", true, Init::Nr(type_id::LIST)),
    ("t_dict", true, Init::Nr(type_id::DICT)),
    ("t_float", true, Init::Nr(type_id::FLOAT)),
    ("argv", true, Init::List),
];

fn illegal_name(name: &str) -> EvalError {
    EvalError::parse("E461", format!("Illegal variable name: {}", name))
}

/// A variable name must consist of letters, digits, `_` and `#`, and must
/// not start with a digit.
pub fn valid_varname(varname: &str) -> Result<()> {
    let ok = varname.bytes().enumerate().all(|(i, c)| {
        c.is_ascii_alphabetic() || c == b'_' || (i > 0 && c.is_ascii_digit()) || c == AUTOLOAD_CHAR
    });
    if ok {
        Ok(())
    } else {
        Err(illegal_name(varname))
    }
}

/// Fails with `E46` for a read-only variable.
pub fn check_ro(flags: ItemFlags, name: &str) -> Result<()> {
    if flags.contains(ItemFlags::RO) {
        Err(EvalError::locked(
            "E46",
            format!("Cannot change read-only variable \"{}\"", name),
        ))
    } else {
        Ok(())
    }
}

/// Fails with `E795` for a variable that can't be deleted.
pub fn check_fixed(flags: ItemFlags, name: &str) -> Result<()> {
    if flags.contains(ItemFlags::FIX) {
        Err(EvalError::locked(
            "E795",
            format!("Cannot delete variable {}", name),
        ))
    } else {
        Ok(())
    }
}

impl Interp {
    pub(crate) fn init_vimvars(&mut self) {
        for (name, ro, init) in VIMVARS {
            let value = match init {
                Init::Nr(n) => Value::Number(*n),
                Init::Str(s) => Value::str(s),
                Init::List => Value::List(self.heap.new_list()),
            };
            let flags = if *ro {
                ItemFlags::RO | ItemFlags::FIX
            } else {
                ItemFlags::FIX
            };
            // Keys are unique and not empty.
            let _ = self.vimvars.add_item(name, DictItem::with_flags(value, flags));
        }
    }

    /// Set a `v:` variable from the host, ignoring the read-only flag.
    pub fn set_vim_var(&mut self, name: &str, value: Value) -> Result<()> {
        if self.vimvars.update(name, |item| item.value = value.clone()).is_none() {
            self.vimvars
                .add_item(name, DictItem::with_flags(value, ItemFlags::FIX))?;
        }
        Ok(())
    }

    /// Create the scope of a new script and return its id.
    pub(crate) fn new_script(&mut self) -> usize {
        let d = self.heap.new_scope_dict(DictScope::Def);
        self.scripts.push(d);
        self.scripts.len()
    }

    /// Make entity `id` of `kind` the current one, so `b:`, `w:` or `t:`
    /// refer to its variables.
    pub fn set_current_entity(&mut self, kind: EntityKind, id: u32) {
        self.current_entities[kind.index()] = id;
    }

    /// Variables of entity `id` of `kind`, created when first used.
    pub fn entity_scope(&mut self, kind: EntityKind, id: u32) -> Dict {
        let heap = &mut self.heap;
        self.entities
            .entry((kind, id))
            .or_insert_with(|| heap.new_scope_dict(DictScope::Def))
            .clone()
    }

    /// Drop the variables of an entity that went away.
    pub fn remove_entity(&mut self, kind: EntityKind, id: u32) {
        if let Some(d) = self.entities.remove(&(kind, id)) {
            d.take_all();
        }
    }

    fn current_entity_scope(&mut self, kind: EntityKind) -> Dict {
        let id = self.current_entities[kind.index()];
        self.entity_scope(kind, id)
    }

    /// Find the scope dictionary of `name` and the name without its scope
    /// prefix. Returns `None` when the name can't be a variable in any
    /// scope.
    pub(crate) fn find_scope<'n>(&mut self, name: &'n str) -> Option<(Dict, &'n str)> {
        let b = name.as_bytes();
        if b.is_empty() {
            return None;
        }
        if b.len() == 1 || b[1] != b':' {
            if b[0] == b':' || b[0] == AUTOLOAD_CHAR {
                return None;
            }
            if COMPAT_VARS.contains(&name) {
                return Some((self.vimvars.clone(), name));
            }
            let scope = match &self.call_stack {
                Some(fc) => fc.locals.clone(),
                None => self.globals.clone(),
            };
            return Some((scope, name));
        }

        let varname = &name[2..];
        if b[0] == b'g' {
            return Some((self.globals.clone(), varname));
        }
        if varname.bytes().any(|c| c == b':' || c == AUTOLOAD_CHAR) {
            return None;
        }
        let scope = match b[0] {
            b'b' => self.current_entity_scope(EntityKind::Buffer),
            b'w' => self.current_entity_scope(EntityKind::Window),
            b't' => self.current_entity_scope(EntityKind::Tab),
            b'v' => self.vimvars.clone(),
            b'a' => self.call_stack.as_ref()?.args.clone(),
            b'l' => self.call_stack.as_ref()?.locals.clone(),
            b's' if self.current_script > 0 => self.scripts.get(self.current_script - 1)?.clone(),
            _ => return None,
        };
        Some((scope, varname))
    }

    /// Look up a variable without reporting an error. A scope prefix with an
    /// empty name gives the scope dictionary.
    pub fn find_var(&mut self, name: &str) -> Option<Value> {
        let (scope, varname) = self.find_scope(name)?;
        if varname.is_empty() {
            return (name.len() > 1).then(|| Value::Dict(scope));
        }
        scope.get(varname)
    }

    pub(crate) fn find_var_item(&mut self, name: &str) -> Option<(Dict, DictItem)> {
        let (scope, varname) = self.find_scope(name)?;
        let item = scope.item(varname)?;
        Some((scope, item))
    }

    /// Value of variable `name`, `E121` when it doesn't exist.
    pub fn get_var(&mut self, name: &str) -> Result<Value> {
        self.find_var(name).ok_or_else(|| {
            EvalError::undefined("E121", format!("Undefined variable: {}", name))
        })
    }

    /// Assign `value` to variable `name`, creating it when needed.
    pub fn set_var(&mut self, name: &str, value: Value) -> Result<()> {
        let (scope, varname) = match self.find_scope(name) {
            Some((scope, varname)) if !varname.is_empty() => (scope, varname),
            _ => return Err(illegal_name(name)),
        };
        let existing = scope.item(varname);

        if value.is_func() {
            self.check_func_var_name(name, existing.is_none())?;
        }

        match existing {
            Some(item) => {
                check_ro(item.flags, name)?;
                check_lock(item.lock, name)?;
                if scope.ptr_eq(&self.vimvars) {
                    let value = match &item.value {
                        Value::String(_) => Value::from(value.get_string()?.into_owned()),
                        Value::Number(_) => Value::Number(value.get_number()?),
                        old if old.type_id() != value.type_id() => {
                            return Err(EvalError::type_error(
                                "E963",
                                format!("setting {} to value with wrong type", name),
                            ))
                        }
                        _ => value,
                    };
                    scope.update(varname, |item| item.value = value);
                    return Ok(());
                }
                scope.update(varname, |item| {
                    item.value = value;
                    item.lock = VarLock::Unlocked;
                });
                Ok(())
            }
            None => {
                if scope.scope() == DictScope::Fixed {
                    return Err(illegal_name(name));
                }
                valid_varname(varname)?;
                scope.check_lock(name)?;
                scope.add(varname, value)
            }
        }
    }

    /// A variable holding a Funcref must be named like a function, and a new
    /// one must not hide an existing function.
    fn check_func_var_name(&self, name: &str, new_var: bool) -> Result<()> {
        let b = name.as_bytes();
        let scoped = b.len() > 1 && b[1] == b':';
        let allowed_scope = scoped && b"wbst".contains(&b[0]);
        let first = if scoped { b.get(2) } else { b.first() };
        if !allowed_scope && !first.map_or(false, u8::is_ascii_uppercase) {
            return Err(EvalError::parse(
                "E704",
                format!("Funcref variable name must start with a capital: {}", name),
            ));
        }
        if new_var && self.function_exists(name) {
            return Err(EvalError::parse(
                "E705",
                format!("Variable name conflicts with existing function: {}", name),
            ));
        }
        Ok(())
    }

    /// Delete variable `name`. Without `force` a missing variable is an
    /// error.
    pub fn unlet_var(&mut self, name: &str, force: bool) -> Result<()> {
        if let Some((scope, varname)) = self.find_scope(name) {
            if !varname.is_empty() {
                if let Some(item) = scope.item(varname) {
                    check_fixed(item.flags, name)?;
                    check_ro(item.flags, name)?;
                    scope.check_lock(name)?;
                    scope.remove(varname);
                    return Ok(());
                }
            }
        }
        if force {
            Ok(())
        } else {
            Err(EvalError::undefined(
                "E108",
                format!("No such variable: \"{}\"", name),
            ))
        }
    }

    /// `:lockvar` (`lock == true`) or `:unlockvar` of variable `name`, down
    /// to `deep` levels. A scope prefix alone locks the scope dictionary.
    pub fn lock_var(&mut self, name: &str, deep: i64, lock: bool) -> Result<()> {
        let undefined = || EvalError::undefined("E121", format!("Undefined variable: {}", name));
        let (scope, varname) = self.find_scope(name).ok_or_else(undefined)?;
        if varname.is_empty() {
            return lock_contents(&Value::Dict(scope), deep, lock, 0);
        }
        let item = scope.item(varname).ok_or_else(undefined)?;
        if item.flags.contains(ItemFlags::FIX) && !item.value.is_list() && !item.value.is_dict() {
            return Err(EvalError::locked(
                "E940",
                format!("Cannot lock or unlock variable {}", name),
            ));
        }
        scope.update(varname, |item| {
            item.flags.set(ItemFlags::LOCK, lock);
            if deep != 0 {
                item.lock = change_lock(lock, item.lock);
            }
        });
        lock_contents(&item.value, deep, lock, 0)
    }

    /// Returns `true` if variable `name` is locked, `None` if it doesn't
    /// exist.
    pub fn var_locked(&mut self, name: &str) -> Option<bool> {
        let (_, item) = self.find_var_item(name)?;
        Some(item.flags.contains(ItemFlags::LOCK) || is_locked(item.lock, &item.value))
    }
}
