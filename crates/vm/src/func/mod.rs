//! User functions and the call engine.
//!
//! A call binds its arguments into a fresh `a:` scope, pushes a
//! [`FuncCall`] frame and hands the body to the [`Executor`] line by line.
//! When the call returns and something still references its `l:` or `a:`
//! scope, the frame is kept on a pending list until the collector finds it
//! unreachable.
//!
//! [`Executor`]: crate::Executor


use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bitflags::bitflags;
use itertools::Itertools;
use smol_str::SmolStr;
use tracing::{debug, trace};
use vimscript_syn::name::{script_prefix_len, AUTOLOAD_CHAR};

use crate::builtin;
use crate::error::{ErrorKind, EvalError, Result};
use crate::exec::LineSource;
use crate::gc::Marker;
use crate::interp::Interp;
use crate::value::{Dict, DictItem, DictScope, FuncRef, ItemFlags, List, Value, VarLock};

/// Maximum number of arguments of a function call.
pub const MAX_FUNC_ARGS: usize = 20;

bitflags! {
    #[derive(Default)]
    pub struct FuncFlags: u8 {
        /// Takes extra arguments after the named ones (`...`).
        const VARARGS = 0b0001;
        /// Handles a range itself.
        const RANGE = 0b0010;
        /// Must be called through a dictionary, which becomes `self`.
        const DICT = 0b0100;
        /// Stops at the first error.
        const ABORT = 0b1000;
    }
}

/// A function defined with `:function`.
#[derive(Debug)]
pub struct UserFunc {
    name: SmolStr,
    pub(crate) args: Vec<SmolStr>,
    /// Expressions of the default values of the last `defaults.len()`
    /// arguments.
    pub(crate) defaults: Vec<String>,
    pub(crate) flags: FuncFlags,
    pub(crate) lines: Vec<String>,
    /// Script the function was defined in, `0` for none.
    pub(crate) script_id: usize,
    /// Number of running calls.
    calls: Cell<usize>,
    /// Number of calls since the function was defined.
    call_count: Cell<u64>,
}

impl UserFunc {
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn flags(&self) -> FuncFlags {
        self.flags
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns `true` while a call of this function is running.
    pub fn in_use(&self) -> bool {
        self.calls.get() > 0
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.get()
    }

    fn min_args(&self) -> usize {
        self.args.len().saturating_sub(self.defaults.len())
    }
}

/// Everything needed to define a function.
#[derive(Debug, Clone, Default)]
pub struct FuncDef {
    pub args: Vec<SmolStr>,
    pub defaults: Vec<String>,
    pub flags: FuncFlags,
    pub lines: Vec<String>,
    /// Replace an existing function (`:function!`).
    pub force: bool,
}

/// The frame of a running or retired function call.
pub struct FuncCall {
    pub(crate) func: Rc<UserFunc>,
    caller: RefCell<Option<Rc<FuncCall>>>,
    /// `l:`
    pub(crate) locals: Dict,
    /// `a:`
    pub(crate) args: Dict,
    /// `a:000`
    pub(crate) varargs: List,
    /// Index of the next line to run.
    line: Cell<usize>,
    returned: Cell<bool>,
    retval: RefCell<Value>,
    /// Nesting depth, `1` for a call from the top level.
    pub(crate) level: usize,
    lines_executed: Cell<usize>,
}

impl FuncCall {
    pub(crate) fn caller(&self) -> Option<Rc<FuncCall>> {
        self.caller.borrow().clone()
    }

    pub fn func(&self) -> &Rc<UserFunc> {
        &self.func
    }

    pub fn lines_executed(&self) -> usize {
        self.lines_executed.get()
    }

    pub(crate) fn trace(&self, marker: &mut Marker) {
        marker.mark_dict(&self.locals);
        marker.mark_dict(&self.args);
        marker.mark_list(&self.varargs);
    }

    /// Whether one of the scopes was reached by a collection with
    /// `copy_id`.
    pub(crate) fn is_marked(&self, copy_id: u32) -> bool {
        self.locals.copy_id() == copy_id
            || self.args.copy_id() == copy_id
            || self.varargs.copy_id() == copy_id
    }

    /// Whether something besides this frame holds one of its scopes. The
    /// `a:000` entry always holds the variadic list.
    fn is_referenced(&self) -> bool {
        self.locals.ref_count() > 1 || self.args.ref_count() > 1 || self.varargs.ref_count() > 2
    }

    /// Drop the contents of the scopes.
    pub(crate) fn clear(&self) {
        self.caller.borrow_mut().take();
        self.locals.take_all();
        self.args.take_all();
        self.varargs.take_all();
    }
}

/// The body of a running call, as a [`LineSource`].
pub(crate) struct FuncBody {
    call: Rc<FuncCall>,
}

impl LineSource for FuncBody {
    fn next_line(&mut self) -> Option<(usize, String)> {
        let idx = self.call.line.get();
        let line = self.call.func.lines.get(idx)?.clone();
        self.call.line.set(idx + 1);
        self.call.lines_executed.set(self.call.lines_executed.get() + 1);
        Some((idx, line))
    }

    fn goto(&mut self, line: usize) {
        self.call.line.set(line)
    }
}

fn unknown_function(name: &str) -> EvalError {
    EvalError::undefined("E117", format!("Unknown function: {}", name))
}

/// Builtin functions have lowercase names without scope or autoload part.
pub(crate) fn is_builtin_name(name: &str) -> bool {
    let b = name.as_bytes();
    b.first().map_or(false, u8::is_ascii_lowercase)
        && b.get(1) != Some(&b':')
        && !b.contains(&AUTOLOAD_CHAR)
}

impl Interp {
    /// Translate a function name as written in a call or definition: strip
    /// `g:` and turn `s:Name` and `<SID>Name` into `<SNR>{id}_Name`.
    pub(crate) fn trans_func_name(&self, name: &str) -> Result<SmolStr> {
        let plen = script_prefix_len(name);
        if plen > 0 {
            if plen == 5 && name.get(1..4).map_or(false, |p| p.eq_ignore_ascii_case("SNR")) {
                return Ok(SmolStr::new(name));
            }
            if self.current_script == 0 {
                return Err(EvalError::parse(
                    "E81",
                    "Using <SID> not in a script context",
                ));
            }
            return Ok(SmolStr::from(format!(
                "<SNR>{}_{}",
                self.current_script,
                &name[plen..]
            )));
        }
        Ok(SmolStr::new(name.strip_prefix("g:").unwrap_or(name)))
    }

    /// Find a user function by its translated name.
    pub(crate) fn find_user_func(&mut self, name: &str) -> Option<Rc<UserFunc>> {
        if !name.is_empty() && name.bytes().all(|c| c.is_ascii_digit()) {
            let nr = name.parse::<u32>().ok()?;
            let f = self.numbered.get(&nr)?.upgrade();
            if f.is_none() {
                self.numbered.remove(&nr);
            }
            return f;
        }
        self.functions.get(name).cloned()
    }

    /// Returns `true` if `name` is a builtin or a defined user function.
    pub fn function_exists(&self, name: &str) -> bool {
        let name = match self.trans_func_name(name) {
            Ok(name) => name,
            Err(_) => return false,
        };
        if is_builtin_name(&name) {
            return builtin::find(&name).is_some();
        }
        if name.bytes().all(|c| c.is_ascii_digit()) {
            return name
                .parse::<u32>()
                .ok()
                .and_then(|nr| self.numbered.get(&nr))
                .map_or(false, |f| f.strong_count() > 0);
        }
        self.functions.contains_key(name.as_str())
    }

    /// Call function `name` with `args`. `selfdict` is the dictionary the
    /// function was found in, `range` the line range of `:call`.
    pub fn call_func(
        &mut self,
        name: &str,
        args: Vec<Value>,
        selfdict: Option<Dict>,
        range: Option<(i64, i64)>,
    ) -> Result<Value> {
        if args.len() > MAX_FUNC_ARGS {
            return Err(EvalError::new(
                ErrorKind::TooManyArguments,
                "E740",
                format!("Too many arguments for function {}", name),
            ));
        }
        let fname = self.trans_func_name(name)?;
        if is_builtin_name(&fname) {
            let b = builtin::find(&fname).ok_or_else(|| unknown_function(name))?;
            check_arity(name, args.len(), b.min_args, Some(b.max_args))?;
            return (b.func)(self, args);
        }
        let fp = self
            .find_user_func(&fname)
            .ok_or_else(|| unknown_function(name))?;
        self.call_user_func(fp, args, selfdict, range)
    }

    /// Call the function a Funcref refers to.
    pub fn call_funcref(
        &mut self,
        f: &FuncRef,
        args: Vec<Value>,
        selfdict: Option<Dict>,
    ) -> Result<Value> {
        match f {
            FuncRef::Named(name) => self.call_func(name, args, selfdict, None),
            FuncRef::Numbered(fp) => {
                if args.len() > MAX_FUNC_ARGS {
                    return Err(EvalError::new(
                        ErrorKind::TooManyArguments,
                        "E740",
                        format!("Too many arguments for function {}", fp.name()),
                    ));
                }
                self.call_user_func(fp.clone(), args, selfdict, None)
            }
        }
    }

    pub(crate) fn call_user_func(
        &mut self,
        fp: Rc<UserFunc>,
        args: Vec<Value>,
        selfdict: Option<Dict>,
        range: Option<(i64, i64)>,
    ) -> Result<Value> {
        let max = if fp.flags.contains(FuncFlags::VARARGS) {
            None
        } else {
            Some(fp.args.len())
        };
        check_arity(&fp.name, args.len(), fp.min_args(), max)?;
        if fp.flags.contains(FuncFlags::DICT) && selfdict.is_none() {
            return Err(EvalError::new(
                ErrorKind::DictRequired,
                "E725",
                format!("Calling dict function without Dictionary: {}", fp.name),
            ));
        }
        if self.call_depth >= self.options.maxfuncdepth {
            return Err(EvalError::recursion(
                "E132",
                "Function call depth is higher than 'maxfuncdepth'",
            ));
        }

        let fc = Rc::new(self.bind_call(&fp, args, selfdict, range)?);
        *fc.caller.borrow_mut() = self.call_stack.replace(fc.clone());
        self.call_depth += 1;
        fp.calls.set(fp.calls.get() + 1);
        fp.call_count.set(fp.call_count.get() + 1);
        let save_did_emsg = std::mem::replace(&mut self.did_emsg, false);
        let save_script = std::mem::replace(&mut self.current_script, fp.script_id);
        debug!(name = %fp.name, depth = fc.level, "calling function");

        let res = self.bind_defaults(&fc).and_then(|()| {
            let executor = self.executor();
            let mut body = FuncBody { call: fc.clone() };
            executor.execute(self, &mut body)
        });

        let aborted = fp.flags.contains(FuncFlags::ABORT) && self.did_emsg;
        self.did_emsg |= save_did_emsg;
        self.current_script = save_script;
        fp.calls.set(fp.calls.get() - 1);
        self.call_depth -= 1;
        self.call_stack = fc.caller.borrow_mut().take();
        let retval = fc.retval.replace(Value::Number(0));
        trace!(name = %fp.name, lines = fc.lines_executed(), "returned from function");
        self.retire_call(fc);

        res?;
        if aborted {
            Ok(Value::Number(-1))
        } else {
            Ok(retval)
        }
    }

    /// Build the frame of a call: the named arguments that were given, the
    /// variadic ones and the fixed `a:` entries.
    fn bind_call(
        &mut self,
        fp: &Rc<UserFunc>,
        args: Vec<Value>,
        selfdict: Option<Dict>,
        range: Option<(i64, i64)>,
    ) -> Result<FuncCall> {
        let fixed = ItemFlags::RO | ItemFlags::FIX;
        let fixed_item = |value| DictItem {
            value,
            lock: VarLock::Fixed,
            flags: fixed,
        };

        let locals = self.heap.new_scope_dict(DictScope::Def);
        let avars = self.heap.new_scope_dict(DictScope::Fixed);
        let varargs = self.heap.new_list();
        varargs.set_lock(VarLock::Fixed);

        if let Some(d) = selfdict.filter(|_| fp.flags.contains(FuncFlags::DICT)) {
            locals.add_item("self", DictItem::with_flags(Value::Dict(d), fixed))?;
        }

        let named = fp.args.len();
        let mut args = args.into_iter();
        let given = args.by_ref().take(named).collect::<Vec<_>>();
        for v in args {
            let key = varargs.push(v);
            varargs.set_item_lock(key, VarLock::Fixed);
        }

        let (first, last) = range.unwrap_or_else(|| {
            let line = self.host().cursor_line();
            (line, line)
        });
        avars.add_item("0", fixed_item(Value::from(varargs.len() as i64)))?;
        avars.add_item("000", fixed_item(Value::List(varargs.clone())))?;
        avars.add_item("firstline", fixed_item(Value::from(first)))?;
        avars.add_item("lastline", fixed_item(Value::from(last)))?;
        for (name, v) in fp.args.iter().zip(given) {
            avars.add_item(name, fixed_item(v))?;
        }
        for (i, v) in varargs.values().into_iter().enumerate() {
            avars.add_item(&(i + 1).to_string(), fixed_item(v))?;
        }

        Ok(FuncCall {
            func: fp.clone(),
            caller: RefCell::new(None),
            locals,
            args: avars,
            varargs,
            line: Cell::new(0),
            returned: Cell::new(false),
            retval: RefCell::new(Value::Number(0)),
            level: self.call_depth + 1,
            lines_executed: Cell::new(0),
        })
    }

    /// Evaluate the default values of the arguments that were not given.
    /// Runs inside the new frame, so earlier arguments can be used.
    fn bind_defaults(&mut self, fc: &FuncCall) -> Result<()> {
        let fp = &fc.func;
        let first_default = fp.min_args();
        for (i, name) in fp.args.iter().enumerate().skip(first_default) {
            if fc.args.contains_key(name) {
                continue;
            }
            let value = self.eval(&fp.defaults[i - first_default])?;
            fc.args.add_item(
                name,
                DictItem {
                    value,
                    lock: VarLock::Fixed,
                    flags: ItemFlags::RO | ItemFlags::FIX,
                },
            )?;
        }
        Ok(())
    }

    /// Free a returned frame, or keep it for the collector when its scopes
    /// are still referenced.
    fn retire_call(&mut self, fc: Rc<FuncCall>) {
        if fc.is_referenced() {
            trace!(name = %fc.func.name, "keeping frame of returned call");
            self.pending_calls.push(fc);
            if self.pending_calls.len() >= self.options.pending_call_threshold {
                self.want_gc = true;
            }
        } else {
            fc.clear();
        }
    }

    /// `:return`: set the value of the running call.
    pub fn do_return(&mut self, value: Value) -> Result<()> {
        let fc = self.call_stack.as_ref().ok_or_else(|| {
            EvalError::parse("E133", ":return not inside a function")
        })?;
        *fc.retval.borrow_mut() = value;
        fc.returned.set(true);
        Ok(())
    }

    /// Returns `true` after `:return` in the running call.
    pub fn returned(&self) -> bool {
        self.call_stack.as_ref().map_or(false, |fc| fc.returned.get())
    }

    /// Returns `true` when the running call must stop because of an error.
    pub fn aborting(&self) -> bool {
        self.did_emsg
            && self
                .call_stack
                .as_ref()
                .map_or(false, |fc| fc.func.flags.contains(FuncFlags::ABORT))
    }

    /// Returns `true` while a user function runs.
    pub fn in_function(&self) -> bool {
        self.call_stack.is_some()
    }

    /// Define a function. `name` is the name as written after `:function`:
    /// a global or script-local name, or a dictionary entry (`dict.key`,
    /// `dict['key']`) that gets a numbered function.
    pub fn define_function(&mut self, name: &str, def: FuncDef) -> Result<()> {
        check_arg_names(&def.args)?;
        if def.defaults.len() > def.args.len() {
            return Err(EvalError::parse(
                "E475",
                format!(
                    "Invalid argument: {} default values for {} arguments",
                    def.defaults.len(),
                    def.args.len()
                ),
            ));
        }
        if is_dict_target(name) {
            return self.define_dict_function(name, def);
        }

        let fname = self.trans_func_name(name)?;
        let special = fname.starts_with('<');
        if !special && !fname.starts_with(|c: char| c.is_ascii_uppercase()) && !fname.contains('#')
        {
            return Err(EvalError::parse(
                "E128",
                format!("Function name must start with a capital or \"s:\": {}", name),
            ));
        }
        if fname.contains(':') {
            return Err(EvalError::parse(
                "E884",
                format!("Function name cannot contain a colon: {}", name),
            ));
        }
        if let Some(old) = self.functions.get(fname.as_str()) {
            if !def.force {
                return Err(EvalError::parse(
                    "E122",
                    format!("Function {} already exists, add ! to replace it", name),
                ));
            }
            if old.in_use() {
                return Err(EvalError::parse(
                    "E127",
                    format!("Cannot redefine function {}: It is in use", name),
                ));
            }
        }

        debug!(name = %fname, "defining function");
        let f = self.new_user_func(fname.clone(), def);
        self.functions.insert(fname, f);
        Ok(())
    }

    fn new_user_func(&self, name: SmolStr, def: FuncDef) -> Rc<UserFunc> {
        Rc::new(UserFunc {
            name,
            args: def.args,
            defaults: def.defaults,
            flags: def.flags,
            lines: def.lines,
            script_id: self.current_script,
            calls: Cell::new(0),
            call_count: Cell::new(0),
        })
    }

    fn define_dict_function(&mut self, name: &str, def: FuncDef) -> Result<()> {
        let (dict, key) = self.dict_target(name)?;
        if let Some(item) = dict.item(&key) {
            if !def.force {
                return Err(EvalError::parse("E717", "Dictionary entry already exists"));
            }
            if !item.value.is_func() {
                return Err(EvalError::type_error("E718", "Funcref required"));
            }
        }
        self.last_func_nr += 1;
        let nr = self.last_func_nr;
        let f = self.new_user_func(SmolStr::from(nr.to_string()), def);
        debug!(nr, dict_key = %key, "defining numbered function");
        self.numbered.insert(nr, Rc::downgrade(&f));
        dict.set(&key, Value::Func(FuncRef::Numbered(f)))?;
        Ok(())
    }

    /// `:delfunction`. Deleting a dictionary entry drops the reference to its
    /// numbered function.
    pub fn delete_function(&mut self, name: &str) -> Result<()> {
        if is_dict_target(name) {
            let (dict, key) = self.dict_target(name)?;
            return match dict.remove(&key) {
                Some(_) => Ok(()),
                None => Err(EvalError::undefined(
                    "E130",
                    format!("Unknown function: {}", name),
                )),
            };
        }
        let fname = self.trans_func_name(name)?;
        let f = self.functions.get(fname.as_str()).ok_or_else(|| {
            EvalError::undefined("E130", format!("Unknown function: {}", name))
        })?;
        if f.in_use() {
            return Err(EvalError::new(
                ErrorKind::Locked,
                "E131",
                format!("Cannot delete function {}: It is in use", name),
            ));
        }
        debug!(name = %fname, "deleting function");
        self.functions.remove(fname.as_str());
        Ok(())
    }

    /// Names of all named user functions, sorted.
    pub fn function_names(&self) -> Vec<SmolStr> {
        let mut names = self.functions.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// The definition of user function `name` the way `:function` lists
    /// it, with numbered lines.
    pub fn function_listing(&mut self, name: &str) -> Result<String> {
        let fp = self
            .trans_func_name(name)
            .ok()
            .and_then(|fname| self.find_user_func(&fname))
            .ok_or_else(|| EvalError::undefined("E123", format!("Undefined function: {}", name)))?;
        let mut out = format!("function {}({})", fp.name, fp.signature());
        for (flag, word) in [
            (FuncFlags::RANGE, " range"),
            (FuncFlags::DICT, " dict"),
            (FuncFlags::ABORT, " abort"),
        ] {
            if fp.flags.contains(flag) {
                out.push_str(word);
            }
        }
        for (i, line) in fp.lines.iter().enumerate() {
            out.push_str(&format!("\n{:<3} {}", i + 1, line));
        }
        out.push_str("\n   endfunction");
        Ok(out)
    }
}

impl UserFunc {
    /// The argument list as written in the definition.
    pub fn signature(&self) -> String {
        let first_default = self.min_args();
        let varargs = self
            .flags
            .contains(FuncFlags::VARARGS)
            .then(|| "...".to_owned());
        self.args
            .iter()
            .enumerate()
            .map(|(i, name)| match i.checked_sub(first_default) {
                Some(d) => format!("{} = {}", name, self.defaults[d]),
                None => name.to_string(),
            })
            .chain(varargs)
            .join(", ")
    }
}

fn check_arity(name: &str, count: usize, min: usize, max: Option<usize>) -> Result<()> {
    if count < min {
        return Err(EvalError::new(
            ErrorKind::TooFewArguments,
            "E119",
            format!("Not enough arguments for function: {}", name),
        ));
    }
    if max.map_or(false, |max| count > max) {
        return Err(EvalError::new(
            ErrorKind::TooManyArguments,
            "E118",
            format!("Too many arguments for function: {}", name),
        ));
    }
    Ok(())
}

fn check_arg_names(args: &[SmolStr]) -> Result<()> {
    for (i, arg) in args.iter().enumerate() {
        let b = arg.as_bytes();
        let valid = b.first().map_or(false, |&c| c.is_ascii_alphabetic() || c == b'_')
            && b.iter().all(|&c| c.is_ascii_alphanumeric() || c == b'_')
            && arg != "firstline"
            && arg != "lastline";
        if !valid {
            return Err(EvalError::parse("E125", format!("Illegal argument: {}", arg)));
        }
        if args[..i].contains(arg) {
            return Err(EvalError::parse(
                "E853",
                format!("Duplicate argument name: {}", arg),
            ));
        }
    }
    Ok(())
}

/// `dict.key` or `dict[key]` after `:function` or `:delfunction`.
fn is_dict_target(name: &str) -> bool {
    name.contains(|c| c == '.' || c == '[')
}
