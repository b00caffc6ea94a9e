//! The interpreter state and its entry points.

#[cfg(test)]
mod test;

use std::rc::{Rc, Weak};

use fnv::FnvHashMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::eval::pattern::PatternCache;
use crate::eval::Eval;
use crate::exec::{LineSource, Script, ScriptLines};
use crate::func::{FuncCall, UserFunc};
use crate::gc::{GcStats, Heap, Marker, Roots};
use crate::scope::EntityKind;
use crate::value::{Dict, DictScope, List, Value, WatcherKey};

/// Settings of an interpreter.
#[derive(Debug, Clone)]
pub struct Options {
    /// Compare strings ignoring case when the operator has no `#` or `?`.
    pub ignorecase: bool,
    /// Maximum depth of nested user function calls.
    pub maxfuncdepth: usize,
    /// Number of retired call frames that makes the next safe point run a
    /// collection.
    pub pending_call_threshold: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            ignorecase: false,
            maxfuncdepth: 100,
            pending_call_threshold: 4096,
        }
    }
}

/// The application embedding the interpreter.
pub trait Host {
    /// Value of an option other than the ones the interpreter owns.
    fn get_option(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Contents of a register, `@r` in expressions.
    fn get_register(&self, _name: char) -> Option<String> {
        None
    }

    fn get_env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    /// Polled between operands; once it returns `true` evaluation stops with
    /// an [`Interrupted`](crate::ErrorKind::Interrupted) error.
    fn got_int(&self) -> bool {
        false
    }

    /// Line number passed to functions as `a:firstline` and `a:lastline`
    /// when no range is given.
    fn cursor_line(&self) -> i64 {
        1
    }

    /// Output of `:echo`.
    fn echo(&self, text: &str) {
        println!("{}", text);
    }

    /// Report an error message.
    fn emsg(&self, err: &EvalError) {
        eprintln!("{}", err);
    }
}

/// A [`Host`] using the process environment, stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHost;

impl Host for DefaultHost {}

/// Runs the lines of a function body or a sourced script.
pub trait Executor {
    fn execute(&self, interp: &mut Interp, lines: &mut dyn LineSource) -> Result<()>;
}

pub struct Interp {
    pub(crate) heap: Heap,
    pub(crate) globals: Dict,
    pub(crate) vimvars: Dict,
    /// Scopes of sourced scripts, script id `n` at index `n - 1`.
    pub(crate) scripts: Vec<Dict>,
    /// Id of the script being sourced or defining the running function, `0`
    /// when there is none.
    pub(crate) current_script: usize,
    pub(crate) entities: FnvHashMap<(EntityKind, u32), Dict>,
    pub(crate) current_entities: [u32; 3],

    pub(crate) functions: FnvHashMap<SmolStr, Rc<UserFunc>>,
    pub(crate) numbered: FnvHashMap<u32, Weak<UserFunc>>,
    pub(crate) last_func_nr: u32,

    /// The innermost running function call.
    pub(crate) call_stack: Option<Rc<FuncCall>>,
    /// Calls that returned while their scopes were still referenced.
    pub(crate) pending_calls: Vec<Rc<FuncCall>>,
    pub(crate) call_depth: usize,

    pub options: Options,
    host: Rc<dyn Host>,
    executor: Rc<dyn Executor>,

    pub(crate) did_emsg: bool,
    pub(crate) want_gc: bool,
    pub(crate) patterns: PatternCache,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Interp {
    pub fn new(options: Options) -> Interp {
        Self::with_host(options, Rc::new(DefaultHost))
    }

    pub fn with_host(options: Options, host: Rc<dyn Host>) -> Interp {
        let mut heap = Heap::new();
        let globals = heap.new_scope_dict(DictScope::Def);
        let vimvars = heap.new_scope_dict(DictScope::Fixed);
        let mut interp = Interp {
            heap,
            globals,
            vimvars,
            scripts: Vec::new(),
            current_script: 0,
            entities: FnvHashMap::default(),
            current_entities: [1; 3],
            functions: FnvHashMap::default(),
            numbered: FnvHashMap::default(),
            last_func_nr: 0,
            call_stack: None,
            pending_calls: Vec::new(),
            call_depth: 0,
            options,
            host,
            executor: Rc::new(Script),
            did_emsg: false,
            want_gc: false,
            patterns: PatternCache::default(),
        };
        interp.init_vimvars();
        interp
    }

    /// Replace the statement executor used for function bodies and sourced
    /// scripts.
    pub fn set_executor(&mut self, executor: Rc<dyn Executor>) {
        self.executor = executor;
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    pub fn heap(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn new_list(&mut self) -> List {
        self.heap.new_list()
    }

    pub fn new_dict(&mut self) -> Dict {
        self.heap.new_dict()
    }

    /// Evaluate one expression. Anything but white space after it is an
    /// error.
    pub fn eval(&mut self, expr: &str) -> Result<Value> {
        let mut eval = Eval::new(self, expr);
        let v = eval.expr1(true)?;
        eval.expect_end()?;
        Ok(v)
    }

    pub fn eval_to_bool(&mut self, expr: &str) -> Result<bool> {
        self.eval(expr)?.to_bool()
    }

    pub fn eval_to_number(&mut self, expr: &str) -> Result<i64> {
        self.eval(expr)?.get_number()
    }

    /// Evaluate to a string. The items of a List are joined, each followed by
    /// a newline.
    pub fn eval_to_string(&mut self, expr: &str) -> Result<String> {
        match self.eval(expr)? {
            Value::List(l) => {
                let mut s = String::new();
                for item in l.values() {
                    s.push_str(&item.get_string()?);
                    s.push('\n');
                }
                Ok(s)
            }
            v => v.get_string().map(|s| s.into_owned()),
        }
    }

    /// Value of `&name`. The interpreter's own options are answered here,
    /// the rest by the host.
    pub fn get_option(&self, name: &str) -> Result<Value> {
        match name {
            "ignorecase" | "ic" => Ok(Value::from(self.options.ignorecase)),
            "maxfuncdepth" | "mfd" => Ok(Value::from(self.options.maxfuncdepth as i64)),
            _ => self
                .host
                .get_option(name)
                .ok_or_else(|| EvalError::undefined("E113", format!("Unknown option: {}", name))),
        }
    }

    /// Call a function by name, the way a host callback does.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.call_func(name, args, None, None)
    }

    /// Run script text as a new script with its own `s:` scope.
    pub fn source(&mut self, text: &str) -> Result<()> {
        let sid = self.new_script();
        let save_script = std::mem::replace(&mut self.current_script, sid);
        let mut lines = ScriptLines::new(text);
        let executor = self.executor.clone();
        let res = executor.execute(self, &mut lines);
        self.current_script = save_script;
        res
    }

    /// Report an error: sets the error flag and hands the message to the
    /// host.
    pub fn emsg(&mut self, err: &EvalError) {
        debug!(%err, "error");
        self.did_emsg = true;
        self.host.emsg(err);
    }

    /// Returns `true` if an error was reported since the last
    /// [`clear_error`](Interp::clear_error).
    pub fn did_emsg(&self) -> bool {
        self.did_emsg
    }

    pub fn clear_error(&mut self) {
        self.did_emsg = false;
    }

    pub(crate) fn got_int(&self) -> bool {
        self.host.got_int()
    }

    pub(crate) fn executor(&self) -> Rc<dyn Executor> {
        self.executor.clone()
    }

    /// Ask for a collection at the next safe point.
    pub fn request_gc(&mut self) {
        self.want_gc = true;
    }

    /// Run a requested collection. Must only be called while no expression
    /// is being evaluated.
    pub fn safe_point(&mut self) {
        if self.want_gc && self.call_depth == 0 {
            self.garbage_collect();
        }
    }

    /// Collect unreachable cycles now. Values the host holds outside the
    /// interpreter must be rooted with [`Heap::root`].
    pub fn garbage_collect(&mut self) -> GcStats {
        self.want_gc = false;
        let mut heap = std::mem::take(&mut self.heap);
        let stats = heap.collect(self);
        self.heap = heap;
        debug!(?stats, "garbage collected");
        stats
    }

    /// Start iterating over a List or the characters of a String.
    pub fn for_begin(&mut self, v: Value) -> Result<ForLoop> {
        let state = match v {
            Value::List(list) => {
                let watcher = list.watch(list.first());
                ForState::List { list, watcher }
            }
            Value::String(s) => ForState::Chars {
                chars: s.chars().rev().collect(),
            },
            _ => return Err(EvalError::type_error("E714", "List required")),
        };
        Ok(ForLoop { state })
    }

    /// The next item of the iteration, `None` when done.
    pub fn for_next(&mut self, fl: &mut ForLoop) -> Option<Value> {
        match &mut fl.state {
            ForState::List { list, watcher } => {
                let cur = list.watcher_cursor(*watcher)?;
                list.set_watcher_cursor(*watcher, list.next(cur));
                list.item(cur)
            }
            ForState::Chars { chars } => chars.pop().map(|c| Value::from(c.to_string())),
        }
    }

    /// Finish an iteration. Dropping the [`ForLoop`] does the same.
    pub fn for_end(&mut self, fl: ForLoop) {
        drop(fl)
    }
}

/// State of a `:for` loop, see [`Interp::for_begin`].
pub struct ForLoop {
    state: ForState,
}

enum ForState {
    /// The watcher points to the next item to visit.
    List { list: List, watcher: WatcherKey },
    /// Characters left to visit, in reverse order.
    Chars { chars: Vec<char> },
}

impl Drop for ForLoop {
    fn drop(&mut self) {
        if let ForState::List { list, watcher } = &self.state {
            list.unwatch(*watcher);
        }
    }
}

impl Roots for Interp {
    fn trace_roots(&self, marker: &mut Marker) {
        marker.mark_dict(&self.globals);
        marker.mark_dict(&self.vimvars);
        for d in &self.scripts {
            marker.mark_dict(d);
        }
        for d in self.entities.values() {
            marker.mark_dict(d);
        }
        let mut call = self.call_stack.clone();
        while let Some(fc) = call {
            fc.trace(marker);
            call = fc.caller();
        }
    }

    fn trace_pending(&self, marker: &mut Marker) {
        for fc in &self.pending_calls {
            fc.trace(marker);
        }
    }

    fn free_pending(&mut self, copy_id: u32) -> usize {
        let before = self.pending_calls.len();
        self.pending_calls.retain(|fc| {
            if fc.is_marked(copy_id) {
                true
            } else {
                fc.clear();
                false
            }
        });
        before - self.pending_calls.len()
    }
}
