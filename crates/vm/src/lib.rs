//! An embeddable interpreter for the Vim script expression language and
//! the commands around it: variables and their scopes, Lists and
//! Dictionaries, user functions and the collector for reference cycles.
//!
//! ```no_run
//! use vimscript_vm::Interp;
//!
//! let mut interp = Interp::default();
//! interp.source("let g:total = 1 + 2").unwrap();
//! assert_eq!(interp.eval_to_number("g:total").unwrap(), 3);
//! ```

mod builtin;
pub mod error;
pub mod eval;
pub mod exec;
pub mod func;
pub mod gc;
pub mod hashtab;
pub mod interp;
pub mod scope;
pub mod value;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, EvalError, Result};
pub use eval::{CmpOp, Eval, Lval, Target};
pub use exec::{LineSource, Script, ScriptLines};
pub use func::{FuncDef, FuncFlags, UserFunc};
pub use gc::{GcStats, Heap, RootHandle};
pub use interp::{DefaultHost, Executor, ForLoop, Host, Interp, Options};
pub use scope::EntityKind;
pub use value::{Dict, FuncRef, List, Value};
