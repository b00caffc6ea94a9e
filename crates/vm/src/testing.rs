use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::EvalError;
use crate::interp::{Host, Interp, Options};
use crate::value::Value;

/// A host that records what is echoed and reported.
#[derive(Default)]
pub(crate) struct TestHost {
    pub output: RefCell<Vec<String>>,
    pub errors: RefCell<Vec<String>>,
    pub interrupt: Cell<bool>,
    pub line: Cell<i64>,
}

impl Host for TestHost {
    fn get_option(&self, name: &str) -> Option<Value> {
        match name {
            "shiftwidth" | "sw" => Some(Value::from(8)),
            "filetype" | "ft" => Some(Value::str("vim")),
            _ => None,
        }
    }

    fn get_register(&self, name: char) -> Option<String> {
        (name == 'a').then(|| "register a".to_owned())
    }

    fn get_env(&self, name: &str) -> Option<String> {
        (name == "VIMSCRIPT_TEST").then(|| "yes".to_owned())
    }

    fn got_int(&self) -> bool {
        self.interrupt.get()
    }

    fn cursor_line(&self) -> i64 {
        self.line.get().max(1)
    }

    fn echo(&self, text: &str) {
        self.output.borrow_mut().push(text.to_owned());
    }

    fn emsg(&self, err: &EvalError) {
        self.errors.borrow_mut().push(err.to_string());
    }
}

impl TestHost {
    pub fn take_output(&self) -> Vec<String> {
        self.output.take()
    }

    pub fn take_errors(&self) -> Vec<String> {
        self.errors.take()
    }
}

pub(crate) fn interp() -> (Interp, Rc<TestHost>) {
    let host = Rc::new(TestHost::default());
    let interp = Interp::with_host(Options::default(), host.clone());
    (interp, host)
}
