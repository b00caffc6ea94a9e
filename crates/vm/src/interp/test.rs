use std::cell::RefCell;

use pretty_assertions::assert_eq;
use test_env_log::test;

use super::*;
use crate::testing::interp;

#[test]
fn test_eval_conversions() {
    let mut interp = Interp::default();
    assert_eq!(interp.eval_to_string("['a', 1]").unwrap(), "a\n1\n");
    assert_eq!(interp.eval_to_string("[]").unwrap(), "");
    assert_eq!(interp.eval_to_string("12").unwrap(), "12");
    assert_eq!(interp.eval_to_string("{}").unwrap_err().id(), "E731");
    assert_eq!(interp.eval_to_string("[[1]]").unwrap_err().id(), "E730");
    assert_eq!(interp.eval_to_number("'12abc'"), Ok(12));
    assert_eq!(interp.eval_to_number("1.5").unwrap_err().id(), "E805");
    assert_eq!(interp.eval_to_bool("1 > 0"), Ok(true));
    assert_eq!(interp.eval_to_bool("'x'"), Ok(false));
}

#[test]
fn test_get_option() {
    let (mut interp, _host) = interp();
    assert_eq!(interp.get_option("ic"), Ok(Value::from(false)));
    assert_eq!(interp.get_option("maxfuncdepth"), Ok(Value::from(100)));
    assert_eq!(interp.get_option("sw"), Ok(Value::from(8)));
    assert_eq!(interp.get_option("nosuch").unwrap_err().id(), "E113");

    interp.options.ignorecase = true;
    assert_eq!(interp.eval("&ignorecase"), Ok(Value::from(true)));
    assert_eq!(Interp::default().get_option("sw").unwrap_err().id(), "E113");
}

#[test]
fn test_errors_reach_host() {
    let (mut interp, host) = interp();
    assert!(!interp.did_emsg());
    interp.source("echo nope\necho 'next'").unwrap();
    assert!(interp.did_emsg());
    assert_eq!(host.take_output(), vec!["next"]);
    assert_eq!(host.take_errors(), vec!["E121: Undefined variable: nope"]);

    interp.clear_error();
    assert!(!interp.did_emsg());
    interp.emsg(&EvalError::parse("E15", "Invalid expression: x"));
    assert!(interp.did_emsg());
    assert_eq!(host.take_errors(), vec!["E15: Invalid expression: x"]);
}

#[test]
fn test_for_iteration() {
    let mut interp = Interp::default();
    let l = interp.eval("[1, 2, 3]").unwrap();
    interp.set_var("g:l", l.clone()).unwrap();

    let mut fl = interp.for_begin(l).unwrap();
    assert_eq!(interp.for_next(&mut fl), Some(Value::from(1)));
    interp.eval("remove(g:l, 1)").unwrap();
    assert_eq!(interp.for_next(&mut fl), Some(Value::from(3)));
    interp.eval("add(g:l, 4)").unwrap();
    assert_eq!(interp.for_next(&mut fl), Some(Value::from(4)));
    assert_eq!(interp.for_next(&mut fl), None);
    interp.for_end(fl);

    let mut fl = interp.for_begin(Value::str("aé")).unwrap();
    assert_eq!(interp.for_next(&mut fl), Some(Value::str("a")));
    assert_eq!(interp.for_next(&mut fl), Some(Value::str("é")));
    assert_eq!(interp.for_next(&mut fl), None);

    assert_eq!(interp.for_begin(Value::from(1)).err().map(|e| e.id()), Some("E714"));
}

#[test]
fn test_collect_cycles() {
    let mut interp = Interp::default();
    assert_eq!(interp.garbage_collect(), GcStats::default());

    interp
        .source("let l = []\ncall add(l, l)\nlet d = {}\nlet d.me = d\nlet d.l = l\nunlet l d")
        .unwrap();
    let stats = interp.garbage_collect();
    assert_eq!((stats.lists, stats.dicts, stats.frames), (1, 1, 0));
    assert_eq!(interp.garbage_collect(), GcStats::default());
}

#[test]
fn test_rooted_values_survive() {
    let mut interp = Interp::default();
    interp.source("let g:c = {}\nlet g:c.me = g:c").unwrap();
    let c = interp.get_var("g:c").unwrap();
    let handle = interp.heap().root(c);
    interp.unlet_var("g:c", false).unwrap();

    assert_eq!(interp.garbage_collect().dicts, 0);
    let c = interp.heap().rooted(handle).cloned().unwrap();
    assert!(matches!(&c, Value::Dict(d) if d.contains_key("me")));
    drop(c);

    assert!(interp.heap().unroot(handle).is_some());
    assert_eq!(interp.garbage_collect().dicts, 1);
}

/// Collects the lines it is given instead of running them.
#[derive(Default)]
struct Recorder {
    lines: RefCell<Vec<String>>,
}

impl Executor for Recorder {
    fn execute(&self, _interp: &mut Interp, lines: &mut dyn LineSource) -> Result<()> {
        while let Some((_, line)) = lines.next_line() {
            self.lines.borrow_mut().push(line);
        }
        Ok(())
    }
}

#[test]
fn test_custom_executor() {
    let mut interp = Interp::default();
    let def = crate::FuncDef {
        lines: vec!["body".to_owned()],
        ..Default::default()
    };
    interp.define_function("F", def).unwrap();

    let recorder = Rc::new(Recorder::default());
    interp.set_executor(recorder.clone());
    interp.source("first\n  \\ continued\nsecond").unwrap();
    assert_eq!(interp.eval("F()"), Ok(Value::from(0)));
    assert_eq!(
        *recorder.lines.borrow(),
        vec!["first continued", "second", "body"]
    );
}
