use pretty_assertions::assert_eq;
use test_env_log::test;

use super::*;
use crate::testing::interp;

fn eval(expr: &str) -> Result<Value> {
    Interp::default().eval(expr)
}

fn repr(expr: &str) -> String {
    match eval(expr) {
        Ok(v) => v.to_repr(),
        Err(e) => e.to_string(),
    }
}

fn error_id(expr: &str) -> &'static str {
    eval(expr).expect_err(expr).id()
}

#[test]
fn test_arithmetic() {
    let cases: &[(&str, i64)] = &[
        ("1 + 2 * 3", 7),
        ("(1 + 2) * 3", 9),
        ("10 - 2 - 3", 5),
        ("7 / 2", 3),
        ("-7 / 2", -3),
        ("-7 % 3", -1),
        ("'3' + 4", 7),
        ("'abc' + 1", 1),
        ("0x10 + 0b11 + 010", 27),
        ("- -3", 3),
        ("!0", 1),
        ("!5", 0),
        ("1 / 0", i64::MAX),
        ("-1 / 0", -i64::MAX),
        ("0 / 0", i64::MIN),
        ("5 % 0", 0),
        ("9223372036854775807 + 1", i64::MIN),
    ];
    for &(expr, want) in cases {
        assert_eq!(eval(expr), Ok(Value::Number(want)), "{}", expr);
    }
}

#[test]
fn test_float_arithmetic() {
    assert_eq!(eval("1.5 + 1"), Ok(Value::Float(2.5)));
    assert_eq!(eval("3 / 2.0"), Ok(Value::Float(1.5)));
    assert_eq!(eval("1.0 / 0"), Ok(Value::Float(f64::INFINITY)));
    assert_eq!(eval("-1.0 / 0"), Ok(Value::Float(f64::NEG_INFINITY)));
    assert_eq!(eval("-1.5"), Ok(Value::Float(-1.5)));
    assert_eq!(eval("!0.0"), Ok(Value::Float(1.0)));
    assert_eq!(error_id("1.0 % 2"), "E804");
}

#[test]
fn test_concat() {
    assert_eq!(eval("'a' . 'b'"), Ok(Value::str("ab")));
    assert_eq!(eval("'a' .. 1"), Ok(Value::str("a1")));
    assert_eq!(eval("1 . 2"), Ok(Value::str("12")));
    assert_eq!(eval("\"tab\\there\""), Ok(Value::str("tab\there")));
    assert_eq!(eval("'it''s'"), Ok(Value::str("it's")));
    assert_eq!(error_id("'n' . [1]"), "E730");
}

#[test]
fn test_compare() {
    let cases: &[(&str, bool)] = &[
        ("1 == 1", true),
        ("1 != 1", false),
        ("2 > 1", true),
        ("2 <= 1", false),
        ("'10' < 9", false),
        ("'b' > 'a'", true),
        ("1.0 == 1", true),
        ("'abc' == 'ABC'", false),
        ("'abc' ==# 'ABC'", false),
        ("'abc' ==? 'ABC'", true),
        ("'abc' <? 'ABD'", true),
        ("'B' >? 'a'", true),
        ("'B' ># 'a'", false),
        ("'ÉTÉ' ==? 'été'", true),
        ("'Ab' <? 'abc'", true),
        ("'foobar' =~ '^foo'", true),
        ("'foobar' !~ 'baz'", true),
        ("'FOO' =~? 'foo'", true),
        ("'a1b2' =~ '\\v^(\\a\\d)+$'", true),
        ("[1, [2]] == [1, [2]]", true),
        ("[1, 2] is [1, 2]", false),
        ("{'a': 1} == {'a': 1}", true),
        ("{'a': 1} == {'a': 2}", false),
        ("function('len') == function('len')", true),
        ("1 is 1", true),
        ("1 is '1'", false),
    ];
    for &(expr, want) in cases {
        assert_eq!(eval(expr), Ok(Value::from(want)), "{}", expr);
    }
    assert_eq!(error_id("[1] == 1"), "E691");
    assert_eq!(error_id("[1] < [2]"), "E692");
    assert_eq!(error_id("{} < {}"), "E736");
    assert_eq!(error_id("'x' =~ '\\('"), "E383");
}

#[test]
fn test_compare_ignorecase_option() {
    let mut interp = Interp::default();
    interp.options.ignorecase = true;
    assert_eq!(interp.eval("'abc' == 'ABC'"), Ok(Value::from(true)));
    assert_eq!(interp.eval("'abc' ==# 'ABC'"), Ok(Value::from(false)));
    assert_eq!(interp.eval("&ic"), Ok(Value::from(true)));
}

#[test]
fn test_short_circuit() {
    assert_eq!(eval("1 || undefined"), Ok(Value::from(true)));
    assert_eq!(eval("0 && undefined"), Ok(Value::from(false)));
    assert_eq!(eval("0 || 0 || 3"), Ok(Value::from(true)));
    assert_eq!(eval("1 ? 'yes' : undefined"), Ok(Value::str("yes")));
    assert_eq!(eval("0 ? NoSuchFunction() : 2"), Ok(Value::from(2)));
    assert_eq!(eval("1 ? 0 ? 'a' : 'b' : 'c'"), Ok(Value::str("b")));
    assert_eq!(error_id("0 || undefined"), "E121");
    assert_eq!(error_id("1 ? 2"), "E109");
    assert_eq!(error_id("1 || [1, 2"), "E697");
}

#[test]
fn test_list_literal() {
    assert_eq!(repr("[1, 'two', [3]]"), "[1, 'two', [3]]");
    assert_eq!(repr("[1, 2,]"), "[1, 2]");
    assert_eq!(repr("[]"), "[]");
    assert_eq!(repr("[1] + [2, 3]"), "[1, 2, 3]");
    assert_eq!(error_id("[1 2]"), "E696");
    assert_eq!(error_id("[1, 2"), "E697");
}

#[test]
fn test_dict_literal() {
    assert_eq!(repr("{'a': [1]}"), "{'a': [1]}");
    assert_eq!(repr("{}"), "{}");
    assert_eq!(eval("{'a': 1, 'b': 2}.b"), Ok(Value::from(2)));
    assert_eq!(eval("{1: 'one'}['1']"), Ok(Value::str("one")));
    assert_eq!(eval("#{one: 1, two-2: 2}['two-2']"), Ok(Value::from(2)));
    assert_eq!(error_id("{'a' 1}"), "E720");
    assert_eq!(error_id("{'a': 1 'b': 2}"), "E722");
    assert_eq!(error_id("{'a': 1"), "E723");
    assert_eq!(error_id("{'a': 1, 'a': 2}"), "E721");
    assert_eq!(error_id("{'': 1}"), "E713");
}

#[test]
fn test_index_list() {
    assert_eq!(eval("[1, 2, 3][0]"), Ok(Value::from(1)));
    assert_eq!(eval("[1, 2, 3][-1]"), Ok(Value::from(3)));
    assert_eq!(repr("[1, 2, 3][1:]"), "[2, 3]");
    assert_eq!(repr("[1, 2, 3][:-2]"), "[1, 2]");
    assert_eq!(repr("[1, 2, 3][5:]"), "[]");
    assert_eq!(repr("[1, 2, 3][-5:1]"), "[1, 2]");
    assert_eq!(repr("[1, 2, 3][2:1]"), "[]");
    assert_eq!(
        eval("[1, 2, 3][3]").map_err(|e| e.to_string()),
        Err("E684: list index out of range: 3".to_owned())
    );
}

#[test]
fn test_index_string() {
    let cases = [
        ("'hello'[1]", "e"),
        ("'hello'[1:3]", "ell"),
        ("'hello'[3:]", "lo"),
        ("'hello'[-3:]", "llo"),
        ("'hello'[-1]", ""),
        ("'hello'[10]", ""),
        ("'hello'[3:1]", ""),
        ("123[1]", "2"),
    ];
    for (expr, want) in cases {
        assert_eq!(eval(expr), Ok(Value::str(want)), "{}", expr);
    }
}

#[test]
fn test_index_dict() {
    assert_eq!(eval("{'a': {'b': 5}}.a.b"), Ok(Value::from(5)));
    assert_eq!(eval("{'a': {'b': 5}}['a']['b']"), Ok(Value::from(5)));
    assert_eq!(
        eval("{'a': 1}['b']").map_err(|e| e.to_string()),
        Err("E716: Key not present in Dictionary: \"b\"".to_owned())
    );
    assert_eq!(error_id("{'a': 1}[0:1]"), "E719");
    assert_eq!(error_id("1.5[0]"), "E806");
    assert_eq!(error_id("function('len')[0]"), "E695");
    assert_eq!(error_id("[1][0"), "E111");
}

#[test]
fn test_variables() {
    let mut interp = Interp::default();
    interp.set_var("g:x", Value::from(5)).expect("set");
    interp.set_var("g:n", Value::str("1")).expect("set");
    interp.set_var("g:var_1", Value::from(42)).expect("set");
    assert_eq!(interp.eval("x + g:x"), Ok(Value::from(10)));
    assert_eq!(interp.eval("var_{n}"), Ok(Value::from(42)));
    assert_eq!(interp.eval("var_{n + 1 - 1}"), Ok(Value::from(42)));
    assert_eq!(interp.eval("v:version == version"), Ok(Value::from(true)));
    assert_eq!(interp.eval("undefined").unwrap_err().id(), "E121");
    assert_eq!(interp.eval("{''}").unwrap_err().id(), "E15");
}

#[test]
fn test_host_values() {
    let (mut interp, _host) = interp();
    assert_eq!(interp.eval("&sw"), Ok(Value::from(8)));
    assert_eq!(interp.eval("&g:ft"), Ok(Value::str("vim")));
    assert_eq!(interp.eval("&maxfuncdepth"), Ok(Value::from(100)));
    assert_eq!(interp.eval("&nosuch").unwrap_err().id(), "E113");
    assert_eq!(interp.eval("&").unwrap_err().id(), "E112");
    assert_eq!(interp.eval("$VIMSCRIPT_TEST"), Ok(Value::str("yes")));
    assert_eq!(interp.eval("$NOT_SET_ANYWHERE"), Ok(Value::str("")));
    assert_eq!(interp.eval("@a"), Ok(Value::str("register a")));
    assert_eq!(interp.eval("@b"), Ok(Value::str("")));
}

#[test]
fn test_calls() {
    let mut interp = Interp::default();
    assert_eq!(interp.eval("len([1, 2, 3])"), Ok(Value::from(3)));
    assert_eq!(interp.eval("function('len')([1, 2])"), Ok(Value::from(2)));
    let f = interp.eval("function('len')").expect("funcref");
    interp.set_var("g:F", f).expect("set");
    assert_eq!(interp.eval("F('abc')"), Ok(Value::from(3)));
    assert_eq!(interp.eval("len(1, 2)").unwrap_err().id(), "E118");
    assert_eq!(interp.eval("len()").unwrap_err().id(), "E119");
    assert_eq!(interp.eval("nosuch()").unwrap_err().id(), "E117");
    assert_eq!(interp.eval("Nosuch()").unwrap_err().id(), "E117");
    assert_eq!(interp.eval("len([1] [2])").unwrap_err().id(), "E116");
}

#[test]
fn test_trailing_and_invalid() {
    assert_eq!(error_id("1 2"), "E488");
    assert_eq!(error_id(")"), "E15");
    assert_eq!(error_id("(1"), "E110");
    let deep = format!("{}1{}", "(".repeat(150), ")".repeat(150));
    assert_eq!(error_id(&deep), "E1169");
}

#[test]
fn test_interrupt() {
    let (mut interp, host) = interp();
    host.interrupt.set(true);
    assert!(interp.eval("1 + 2").unwrap_err().is_interrupt());
}

fn lval(interp: &mut Interp, text: &str) -> Result<Lval> {
    let mut eval = Eval::new(interp, text);
    let lv = eval.get_lval()?;
    eval.expect_end()?;
    Ok(lv)
}

#[test]
fn test_lval_assign() {
    let mut interp = Interp::default();
    let l = interp.eval("[1, 2, 3]").expect("list");
    interp.set_var("g:l", l).expect("set");
    let d = interp.eval("{'a': {}}").expect("dict");
    interp.set_var("g:d", d).expect("set");

    let lv = lval(&mut interp, "l[1]").expect("lval");
    assert!(matches!(lv.target, Target::ListItem { .. }));
    interp.set_lval(&lv, Value::from(20), None).expect("assign");
    assert_eq!(interp.eval("string(l)"), Ok(Value::str("[1, 20, 3]")));

    let lv = lval(&mut interp, "l[1:]").expect("lval");
    let v = interp.eval("[7, 8, 9]").expect("list");
    interp.set_lval(&lv, v, None).expect("assign");
    assert_eq!(interp.eval("string(l)"), Ok(Value::str("[1, 7, 8, 9]")));

    let lv = lval(&mut interp, "d.a.new").expect("lval");
    assert!(!lv.exists(&mut interp));
    interp.set_lval(&lv, Value::str("x"), None).expect("assign");
    assert_eq!(interp.eval("d.a.new"), Ok(Value::str("x")));

    assert_eq!(lval(&mut interp, "l[9]").unwrap_err().id(), "E684");
    assert_eq!(lval(&mut interp, "d.x.y").unwrap_err().id(), "E716");
    assert_eq!(lval(&mut interp, "d[1:2]").unwrap_err().id(), "E719");
    assert_eq!(lval(&mut interp, "l[0:1][0]").unwrap_err().id(), "E708");
    assert_eq!(lval(&mut interp, "9x").unwrap_err().id(), "E461");
}

#[test]
fn test_lval_compound() {
    let mut interp = Interp::default();
    interp.set_var("g:n", Value::from(10)).expect("set");
    interp.set_var("g:s", Value::str("a")).expect("set");
    let l = interp.eval("[1]").expect("list");
    interp.set_var("g:l", l.clone()).expect("set");
    interp.set_var("g:m", l).expect("set");

    let n = lval(&mut interp, "n").expect("lval");
    interp.set_lval(&n, Value::from(5), Some(b'-')).expect("-=");
    interp.set_lval(&n, Value::from(3), Some(b'*')).expect("*=");
    assert_eq!(interp.eval("n"), Ok(Value::from(15)));
    interp.set_lval(&n, Value::Float(0.5), Some(b'+')).expect("+=");
    assert_eq!(interp.eval("n"), Ok(Value::Float(15.5)));

    let s = lval(&mut interp, "s").expect("lval");
    interp.set_lval(&s, Value::from(1), Some(b'.')).expect(".=");
    assert_eq!(interp.eval("s"), Ok(Value::str("a1")));
    let err = interp.set_lval(&s, Value::Float(1.0), Some(b'.')).unwrap_err();
    assert_eq!(err.id(), "E734");

    let l = lval(&mut interp, "l").expect("lval");
    let more = interp.eval("[2, 3]").expect("list");
    interp.set_lval(&l, more, Some(b'+')).expect("+=");
    assert_eq!(interp.eval("m is l && len(m) == 3"), Ok(Value::from(true)));
    let err = interp.set_lval(&l, Value::from(1), Some(b'+')).unwrap_err();
    assert_eq!(err.id(), "E734");
}
