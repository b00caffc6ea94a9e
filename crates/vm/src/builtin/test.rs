use pretty_assertions::assert_eq;
use test_env_log::test;

use super::*;
use crate::testing::interp;

fn repr(interp: &mut Interp, expr: &str) -> String {
    match interp.eval(expr) {
        Ok(v) => v.to_repr(),
        Err(e) => e.to_string(),
    }
}

fn check(cases: &[(&str, &str)]) {
    let mut interp = Interp::default();
    for &(expr, want) in cases {
        let got = repr(&mut interp, expr);
        assert_eq!(got, want, "{}", expr);
    }
}

fn error_id(interp: &mut Interp, expr: &str) -> &'static str {
    interp.eval(expr).expect_err(expr).id()
}

#[test]
fn test_table_is_sorted() {
    assert!(BUILTINS.windows(2).all(|w| w[0].name < w[1].name));
    assert_eq!(find("len").map(|b| (b.min_args, b.max_args)), Some((1, 1)));
    assert!(find("type").is_some());
    assert!(find("nosuch").is_none());
}

#[test]
fn test_list_functions() {
    check(&[
        ("add([1], 2)", "[1, 2]"),
        ("extend([1], [2, 3])", "[1, 2, 3]"),
        ("extend([1, 2], [9], 1)", "[1, 9, 2]"),
        ("insert([1, 2], 0)", "[0, 1, 2]"),
        ("insert([1, 2], 3, 2)", "[1, 2, 3]"),
        ("insert([1, 2], 3, -1)", "[1, 3, 2]"),
        ("index([1, 2, 3, 2], 2)", "1"),
        ("index([1, 2, 3, 2], 2, 2)", "3"),
        ("index(['A'], 'a', 0, 1)", "0"),
        ("index([1], 9)", "-1"),
        ("join([1, 'a', [2]], '-')", "'1-a-[2]'"),
        ("join([1, 2])", "'1 2'"),
        ("remove([1, 2, 3], 1)", "2"),
        ("remove([1, 2, 3, 4], 1, 2)", "[2, 3]"),
        ("range(3)", "[0, 1, 2]"),
        ("range(0)", "[]"),
        ("range(2, 4)", "[2, 3, 4]"),
        ("range(5, 1, -2)", "[5, 3, 1]"),
        ("get([1, 2], 1)", "2"),
        ("get([1, 2], 5, 'd')", "'d'"),
    ]);

    let mut interp = Interp::default();
    assert_eq!(error_id(&mut interp, "add(1, 2)"), "E714");
    assert_eq!(error_id(&mut interp, "insert([1], 0, 5)"), "E684");
    assert_eq!(error_id(&mut interp, "remove([1, 2, 3], 2, 1)"), "E16");
    assert_eq!(error_id(&mut interp, "remove([1], 5)"), "E684");
    assert_eq!(error_id(&mut interp, "range(1, 3, 0)"), "E726");
    assert_eq!(error_id(&mut interp, "range(2, 0)"), "E727");
    assert_eq!(
        interp.eval("range(9223372036854775806, 9223372036854775807)").map(|v| v.to_repr()),
        Ok("[9223372036854775806, 9223372036854775807]".to_owned())
    );
    assert_eq!(
        interp.eval("range(-9223372036854775807 - 1, -9223372036854775807)").map(|v| v.to_repr()),
        Ok("[-9223372036854775808, -9223372036854775807]".to_owned())
    );
    assert_eq!(
        interp.eval("range(-9223372036854775806, -9223372036854775807 - 1, -1)").map(|v| v.to_repr()),
        Ok("[-9223372036854775806, -9223372036854775807, -9223372036854775808]".to_owned())
    );
    assert_eq!(
        interp.eval("range(9223372036854775807, 0, -9223372036854775807)").map(|v| v.to_repr()),
        Ok("[9223372036854775807, 0]".to_owned())
    );
    assert_eq!(error_id(&mut interp, "extend(1, 2)"), "E712");
    assert_eq!(error_id(&mut interp, "extend([1], {})"), "E712");
}

#[test]
fn test_dict_functions() {
    check(&[
        ("extend({'a': 1}, {'a': 2, 'b': 3}).a", "2"),
        ("extend({'a': 1}, {'a': 2}, 'keep').a", "1"),
        ("get({'a': 1}, 'a')", "1"),
        ("get({}, 'x')", "0"),
        ("has_key({'a': 1}, 'a')", "1"),
        ("has_key({'a': 1}, 'b')", "0"),
        ("items({'a': 1})", "[['a', 1]]"),
        ("keys({'a': 1})", "['a']"),
        ("values({'a': [1]})", "[[1]]"),
        ("len(keys({'a': 1, 'b': 2, 'c': 3}))", "3"),
        ("remove({'a': 1}, 'a')", "1"),
    ]);

    let mut interp = Interp::default();
    assert_eq!(error_id(&mut interp, "extend({'a': 1}, {'a': 2}, 'error')"), "E737");
    assert_eq!(error_id(&mut interp, "extend({'a': 1}, {}, 'bad')"), "E475");
    assert_eq!(error_id(&mut interp, "has_key([], 'a')"), "E715");
    assert_eq!(error_id(&mut interp, "get(1, 0)"), "E896");
    assert_eq!(error_id(&mut interp, "remove({'a': 1}, 'b')"), "E716");
    assert_eq!(error_id(&mut interp, "remove(1, 0)"), "E896");
}

#[test]
fn test_value_functions() {
    check(&[
        ("empty('')", "1"),
        ("empty('x')", "0"),
        ("empty([])", "1"),
        ("empty([0])", "0"),
        ("empty({})", "1"),
        ("empty(0)", "1"),
        ("len('abc')", "3"),
        ("len(123)", "3"),
        ("len([1])", "1"),
        ("len({})", "0"),
        ("string([1, 'a'])", "'[1, ''a'']'"),
        ("string(function('len'))", "'function(''len'')'"),
        ("type(0)", "0"),
        ("type('')", "1"),
        ("type(function('len'))", "2"),
        ("type([])", "3"),
        ("type({})", "4"),
        ("type(0.0)", "5"),
    ]);

    let mut interp = Interp::default();
    assert_eq!(error_id(&mut interp, "len(1.5)"), "E701");
    assert_eq!(error_id(&mut interp, "function('Nope')"), "E700");
}

#[test]
fn test_copy() {
    let mut interp = Interp::default();
    interp
        .source("let l = [[1]]\nlet d = {}\nlet d.me = d")
        .expect("source");
    assert_eq!(interp.eval("copy(l) is l"), Ok(Value::from(false)));
    assert_eq!(interp.eval("copy(l)[0] is l[0]"), Ok(Value::from(true)));
    assert_eq!(interp.eval("deepcopy(l)[0] is l[0]"), Ok(Value::from(false)));
    assert_eq!(interp.eval("deepcopy(l) == l"), Ok(Value::from(true)));

    let e = interp.eval("deepcopy(d)").expect("deepcopy");
    interp.set_var("g:e", e).expect("set");
    assert_eq!(interp.eval("e.me is e"), Ok(Value::from(true)));
    assert_eq!(interp.eval("e.me is d"), Ok(Value::from(false)));
    assert_eq!(error_id(&mut interp, "deepcopy(l, 2)"), "E474");
}

#[test]
fn test_call() {
    let (mut interp, host) = interp();
    interp
        .source("function! GetN(add) dict\nreturn self.n + a:add\nendfunction")
        .expect("source");
    assert_eq!(interp.eval("call('len', [[1, 2]])"), Ok(Value::from(2)));
    assert_eq!(interp.eval("call(function('len'), ['abc'])"), Ok(Value::from(3)));
    assert_eq!(interp.eval("call('GetN', [1], {'n': 7})"), Ok(Value::from(8)));
    assert_eq!(error_id(&mut interp, "call('GetN', [1])"), "E725");
    assert_eq!(error_id(&mut interp, "call(1, [])"), "E475");
    assert_eq!(error_id(&mut interp, "call('len', 1)"), "E714");
    assert!(host.take_errors().is_empty());
}

#[test]
fn test_exists() {
    let mut interp = Interp::default();
    interp.source("let g:x = 1\nlet g:l = [1]").expect("source");
    let cases = [
        ("exists('g:x')", true),
        ("exists('x')", true),
        ("exists('g:y')", false),
        ("exists('g:l[0]')", true),
        ("exists('g:l[5]')", false),
        ("exists('&ic')", true),
        ("exists('&nosuch')", false),
        ("exists('*len')", true),
        ("exists('*Nope')", false),
        ("exists('9')", false),
    ];
    for (expr, want) in cases {
        assert_eq!(interp.eval(expr), Ok(Value::from(want)), "{}", expr);
    }
}

#[test]
fn test_islocked() {
    let mut interp = Interp::default();
    interp
        .source("let g:l = [1]\nlet g:d = {'k': 1}\nlockvar g:l\nlockvar g:d.k")
        .expect("source");
    assert_eq!(interp.eval("islocked('g:l')"), Ok(Value::from(true)));
    assert_eq!(interp.eval("islocked('g:l[0]')"), Ok(Value::from(true)));
    assert_eq!(interp.eval("islocked('g:d')"), Ok(Value::from(false)));
    assert_eq!(interp.eval("islocked('g:d.k')"), Ok(Value::from(true)));
    assert_eq!(error_id(&mut interp, "islocked('nope')"), "E121");
    assert_eq!(error_id(&mut interp, "islocked('g:l[0:1]')"), "E786");
    assert_eq!(error_id(&mut interp, "islocked('g:d.x')"), "E716");
}

#[test]
fn test_garbagecollect_is_deferred() {
    let mut interp = Interp::default();
    assert_eq!(interp.eval("garbagecollect()"), Ok(Value::from(0)));
    assert!(interp.want_gc);
    interp.safe_point();
    assert!(!interp.want_gc);
}
