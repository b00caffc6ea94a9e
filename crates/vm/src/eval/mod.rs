//! The expression evaluator.
//!
//! A recursive descent over the source text, one method per precedence
//! level, from [`expr1`](Eval::expr1) (the ternary operator) down to
//! [`expr7`](Eval::expr7) (unary operators, primaries and subscripts).
//!
//! Every level takes an `evaluate` flag. Without it the same grammar is
//! walked to find the end of an expression: nothing is looked up, no
//! function is called and only syntax errors are raised. The untaken
//! operands of `?:`, `||` and `&&` are parsed that way.

mod compare;
mod lval;
pub(crate) mod pattern;
#[cfg(test)]
mod test;

use std::borrow::Cow;

use vimscript_syn::literal::{scan_lit_string, scan_number, scan_string, Number};
use vimscript_syn::name::{dict_key_len, find_name_end, ident_len, script_prefix_len};
use vimscript_syn::{Lexer, Token};

pub use compare::CmpOp;
pub use lval::{Lval, Target};

use crate::error::{EvalError, Result};
use crate::func::MAX_FUNC_ARGS;
use crate::interp::Interp;
use crate::value::{Dict, FuncRef, Value};

/// Nesting limit of parenthesized and nested expressions.
const MAX_EXPR_DEPTH: usize = 100;

/// Evaluates expressions from a piece of source text.
pub struct Eval<'i, 'src> {
    /// The interpreter supplying variables and functions.
    pub(crate) interp: &'i mut Interp,

    /// The lexer over the expression text. Literals and names are scanned
    /// from the raw text, after which the lexer is reset past them.
    pub(crate) lex: Lexer<'src>,

    /// Current nesting of [`expr1`](Eval::expr1).
    depth: usize,
}

impl<'i, 'src> Eval<'i, 'src> {
    pub fn new(interp: &'i mut Interp, source: &'src str) -> Self {
        Eval {
            interp,
            lex: Lexer::new(source),
            depth: 0,
        }
    }

    /// Byte offset of the end of the last parsed token.
    pub fn offset(&self) -> usize {
        self.lex.offset()
    }

    /// The unparsed text, white space included.
    pub fn rest(&self) -> &'src str {
        self.lex.rest()
    }

    /// Text from the next token on, for error messages.
    fn remaining(&mut self) -> &'src str {
        let start = self.lex.peek_span().start;
        &self.lex.source()[start..]
    }

    fn peek_is(&mut self, tok: Token) -> bool {
        self.lex.peek() == Some(tok)
    }

    /// Fails with `E488` unless only white space is left.
    pub fn expect_end(&mut self) -> Result<()> {
        if self.lex.at_end() {
            Ok(())
        } else {
            Err(EvalError::parse(
                "E488",
                format!("Trailing characters: {}", self.remaining()),
            ))
        }
    }

    /// What may follow an expression in a command: nothing, a `"` comment,
    /// or `|` and the next command, which is returned.
    pub fn next_command(&mut self) -> Result<Option<&'src str>> {
        match self.lex.peek() {
            None | Some(Token::DoubleQuote) => Ok(None),
            Some(Token::Bar) => {
                self.lex.next();
                Ok(Some(self.lex.rest()))
            }
            Some(_) => self.expect_end().map(|()| None),
        }
    }

    fn check_interrupt(&self) -> Result<()> {
        if self.interp.got_int() {
            Err(EvalError::interrupted())
        } else {
            Ok(())
        }
    }

    /// `expr2 ? expr1 : expr1`
    pub fn expr1(&mut self, evaluate: bool) -> Result<Value> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(EvalError::recursion("E1169", "Expression too recursive"));
        }
        self.depth += 1;
        let res = self.ternary(evaluate);
        self.depth -= 1;
        res
    }

    fn ternary(&mut self, evaluate: bool) -> Result<Value> {
        let cond = self.expr2(evaluate)?;
        if !self.lex.eat(Token::Question) {
            return Ok(cond);
        }
        let take_first = evaluate && cond.to_bool()?;
        let first = self.expr1(take_first)?;
        if !self.lex.eat(Token::Colon) {
            return Err(EvalError::parse("E109", "Missing ':' after '?'"));
        }
        let second = self.expr1(evaluate && !take_first)?;
        Ok(if take_first { first } else { second })
    }

    /// `expr3 || expr3 ...`
    fn expr2(&mut self, evaluate: bool) -> Result<Value> {
        let first = self.expr3(evaluate)?;
        if !self.peek_is(Token::OrOr) {
            return Ok(first);
        }
        let mut result = evaluate && first.to_bool()?;
        while self.lex.eat(Token::OrOr) {
            let run = evaluate && !result;
            let rhs = self.expr3(run)?;
            if run {
                result = rhs.to_bool()?;
            }
        }
        Ok(Value::from(result))
    }

    /// `expr4 && expr4 ...`
    fn expr3(&mut self, evaluate: bool) -> Result<Value> {
        let first = self.expr4(evaluate)?;
        if !self.peek_is(Token::AndAnd) {
            return Ok(first);
        }
        let mut result = evaluate && first.to_bool()?;
        while self.lex.eat(Token::AndAnd) {
            let run = evaluate && result;
            let rhs = self.expr4(run)?;
            if run {
                result = rhs.to_bool()?;
            }
        }
        Ok(Value::from(result))
    }

    /// Comparison: `expr5 {op}[#?] expr5`
    fn expr4(&mut self, evaluate: bool) -> Result<Value> {
        let lhs = self.expr5(evaluate)?;
        let op = match self.lex.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::GtEq) => CmpOp::Ge,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::LtEq) => CmpOp::Le,
            Some(Token::Match) => CmpOp::Match,
            Some(Token::NotMatch) => CmpOp::NoMatch,
            Some(Token::Name) => match self.lex.peek_slice() {
                "is" => CmpOp::Is,
                "isnot" => CmpOp::IsNot,
                _ => return Ok(lhs),
            },
            _ => return Ok(lhs),
        };
        self.lex.next();
        let ic = match self.lex.rest().as_bytes().first() {
            Some(b'#') => {
                self.lex.bump(1);
                false
            }
            Some(b'?') => {
                self.lex.bump(1);
                true
            }
            _ => self.interp.options.ignorecase,
        };
        let rhs = self.expr5(evaluate)?;
        if !evaluate {
            return Ok(Value::Number(0));
        }
        compare::compare(self.interp, &lhs, &rhs, op, ic).map(Value::from)
    }

    /// `expr6 + expr6`, `-`, `.` and `..`
    fn expr5(&mut self, evaluate: bool) -> Result<Value> {
        let mut lhs = self.expr6(evaluate, false)?;
        loop {
            let op = match self.lex.peek() {
                Some(Token::Plus) => b'+',
                Some(Token::Minus) => b'-',
                Some(Token::Dot | Token::DotDot) => b'.',
                _ => return Ok(lhs),
            };
            self.lex.next();
            let rhs = self.expr6(evaluate, op == b'.')?;
            if evaluate {
                lhs = self.add(op, lhs, rhs)?;
            }
        }
    }

    fn add(&mut self, op: u8, lhs: Value, rhs: Value) -> Result<Value> {
        match (op, &lhs, &rhs) {
            (b'.', _, _) => {
                let mut s = lhs.get_string()?.into_owned();
                s.push_str(&rhs.get_string()?);
                Ok(Value::from(s))
            }
            (b'+', Value::List(a), Value::List(b)) => {
                let items = a.values().into_iter().chain(b.values());
                Ok(Value::List(self.interp.heap.list_from(items)))
            }
            _ => arith(op, &lhs, &rhs),
        }
    }

    /// `expr7 * expr7`, `/` and `%`
    fn expr6(&mut self, evaluate: bool, want_string: bool) -> Result<Value> {
        let mut lhs = self.expr7(evaluate, want_string)?;
        loop {
            let op = match self.lex.peek() {
                Some(Token::Star) => b'*',
                Some(Token::Slash) => b'/',
                Some(Token::Percent) => b'%',
                _ => return Ok(lhs),
            };
            self.lex.next();
            let rhs = self.expr7(evaluate, false)?;
            if evaluate {
                lhs = arith(op, &lhs, &rhs)?;
            }
        }
    }

    /// Unary `!`, `-` and `+`, applied right to left after the primary and
    /// its subscripts.
    fn expr7(&mut self, evaluate: bool, want_string: bool) -> Result<Value> {
        if evaluate {
            self.check_interrupt()?;
        }
        let mut leaders = Vec::new();
        loop {
            let op = match self.lex.peek() {
                Some(Token::Bang) => b'!',
                Some(Token::Minus) => b'-',
                Some(Token::Plus) => b'+',
                _ => break,
            };
            self.lex.next();
            leaders.push(op);
        }

        let v = self.primary(evaluate, want_string)?;
        let v = self.subscripts(v, evaluate)?;
        if !evaluate || leaders.is_empty() {
            return Ok(v);
        }

        let mut v = v;
        for &op in leaders.iter().rev() {
            v = match (op, v) {
                (b'!', Value::Float(f)) => Value::Float(if f == 0.0 { 1.0 } else { 0.0 }),
                (b'-', Value::Float(f)) => Value::Float(-f),
                (_, v @ Value::Float(_)) => v,
                (b'!', v) => Value::from(v.get_number()? == 0),
                (b'-', v) => Value::Number(v.get_number()?.wrapping_neg()),
                (_, v) => Value::Number(v.get_number()?),
            };
        }
        Ok(v)
    }

    fn primary(&mut self, evaluate: bool, want_string: bool) -> Result<Value> {
        let src = self.lex.source();
        let tok = self.lex.peek();
        let start = self.lex.peek_span().start;
        match tok {
            Some(Token::Number) => {
                let (n, len) = scan_number(&src[start..], want_string);
                self.lex.reset(start + len);
                Ok(match n {
                    Number::Int(n) => Value::Number(n),
                    Number::Float(f) => Value::Float(f),
                })
            }
            Some(Token::DoubleQuote) => {
                let (s, len) = scan_string(&src[start..])?;
                self.lex.reset(start + len);
                Ok(Value::from(s))
            }
            Some(Token::SingleQuote) => {
                let (s, len) = scan_lit_string(&src[start..])?;
                self.lex.reset(start + len);
                Ok(Value::from(s))
            }
            Some(Token::LBracket) => {
                self.lex.next();
                self.list_literal(evaluate)
            }
            Some(Token::HashBrace) => {
                self.lex.next();
                self.dict_literal(evaluate, true)
            }
            Some(Token::LBrace) => self.dict_or_name(start, evaluate),
            Some(Token::LParen) => {
                self.lex.next();
                let v = self.expr1(evaluate)?;
                if !self.lex.eat(Token::RParen) {
                    return Err(EvalError::parse("E110", "Missing ')'"));
                }
                Ok(v)
            }
            Some(Token::Amp) => {
                self.lex.next();
                self.option(evaluate)
            }
            Some(Token::Dollar) => {
                self.lex.next();
                let start = self.lex.offset();
                let len = ident_len(&src[start..]);
                if len == 0 {
                    return Err(EvalError::invalid_expr(&src[start - 1..]));
                }
                self.lex.reset(start + len);
                if !evaluate {
                    return Ok(Value::Number(0));
                }
                let value = self.interp.host().get_env(&src[start..start + len]);
                Ok(Value::from(value.unwrap_or_default()))
            }
            Some(Token::At) => {
                self.lex.next();
                let start = self.lex.offset();
                let reg = src[start..].chars().next();
                self.lex.reset(start + reg.map_or(0, char::len_utf8));
                if !evaluate {
                    return Ok(Value::Number(0));
                }
                let value = reg.and_then(|r| self.interp.host().get_register(r));
                Ok(Value::from(value.unwrap_or_default()))
            }
            Some(Token::Name) => self.name(start, evaluate),
            Some(Token::Lt) if script_prefix_len(&src[start..]) == 5 => self.name(start, evaluate),
            _ => Err(EvalError::invalid_expr(&src[start..])),
        }
    }

    /// `[expr, ...]`, after the `[`.
    fn list_literal(&mut self, evaluate: bool) -> Result<Value> {
        let list = evaluate.then(|| self.interp.new_list());
        loop {
            if self.lex.eat(Token::RBracket) {
                break;
            }
            if self.lex.at_end() {
                return Err(missing_list_end(self.lex.source()));
            }
            let v = self.expr1(evaluate)?;
            if let Some(l) = &list {
                l.push(v);
            }
            if self.lex.eat(Token::RBracket) {
                break;
            }
            if !self.lex.eat(Token::Comma) {
                if self.lex.at_end() {
                    return Err(missing_list_end(self.lex.source()));
                }
                return Err(EvalError::parse(
                    "E696",
                    format!("Missing comma in List: {}", self.remaining()),
                ));
            }
        }
        Ok(list.map_or(Value::Number(0), Value::List))
    }

    /// `{` starts a dictionary, unless what follows is a single expression
    /// and `}`: then it is a name with a curly-brace part. That is checked
    /// without evaluating, so no function is called twice.
    fn dict_or_name(&mut self, start: usize, evaluate: bool) -> Result<Value> {
        self.lex.next();
        let after = self.lex.offset();
        if !self.peek_is(Token::RBrace) {
            self.expr1(false)?;
            if self.peek_is(Token::RBrace) {
                self.lex.reset(start);
                return self.name(start, evaluate);
            }
            self.lex.reset(after);
        }
        self.dict_literal(evaluate, false)
    }

    /// `{key: value, ...}` or `#{key: value, ...}`, after the brace. Keys of
    /// the second form are not evaluated.
    fn dict_literal(&mut self, evaluate: bool, literal_keys: bool) -> Result<Value> {
        let dict = evaluate.then(|| self.interp.new_dict());
        loop {
            if self.lex.eat(Token::RBrace) {
                break;
            }
            if self.lex.at_end() {
                return Err(missing_dict_end(self.lex.source()));
            }

            let key = if literal_keys {
                let src = self.lex.source();
                let start = self.lex.peek_span().start;
                let len = literal_key_len(&src[start..]);
                if len == 0 {
                    return Err(EvalError::invalid_expr(&src[start..]));
                }
                self.lex.reset(start + len);
                Some(Cow::Borrowed(&src[start..start + len]))
            } else {
                let k = self.expr1(evaluate)?;
                match evaluate {
                    true => Some(Cow::Owned(k.get_string()?.into_owned())),
                    false => None,
                }
            };

            if !self.lex.eat(Token::Colon) {
                return Err(EvalError::parse(
                    "E720",
                    format!("Missing colon in Dictionary: {}", self.remaining()),
                ));
            }
            let value = self.expr1(evaluate)?;
            if let (Some(d), Some(key)) = (&dict, key) {
                d.add(&key, value)?;
            }

            if self.lex.eat(Token::RBrace) {
                break;
            }
            if !self.lex.eat(Token::Comma) {
                if self.lex.at_end() {
                    return Err(missing_dict_end(self.lex.source()));
                }
                return Err(EvalError::parse(
                    "E722",
                    format!("Missing comma in Dictionary: {}", self.remaining()),
                ));
            }
        }
        Ok(dict.map_or(Value::Number(0), Value::Dict))
    }

    /// `&name`, `&g:name` or `&l:name`, after the `&`.
    fn option(&mut self, evaluate: bool) -> Result<Value> {
        let src = self.lex.source();
        let start = self.lex.offset();
        let mut p = start;
        if src[p..].starts_with("g:") || src[p..].starts_with("l:") {
            p += 2;
        }
        let len = ident_len(&src[p..]);
        if len == 0 {
            return Err(EvalError::parse(
                "E112",
                format!("Option name missing: {}", &src[start - 1..]),
            ));
        }
        self.lex.reset(p + len);
        if !evaluate {
            return Ok(Value::Number(0));
        }
        self.interp.get_option(&src[p..p + len])
    }

    /// A variable or a function call. The name may contain curly-brace
    /// parts, which are evaluated and pasted in.
    fn name(&mut self, start: usize, evaluate: bool) -> Result<Value> {
        let src = self.lex.source();
        let text = &src[start..];
        let prefix = if text.starts_with('<') { 5 } else { 0 };
        let end = find_name_end(&text[prefix..], false, false);
        if end.len == 0 {
            return Err(EvalError::invalid_expr(text));
        }
        let raw = &text[..prefix + end.len];
        self.lex.reset(start + raw.len());

        let name = match (end.braces, evaluate) {
            (Some(_), true) => Cow::Owned(self.expand_name(raw)?),
            _ => Cow::Borrowed(raw),
        };

        if self.lex.rest().starts_with('(') {
            self.lex.next();
            let args = self.call_args(evaluate, &name)?;
            if !evaluate {
                return Ok(Value::Number(0));
            }
            return match self.interp.find_var(&name) {
                Some(Value::Func(f)) => self.interp.call_funcref(&f, args, None),
                _ => self.interp.call_func(&name, args, None, None),
            };
        }
        if !evaluate {
            return Ok(Value::Number(0));
        }
        self.interp.get_var(&name)
    }

    /// Replace every `{expr}` in `text` with the value of `expr`.
    pub(crate) fn expand_name(&mut self, text: &str) -> Result<String> {
        let mut out = String::new();
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            let close = find_name_end(&rest[open..], false, false)
                .braces
                .map(|(_, close)| open + close)
                .ok_or_else(|| EvalError::invalid_expr(text))?;
            out.push_str(&rest[..open]);
            let v = self.interp.eval(&rest[open + 1..close])?;
            out.push_str(&v.get_string()?);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        if out.is_empty() {
            return Err(EvalError::invalid_expr(text));
        }
        Ok(out)
    }

    /// Arguments of a call, after the `(`.
    fn call_args(&mut self, evaluate: bool, name: &str) -> Result<Vec<Value>> {
        let mut args = Vec::new();
        loop {
            if self.lex.eat(Token::RParen) {
                break;
            }
            if args.len() >= MAX_FUNC_ARGS {
                return Err(EvalError::new(
                    crate::error::ErrorKind::TooManyArguments,
                    "E740",
                    format!("Too many arguments for function {}", name),
                ));
            }
            args.push(self.expr1(evaluate)?);
            if self.lex.eat(Token::RParen) {
                break;
            }
            if !self.lex.eat(Token::Comma) {
                return Err(EvalError::parse(
                    "E116",
                    format!("Invalid arguments for function {}", name),
                ));
            }
        }
        Ok(args)
    }

    /// `[index]`, `[first:last]`, `.key` and `(args)` following a value
    /// without white space in between.
    fn subscripts(&mut self, mut v: Value, evaluate: bool) -> Result<Value> {
        // The dictionary a Funcref was taken from, passed as `self`.
        let mut selfdict: Option<Dict> = None;
        while self.lex.is_adjacent() {
            match self.lex.peek() {
                Some(Token::LParen) if !evaluate || v.is_func() => {
                    self.lex.next();
                    let f = v.as_func().cloned();
                    let name = f.as_ref().map(FuncRef::name).unwrap_or_default();
                    let args = self.call_args(evaluate, &name)?;
                    if let Some(f) = f.filter(|_| evaluate) {
                        v = self.interp.call_funcref(&f, args, selfdict.take())?;
                    }
                    selfdict = None;
                }
                Some(Token::LBracket) => {
                    selfdict = v.as_dict().cloned();
                    self.lex.next();
                    v = self.index(v, evaluate)?;
                }
                Some(Token::Dot)
                    if (v.is_dict() || !evaluate) && dict_key_len(&self.lex.rest()[1..]) > 0 =>
                {
                    selfdict = v.as_dict().cloned();
                    self.lex.next();
                    let src = self.lex.source();
                    let start = self.lex.offset();
                    let key = &src[start..start + dict_key_len(&src[start..])];
                    self.lex.reset(start + key.len());
                    if evaluate {
                        v = dict_member(&v, key)?;
                    }
                }
                _ => break,
            }
        }
        Ok(v)
    }

    /// `[index]` or `[first:last]`, after the `[`.
    fn index(&mut self, v: Value, evaluate: bool) -> Result<Value> {
        if evaluate {
            match v {
                Value::Func(_) => {
                    return Err(EvalError::type_error("E695", "Cannot index a Funcref"))
                }
                Value::Float(_) => {
                    return Err(EvalError::type_error("E806", "Using a Float as a String"))
                }
                _ => {}
            }
        }
        let first = if self.peek_is(Token::Colon) {
            None
        } else {
            Some(self.expr1(evaluate)?)
        };
        let mut range = false;
        let mut last = None;
        if self.lex.eat(Token::Colon) {
            range = true;
            if !self.peek_is(Token::RBracket) {
                last = Some(self.expr1(evaluate)?);
            }
        }
        if !self.lex.eat(Token::RBracket) {
            return Err(EvalError::parse("E111", "Missing ']'"));
        }
        if !evaluate {
            return Ok(Value::Number(0));
        }

        self.index_value(v, first, last, range)
    }

    fn index_value(
        &mut self,
        v: Value,
        first: Option<Value>,
        last: Option<Value>,
        range: bool,
    ) -> Result<Value> {
        match v {
            Value::Dict(d) => {
                if range {
                    return Err(EvalError::type_error(
                        "E719",
                        "Cannot use [:] with a Dictionary",
                    ));
                }
                let key = match &first {
                    Some(k) => k.get_string()?,
                    None => Cow::Borrowed(""),
                };
                d.get(&key).ok_or_else(|| key_not_present(&key))
            }
            Value::List(l) => {
                let len = l.len() as i64;
                let n1 = first.map(|n| n.get_number()).transpose()?;
                if !range {
                    let n = n1.unwrap_or(0);
                    return l.get(n).ok_or_else(|| list_index_error(n));
                }
                let n2 = last.map(|n| n.get_number()).transpose()?;
                let (start, end) = list_range(len, n1, n2);
                let items = l.values().into_iter().skip(start).take(end - start);
                Ok(Value::List(self.interp.heap.list_from(items)))
            }
            v => {
                let s = v.get_string()?;
                let bytes = s.as_bytes();
                let len = bytes.len() as i64;
                let n1 = first.map(|n| n.get_number()).transpose()?.unwrap_or(0);
                let n1 = if n1 < 0 && range { (len + n1).max(0) } else { n1 };
                if !range {
                    if n1 < 0 || n1 >= len {
                        return Ok(Value::str(""));
                    }
                    let b = &bytes[n1 as usize..n1 as usize + 1];
                    return Ok(Value::from(String::from_utf8_lossy(b).into_owned()));
                }
                let mut n2 = last.map(|n| n.get_number()).transpose()?.unwrap_or(-1);
                if n2 < 0 {
                    n2 += len;
                } else if n2 >= len {
                    n2 = len - 1;
                }
                if n1 >= len || n2 < 0 || n1 > n2 {
                    return Ok(Value::str(""));
                }
                let b = &bytes[n1 as usize..=n2 as usize];
                Ok(Value::from(String::from_utf8_lossy(b).into_owned()))
            }
        }
    }
}

/// Item range `[start, end)` of `list[n1 : n2]`. Out of range bounds are
/// clamped, so the range may be empty.
fn list_range(len: i64, n1: Option<i64>, n2: Option<i64>) -> (usize, usize) {
    let mut n1 = n1.unwrap_or(0);
    if n1 < 0 {
        n1 = (len + n1).max(0);
    }
    let n1 = n1.min(len);
    let mut n2 = n2.unwrap_or(-1);
    if n2 < 0 {
        n2 += len;
    } else if n2 >= len {
        n2 = len - 1;
    }
    let end = (n2 + 1).max(n1);
    (n1 as usize, end as usize)
}

pub(crate) fn list_index_error(n: i64) -> EvalError {
    EvalError::index("E684", format!("list index out of range: {}", n))
}

fn missing_list_end(src: &str) -> EvalError {
    EvalError::parse("E697", format!("Missing end of List ']': {}", src))
}

fn missing_dict_end(src: &str) -> EvalError {
    EvalError::parse("E723", format!("Missing end of Dictionary '}}': {}", src))
}

/// Keys of `#{}` are made of letters, digits, `_` and `-`.
fn literal_key_len(s: &str) -> usize {
    s.bytes()
        .take_while(|&c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-')
        .count()
}

fn dict_member(v: &Value, key: &str) -> Result<Value> {
    match v {
        Value::Dict(d) => d.get(key).ok_or_else(|| key_not_present(key)),
        _ => Err(EvalError::type_error("E689", "Can only index a List or Dictionary")),
    }
}

pub(crate) fn key_not_present(key: &str) -> EvalError {
    EvalError::undefined("E716", format!("Key not present in Dictionary: \"{}\"", key))
}

/// Arithmetic on Numbers, or on Floats when either operand is one. Strings
/// are converted to Numbers.
pub(crate) fn arith(op: u8, lhs: &Value, rhs: &Value) -> Result<Value> {
    if lhs.is_float() || rhs.is_float() {
        if op == b'%' {
            return Err(EvalError::type_error("E804", "Cannot use '%' with Float"));
        }
        let f1 = number_or_float(lhs)?;
        let f2 = number_or_float(rhs)?;
        return Ok(Value::Float(float_arith(op, f1, f2)));
    }
    let n1 = lhs.get_number()?;
    let n2 = rhs.get_number()?;
    Ok(Value::Number(num_arith(op, n1, n2)))
}

fn number_or_float(v: &Value) -> Result<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        v => v.get_number().map(|n| n as f64),
    }
}

pub(crate) fn float_arith(op: u8, f1: f64, f2: f64) -> f64 {
    match op {
        b'+' => f1 + f2,
        b'-' => f1 - f2,
        b'*' => f1 * f2,
        _ if f2 == 0.0 => {
            if f1 == 0.0 {
                f64::NAN
            } else if f1 < 0.0 {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        }
        _ => f1 / f2,
    }
}

/// Integer arithmetic wraps. Division by zero gives the largest number
/// with the sign of the dividend (the smallest one for `0 / 0`) and modulo
/// by zero gives zero.
pub(crate) fn num_arith(op: u8, n1: i64, n2: i64) -> i64 {
    match op {
        b'+' => n1.wrapping_add(n2),
        b'-' => n1.wrapping_sub(n2),
        b'*' => n1.wrapping_mul(n2),
        b'/' if n2 == 0 => match n1 {
            0 => i64::MIN,
            n if n < 0 => -i64::MAX,
            _ => i64::MAX,
        },
        b'/' => n1.wrapping_div(n2),
        _ if n2 == 0 => 0,
        _ => n1.wrapping_rem(n2),
    }
}
