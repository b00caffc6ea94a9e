//! Statements: the lines of sourced scripts and function bodies.
//!
//! [`Script`] is the default [`Executor`]. It runs the commands that work on
//! variables and functions and the control flow around them; everything
//! else is `E492`.
//!
//! Control flow is tracked with a stack of open blocks, one per `:if`,
//! `:while` and `:for`. A block whose body is not being run still parses
//! the commands inside it, so nested blocks are matched up, but nothing is
//! evaluated.


use smol_str::SmolStr;
use tracing::trace;
use vimscript_syn::name::{find_name_end, ident_len};
use vimscript_syn::{skip_white, Token};

use crate::error::{ErrorKind, EvalError, Result};
use crate::eval::{Eval, Lval};
use crate::func::{FuncDef, FuncFlags};
use crate::gc::RootHandle;
use crate::interp::{Executor, ForLoop, Interp};
use crate::value::Value;

/// Where an executor gets its lines from.
pub trait LineSource {
    /// The next line and its index, `None` at the end.
    fn next_line(&mut self) -> Option<(usize, String)>;

    /// Continue at line `line`. Used to repeat loops.
    fn goto(&mut self, line: usize);
}

/// The lines of a script. A line starting with `\` (after white space)
/// continues the previous one.
#[derive(Debug, Clone)]
pub struct ScriptLines {
    lines: Vec<String>,
    next: usize,
}

impl ScriptLines {
    pub fn new(text: &str) -> Self {
        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim_start();
            match (trimmed.strip_prefix('\\'), lines.last_mut()) {
                (Some(cont), Some(prev)) => prev.push_str(cont),
                _ => lines.push(line.to_owned()),
            }
        }
        ScriptLines { lines, next: 0 }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl LineSource for ScriptLines {
    fn next_line(&mut self) -> Option<(usize, String)> {
        let idx = self.next;
        let line = self.lines.get(idx)?.clone();
        self.next += 1;
        Some((idx, line))
    }

    fn goto(&mut self, line: usize) {
        self.next = line;
    }
}

/// The built-in statement executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Script;

impl Executor for Script {
    fn execute(&self, interp: &mut Interp, lines: &mut dyn LineSource) -> Result<()> {
        let mut run = Run::default();
        let res = run.lines(interp, lines);
        run.close(interp);
        res
    }
}

impl Run {
    fn lines(&mut self, interp: &mut Interp, lines: &mut dyn LineSource) -> Result<()> {
        while let Some((idx, line)) = lines.next_line() {
            if !interp.in_function() {
                interp.safe_point();
            }
            let mut cmd = line;
            loop {
                match self.command(interp, lines, idx, &cmd) {
                    Ok(Some(next)) => cmd = next,
                    Ok(None) => break,
                    Err(e) if e.is_interrupt() => return Err(e),
                    Err(e) => {
                        interp.emsg(&e);
                        break;
                    }
                }
            }
            if interp.returned() || interp.aborting() {
                return Ok(());
            }
        }
        if let Some(block) = self.blocks.last() {
            let err = match block.kind {
                BlockKind::If => EvalError::parse("E171", "Missing :endif"),
                BlockKind::While { .. } => EvalError::parse("E170", "Missing :endwhile"),
                BlockKind::For { .. } => EvalError::parse("E170", "Missing :endfor"),
            };
            interp.emsg(&err);
        }
        Ok(())
    }

    /// Release the iterations of loops left open.
    fn close(&mut self, interp: &mut Interp) {
        while !self.blocks.is_empty() {
            self.pop(interp);
        }
    }

    fn pop(&mut self, interp: &mut Interp) {
        if let Some(Block {
            kind: BlockKind::For { iter: Some(iter), .. },
            ..
        }) = self.blocks.pop()
        {
            interp.heap.unroot(iter.root);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmd {
    Break,
    Call,
    Continue,
    Delfunction,
    Echo,
    Else,
    Elseif,
    Endfor,
    Endfunction,
    Endif,
    Endwhile,
    For,
    Function,
    If,
    Let,
    Lockvar,
    Return,
    Unlet,
    Unlockvar,
    While,
}

/// Command names and the length of their shortest abbreviation.
const COMMANDS: &[(&str, usize, Cmd)] = &[
    ("break", 4, Cmd::Break),
    ("call", 3, Cmd::Call),
    ("continue", 3, Cmd::Continue),
    ("delfunction", 4, Cmd::Delfunction),
    ("echo", 2, Cmd::Echo),
    ("echomsg", 5, Cmd::Echo),
    ("else", 2, Cmd::Else),
    ("elseif", 5, Cmd::Elseif),
    ("endfor", 5, Cmd::Endfor),
    ("endfunction", 4, Cmd::Endfunction),
    ("endif", 2, Cmd::Endif),
    ("endwhile", 4, Cmd::Endwhile),
    ("for", 3, Cmd::For),
    ("function", 2, Cmd::Function),
    ("if", 2, Cmd::If),
    ("let", 3, Cmd::Let),
    ("lockvar", 5, Cmd::Lockvar),
    ("return", 4, Cmd::Return),
    ("unlet", 3, Cmd::Unlet),
    ("unlockvar", 4, Cmd::Unlockvar),
    ("while", 2, Cmd::While),
];

fn lookup_command(word: &str) -> Option<Cmd> {
    COMMANDS
        .iter()
        .find(|(name, min, _)| word.len() >= *min && name.starts_with(word))
        .map(|&(_, _, cmd)| cmd)
}

/// Split a command line into the command and its argument, after the
/// optional `!`.
fn split_command(line: &str) -> Option<(&str, bool, &str)> {
    let s = line.trim_start_matches(|c| c == ' ' || c == '\t' || c == ':');
    if s.is_empty() || s.starts_with('"') {
        return None;
    }
    let len = s.bytes().take_while(u8::is_ascii_alphabetic).count();
    let (word, rest) = s.split_at(len);
    let (bang, rest) = match rest.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    Some((word, bang, skip_white(rest)))
}

/// The next command after an argument-less command.
fn next_after(arg: &str) -> Result<Option<String>> {
    match arg.as_bytes().first() {
        None | Some(b'"') => Ok(None),
        Some(b'|') => Ok(Some(arg[1..].to_owned())),
        Some(_) => Err(trailing(arg)),
    }
}

fn trailing(text: &str) -> EvalError {
    EvalError::parse("E488", format!("Trailing characters: {}", text))
}

fn invalid_argument(text: &str) -> EvalError {
    EvalError::parse("E475", format!("Invalid argument: {}", text))
}

enum BlockKind {
    If,
    While {
        line: usize,
    },
    For {
        line: usize,
        iter: Option<Iteration>,
    },
}

/// The items of a running `:for`. The iterated value stays rooted so a
/// collection between lines cannot clear it.
struct Iteration {
    items: ForLoop,
    root: RootHandle,
}

struct Block {
    kind: BlockKind,
    /// The body is not being run.
    skip: bool,
    /// `:if`: a branch was taken, or nothing can be taken. Loops: leave at
    /// the end of the body.
    done: bool,
    /// `:else` was seen.
    seen_else: bool,
    /// `:for` is being reached again from `:endfor`.
    again: bool,
}

impl Block {
    fn new(kind: BlockKind, skip: bool, done: bool) -> Self {
        Block {
            kind,
            skip,
            done,
            seen_else: false,
            again: false,
        }
    }

    fn is_loop(&self) -> bool {
        !matches!(self.kind, BlockKind::If)
    }
}

/// State of one execution of a script or function body.
#[derive(Default)]
struct Run {
    blocks: Vec<Block>,
}

impl Run {
    fn skipping(&self) -> bool {
        self.blocks.last().map_or(false, |b| b.skip)
    }

    /// Run one command; returns the command following a `|`.
    fn command(
        &mut self,
        interp: &mut Interp,
        lines: &mut dyn LineSource,
        idx: usize,
        line: &str,
    ) -> Result<Option<String>> {
        let (word, bang, arg) = match split_command(line) {
            Some(parts) => parts,
            None => return Ok(None),
        };
        let skip = self.skipping();
        let cmd = match lookup_command(word) {
            Some(cmd) => cmd,
            None if skip => return Ok(None),
            None => {
                return Err(EvalError::parse(
                    "E492",
                    format!("Not an editor command: {}", line.trim()),
                ))
            }
        };
        trace!(?cmd, skip, "command");
        let evaluate = !skip;

        match cmd {
            Cmd::If => self.ex_if(interp, arg),
            Cmd::Elseif => self.ex_elseif(interp, arg),
            Cmd::Else => self.ex_else(arg),
            Cmd::Endif => match self.blocks.last() {
                Some(Block {
                    kind: BlockKind::If,
                    ..
                }) => {
                    self.blocks.pop();
                    next_after(arg)
                }
                _ => Err(EvalError::parse("E580", ":endif without :if")),
            },
            Cmd::While => self.ex_while(interp, idx, arg),
            Cmd::Endwhile => self.ex_endwhile(lines, arg),
            Cmd::For => self.ex_for(interp, idx, arg),
            Cmd::Endfor => self.ex_endfor(interp, lines, arg),
            Cmd::Break | Cmd::Continue if skip => next_after(arg),
            Cmd::Break => {
                let i = self.innermost_loop(":break")?;
                for b in &mut self.blocks[i..] {
                    b.skip = true;
                    b.done = true;
                }
                next_after(arg)
            }
            Cmd::Continue => {
                let i = self.innermost_loop(":continue")?;
                self.blocks[i].skip = true;
                for b in &mut self.blocks[i + 1..] {
                    b.skip = true;
                    b.done = true;
                }
                next_after(arg)
            }
            Cmd::Function => ex_function(interp, lines, arg, bang, evaluate),
            Cmd::Endfunction => Err(EvalError::parse(
                "E193",
                ":endfunction not inside a function",
            )),
            Cmd::Delfunction => {
                let (name, next) = split_name(arg)?;
                if evaluate {
                    match interp.delete_function(name) {
                        Err(e) if bang && e.id() == "E130" => {}
                        res => res?,
                    }
                }
                Ok(next)
            }
            Cmd::Let => ex_let(interp, arg, evaluate),
            Cmd::Unlet => {
                let (names, next) = split_lvals(arg)?;
                if evaluate {
                    for name in names {
                        match parse_lval(interp, name) {
                            Ok(lv) => interp.unlet_lval(&lv, bang)?,
                            Err(e) if bang && e.kind() == ErrorKind::Undefined => {}
                            Err(e) => return Err(e),
                        }
                    }
                }
                Ok(next)
            }
            Cmd::Lockvar | Cmd::Unlockvar => {
                let lock = cmd == Cmd::Lockvar;
                let digits = arg.bytes().take_while(u8::is_ascii_digit).count();
                let deep = match (bang, digits) {
                    (true, _) => -1,
                    (false, 0) => 2,
                    (false, n) => arg[..n].parse().map_err(|_| invalid_argument(arg))?,
                };
                let (names, next) = split_lvals(&arg[digits..])?;
                if evaluate {
                    for name in names {
                        let lv = parse_lval(interp, name)?;
                        interp.lock_lval(&lv, deep, lock)?;
                    }
                }
                Ok(next)
            }
            Cmd::Call => {
                if arg.is_empty() {
                    return Err(EvalError::parse("E471", "Argument required"));
                }
                let mut eval = Eval::new(interp, arg);
                eval.expr1(evaluate)?;
                Ok(eval.next_command()?.map(str::to_owned))
            }
            Cmd::Echo => {
                let mut eval = Eval::new(interp, arg);
                let mut parts = Vec::new();
                while !matches!(eval.lex.peek(), None | Some(Token::Bar)) {
                    let v = eval.expr1(evaluate)?;
                    if evaluate {
                        parts.push(v.to_echo());
                    }
                }
                let next = eval.next_command()?.map(str::to_owned);
                if evaluate {
                    interp.host().echo(&parts.join(" "));
                }
                Ok(next)
            }
            Cmd::Return => {
                if evaluate && !interp.in_function() {
                    return Err(EvalError::parse("E133", ":return not inside a function"));
                }
                let mut eval = Eval::new(interp, arg);
                let value = match eval.lex.peek() {
                    None | Some(Token::Bar) => Value::Number(0),
                    Some(_) => eval.expr1(evaluate)?,
                };
                let next = eval.next_command()?.map(str::to_owned);
                if !evaluate {
                    return Ok(next);
                }
                interp.do_return(value)?;
                Ok(None)
            }
        }
    }

    fn innermost_loop(&self, cmd: &str) -> Result<usize> {
        self.blocks.iter().rposition(Block::is_loop).ok_or_else(|| {
            let id = if cmd == ":break" { "E587" } else { "E586" };
            EvalError::parse(id, format!("{} without :while or :for", cmd))
        })
    }

    fn ex_if(&mut self, interp: &mut Interp, arg: &str) -> Result<Option<String>> {
        let outer = self.skipping();
        match condition(interp, arg, !outer) {
            Ok((cond, next)) => {
                self.blocks
                    .push(Block::new(BlockKind::If, outer || !cond, outer || cond));
                Ok(next)
            }
            Err(e) => {
                self.blocks.push(Block::new(BlockKind::If, true, true));
                Err(e)
            }
        }
    }

    fn ex_elseif(&mut self, interp: &mut Interp, arg: &str) -> Result<Option<String>> {
        let block = match self.blocks.last_mut() {
            Some(b @ Block { kind: BlockKind::If, .. }) => b,
            _ => return Err(EvalError::parse("E582", ":elseif without :if")),
        };
        if block.seen_else {
            return Err(EvalError::parse("E584", ":elseif after :else"));
        }
        let evaluate = !block.done;
        match condition(interp, arg, evaluate) {
            Ok((cond, next)) => {
                block.skip = !evaluate || !cond;
                block.done |= cond;
                Ok(next)
            }
            Err(e) => {
                block.skip = true;
                block.done = true;
                Err(e)
            }
        }
    }

    fn ex_else(&mut self, arg: &str) -> Result<Option<String>> {
        let block = match self.blocks.last_mut() {
            Some(b @ Block { kind: BlockKind::If, .. }) => b,
            _ => return Err(EvalError::parse("E581", ":else without :if")),
        };
        if block.seen_else {
            return Err(EvalError::parse("E583", "multiple :else"));
        }
        block.seen_else = true;
        block.skip = block.done;
        block.done = true;
        next_after(arg)
    }

    fn ex_while(&mut self, interp: &mut Interp, idx: usize, arg: &str) -> Result<Option<String>> {
        let outer = self.skipping();
        let kind = BlockKind::While { line: idx };
        match condition(interp, arg, !outer) {
            Ok((cond, next)) => {
                let stop = outer || !cond;
                self.blocks.push(Block::new(kind, stop, stop));
                Ok(next)
            }
            Err(e) => {
                self.blocks.push(Block::new(kind, true, true));
                Err(e)
            }
        }
    }

    fn ex_endwhile(&mut self, lines: &mut dyn LineSource, arg: &str) -> Result<Option<String>> {
        let (line, done) = match self.blocks.last() {
            Some(Block {
                kind: BlockKind::While { line },
                done,
                ..
            }) => (*line, *done),
            Some(Block {
                kind: BlockKind::For { .. },
                ..
            }) => return Err(EvalError::parse("E733", "Using :endwhile with :for")),
            _ => return Err(EvalError::parse("E588", ":endwhile without :while")),
        };
        self.blocks.pop();
        if done {
            next_after(arg)
        } else {
            lines.goto(line);
            Ok(None)
        }
    }

    /// `:for {var} in {expr}` or `:for [{var}, ...] in {expr}`. When reached
    /// again from `:endfor` the next item is assigned.
    fn ex_for(&mut self, interp: &mut Interp, idx: usize, arg: &str) -> Result<Option<String>> {
        let targets_len = target_len(arg).ok_or_else(|| invalid_argument(arg))?;
        let targets = &arg[..targets_len];
        let rest = skip_white(&arg[targets_len..]);
        let expr = match rest.strip_prefix("in") {
            Some(expr) if expr.starts_with([' ', '\t']) => expr,
            _ => return Err(EvalError::parse("E690", "Missing \"in\" after :for")),
        };

        if let Some(block) = self.blocks.last_mut().filter(|b| b.again) {
            block.again = false;
            let next = {
                let mut eval = Eval::new(interp, expr);
                eval.expr1(false)?;
                eval.next_command()?.map(str::to_owned)
            };
            if let BlockKind::For { iter: Some(iter), .. } = &mut block.kind {
                match interp.for_next(&mut iter.items) {
                    Some(item) => {
                        block.skip = false;
                        assign_targets(interp, targets, item, None)?;
                    }
                    None => {
                        block.skip = true;
                        block.done = true;
                    }
                }
            }
            return Ok(next);
        }

        let outer = self.skipping();
        let (value, next) = {
            let mut eval = Eval::new(interp, expr);
            let value = eval.expr1(!outer);
            let next = eval.next_command();
            (value, next)
        };
        let kind = |iter| BlockKind::For { line: idx, iter };
        let started = value.and_then(|v| {
            let next = next?.map(str::to_owned);
            if outer {
                return Ok((None, next));
            }
            let root = interp.heap.root(v.clone());
            match interp.for_begin(v) {
                Ok(items) => Ok((Some(Iteration { items, root }), next)),
                Err(e) => {
                    interp.heap.unroot(root);
                    Err(e)
                }
            }
        });
        let (mut iter, next) = match started {
            Ok(started) => started,
            Err(e) => {
                self.blocks.push(Block::new(kind(None), true, true));
                return Err(e);
            }
        };

        let first = iter.as_mut().and_then(|it| interp.for_next(&mut it.items));
        let stop = first.is_none();
        self.blocks.push(Block::new(kind(iter), stop, stop));
        if let Some(item) = first {
            assign_targets(interp, targets, item, None)?;
        }
        Ok(next)
    }

    fn ex_endfor(
        &mut self,
        interp: &mut Interp,
        lines: &mut dyn LineSource,
        arg: &str,
    ) -> Result<Option<String>> {
        let block = match self.blocks.last_mut() {
            Some(b @ Block {
                kind: BlockKind::For { .. },
                ..
            }) => b,
            Some(Block {
                kind: BlockKind::While { .. },
                ..
            }) => return Err(EvalError::parse("E732", "Using :endfor with :while")),
            _ => return Err(EvalError::parse("E588", ":endfor without :for")),
        };
        if block.done {
            self.pop(interp);
            return next_after(arg);
        }
        block.again = true;
        if let BlockKind::For { line, .. } = block.kind {
            lines.goto(line);
        }
        Ok(None)
    }
}

/// Evaluate the condition of `:if`, `:elseif` or `:while`.
fn condition(interp: &mut Interp, arg: &str, evaluate: bool) -> Result<(bool, Option<String>)> {
    let mut eval = Eval::new(interp, arg);
    let v = eval.expr1(evaluate)?;
    let next = eval.next_command()?.map(str::to_owned);
    let cond = evaluate && v.to_bool()?;
    Ok((cond, next))
}

/// Parse one complete lvalue.
fn parse_lval(interp: &mut Interp, text: &str) -> Result<Lval> {
    let mut eval = Eval::new(interp, text);
    let lv = eval.get_lval()?;
    eval.expect_end()?;
    Ok(lv)
}

/// Length of the assignment target at the start of `s`: a name with
/// subscripts, or a `[a, b; rest]` list of them.
fn target_len(s: &str) -> Option<usize> {
    if !s.starts_with('[') {
        let len = find_name_end(s, true, true).len;
        return (len > 0).then(|| len);
    }
    let b = s.as_bytes();
    let mut p = 1;
    let mut after_semicolon = false;
    loop {
        p += s[p..].len() - skip_white(&s[p..]).len();
        let len = find_name_end(&s[p..], true, true).len;
        if len == 0 {
            return None;
        }
        p += len;
        p += s[p..].len() - skip_white(&s[p..]).len();
        match b.get(p)? {
            b']' => return Some(p + 1),
            b',' if !after_semicolon => p += 1,
            b';' if !after_semicolon => {
                after_semicolon = true;
                p += 1;
            }
            _ => return None,
        }
    }
}

/// The white space separated lvalues of `:unlet` and `:lockvar`, and the
/// command after them.
fn split_lvals(arg: &str) -> Result<(Vec<&str>, Option<String>)> {
    let mut names = Vec::new();
    let mut rest = skip_white(arg);
    loop {
        match rest.as_bytes().first() {
            None | Some(b'"') => break,
            Some(b'|') => return Ok((names, Some(rest[1..].to_owned()))),
            Some(_) => {}
        }
        let len = find_name_end(rest, true, true).len;
        if len == 0 {
            return Err(invalid_argument(rest));
        }
        names.push(&rest[..len]);
        rest = skip_white(&rest[len..]);
    }
    if names.is_empty() {
        return Err(EvalError::parse("E471", "Argument required"));
    }
    Ok((names, None))
}

/// A function name, possibly `<SID>`-prefixed or a dictionary entry, and the
/// command after it.
fn split_name(arg: &str) -> Result<(&str, Option<String>)> {
    let prefix = if arg.starts_with('<') { 5.min(arg.len()) } else { 0 };
    let len = prefix + find_name_end(&arg[prefix..], true, false).len;
    if len == 0 {
        return Err(EvalError::parse("E471", "Argument required"));
    }
    Ok((&arg[..len], next_after(skip_white(&arg[len..]))?))
}

/// Assign `value` to the targets of `:let` or `:for`.
fn assign_targets(interp: &mut Interp, targets: &str, value: Value, op: Option<u8>) -> Result<()> {
    let inner = match targets.strip_prefix('[') {
        Some(inner) => {
            let inner = inner.trim_end();
            inner.strip_suffix(']').unwrap_or(inner)
        }
        None => {
            let lv = parse_lval(interp, targets)?;
            return interp.set_lval(&lv, value, op);
        }
    };

    let mut lvals = Vec::new();
    let mut rest_lval = None;
    {
        let mut eval = Eval::new(interp, inner);
        loop {
            let lv = eval.get_lval()?;
            if eval.lex.eat(Token::Comma) {
                lvals.push(lv);
            } else if eval.lex.eat(Token::Semicolon) {
                lvals.push(lv);
                rest_lval = Some(eval.get_lval()?);
                break;
            } else {
                lvals.push(lv);
                break;
            }
        }
        eval.expect_end()?;
    }

    let items = match &value {
        Value::List(l) => l.values(),
        _ => return Err(EvalError::type_error("E714", "List required")),
    };
    if items.len() < lvals.len() {
        return Err(EvalError::index("E688", "More targets than List items"));
    }
    if items.len() > lvals.len() && rest_lval.is_none() {
        return Err(EvalError::index("E687", "Less targets than List items"));
    }
    let mut items = items.into_iter();
    for lv in &lvals {
        if let Some(item) = items.next() {
            interp.set_lval(lv, item, op)?;
        }
    }
    if let Some(lv) = rest_lval {
        let rest = interp.heap.list_from(items);
        interp.set_lval(&lv, Value::List(rest), op)?;
    }
    Ok(())
}

/// `:let {targets} = {expr}`, `:let {target} {op}= {expr}`, or `:let
/// {name}` and `:let` to list variables.
fn ex_let(interp: &mut Interp, arg: &str, evaluate: bool) -> Result<Option<String>> {
    if matches!(arg.as_bytes().first(), None | Some(b'"' | b'|')) {
        if evaluate {
            list_globals(interp);
        }
        return next_after(arg);
    }

    let len = target_len(arg).ok_or_else(|| invalid_argument(arg))?;
    let targets = &arg[..len];
    let after = skip_white(&arg[len..]);

    if matches!(after.as_bytes().first(), None | Some(b'"' | b'|')) {
        if evaluate {
            let value = interp.get_var(targets)?;
            interp
                .host()
                .echo(&format!("{:<15} {}", targets, value.to_repr()));
        }
        return next_after(after);
    }

    let (op, op_len) = if after.starts_with("..=") {
        (Some(b'.'), 3)
    } else if after.starts_with('=') && !after.starts_with("==") {
        (None, 1)
    } else if after.len() > 1 && after.as_bytes()[1] == b'=' && b"+-*/%.".contains(&after.as_bytes()[0]) {
        (Some(after.as_bytes()[0]), 2)
    } else {
        return Err(invalid_argument(after));
    };
    let (value, next) = {
        let mut eval = Eval::new(interp, &after[op_len..]);
        let value = eval.expr1(evaluate)?;
        (value, eval.next_command()?.map(str::to_owned))
    };
    if evaluate {
        assign_targets(interp, targets, value, op)?;
    }
    Ok(next)
}

fn list_globals(interp: &Interp) {
    let mut entries = interp.globals.entries();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, v) in entries {
        let name = format!("g:{}", name);
        interp.host().echo(&format!("{:<15} {}", name, v.to_repr()));
    }
}

/// `:function[!] {name}({args}) [range] [abort] [dict]` and the body up to
/// `:endfunction`, or `:function {name}` and `:function` to list.
fn ex_function(
    interp: &mut Interp,
    lines: &mut dyn LineSource,
    arg: &str,
    force: bool,
    evaluate: bool,
) -> Result<Option<String>> {
    if matches!(arg.as_bytes().first(), None | Some(b'"' | b'|')) {
        if evaluate {
            for name in interp.function_names() {
                let fp = interp.find_user_func(&name);
                if let Some(fp) = fp {
                    let header = format!("function {}({})", name, fp.signature());
                    interp.host().echo(&header);
                }
            }
        }
        return next_after(arg);
    }

    let prefix = if arg.starts_with('<') { 5.min(arg.len()) } else { 0 };
    let name_len = prefix + find_name_end(&arg[prefix..], true, false).len;
    let name = &arg[..name_len];
    let rest = skip_white(&arg[name_len..]);
    if name.is_empty() {
        return Err(EvalError::parse("E124", format!("Missing '(': {}", arg)));
    }
    if !rest.starts_with('(') {
        if !matches!(rest.as_bytes().first(), None | Some(b'"' | b'|')) {
            return Err(EvalError::parse("E124", format!("Missing '(': {}", arg)));
        }
        if evaluate {
            let listing = interp.function_listing(name)?;
            interp.host().echo(&listing);
        }
        return next_after(rest);
    }

    let mut def = parse_signature(interp, &rest[1..])?;
    def.force = force;

    let mut nesting = 0;
    loop {
        let (_, line) = lines
            .next_line()
            .ok_or_else(|| EvalError::parse("E126", "Missing :endfunction"))?;
        match split_command(&line).and_then(|(word, _, arg)| Some((lookup_command(word)?, arg))) {
            Some((Cmd::Endfunction, _)) if nesting == 0 => break,
            Some((Cmd::Endfunction, _)) => nesting -= 1,
            Some((Cmd::Function, arg)) if arg.contains('(') => nesting += 1,
            _ => {}
        }
        def.lines.push(line);
    }

    if evaluate {
        interp.define_function(name, def)?;
    }
    Ok(None)
}

/// Arguments and flags of a function definition, after the `(`.
fn parse_signature(interp: &mut Interp, s: &str) -> Result<FuncDef> {
    let mut def = FuncDef::default();
    let illegal = |s: &str| EvalError::parse("E125", format!("Illegal argument: {}", s));
    let mut p = 0;
    loop {
        p = s.len() - skip_white(&s[p..]).len();
        let rest = &s[p..];
        if let Some(after) = rest.strip_prefix(')') {
            p = s.len() - after.len();
            break;
        }
        if let Some(after) = rest.strip_prefix("...") {
            def.flags |= FuncFlags::VARARGS;
            let after = skip_white(after);
            match after.strip_prefix(')') {
                Some(after) => p = s.len() - after.len(),
                None => return Err(illegal(rest)),
            }
            break;
        }

        let len = ident_len(rest);
        if len == 0 {
            return Err(illegal(rest));
        }
        def.args.push(SmolStr::new(&rest[..len]));
        p += len;
        p = s.len() - skip_white(&s[p..]).len();

        if s[p..].starts_with('=') && !s[p..].starts_with("==") {
            p += 1;
            let mut eval = Eval::new(interp, &s[p..]);
            eval.expr1(false)?;
            let used = eval.offset();
            def.defaults.push(s[p..p + used].trim().to_owned());
            p += used;
        } else if !def.defaults.is_empty() {
            return Err(EvalError::parse(
                "E989",
                "Non-default argument follows default argument",
            ));
        }

        p = s.len() - skip_white(&s[p..]).len();
        match s.as_bytes().get(p) {
            Some(b',') => p += 1,
            Some(b')') => {
                p += 1;
                break;
            }
            _ => return Err(illegal(&s[p..])),
        }
    }

    let mut rest = skip_white(&s[p..]);
    loop {
        let len = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
        if len == 0 {
            break;
        }
        def.flags |= match &rest[..len] {
            "range" => FuncFlags::RANGE,
            "dict" => FuncFlags::DICT,
            "abort" => FuncFlags::ABORT,
            _ => return Err(trailing(rest)),
        };
        rest = skip_white(&rest[len..]);
    }
    if !matches!(rest.as_bytes().first(), None | Some(b'"')) {
        return Err(trailing(rest));
    }
    Ok(def)
}
