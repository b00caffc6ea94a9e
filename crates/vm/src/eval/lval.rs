//! Assignable places: the left side of `:let`, and the arguments of
//! `:unlet` and `:lockvar`.

use smol_str::SmolStr;
use vimscript_syn::name::{dict_key_len, find_name_end};
use vimscript_syn::Token;

use super::{arith, float_arith, key_not_present, list_index_error, Eval};
use crate::error::{EvalError, Result};
use crate::interp::Interp;
use crate::scope::{check_fixed, check_ro};
use crate::value::{
    change_lock, check_lock, lock_contents, Dict, DictScope, ItemFlags, ItemKey, List, Value,
    VarLock,
};

/// A parsed lvalue.
#[derive(Debug, Clone)]
pub struct Lval {
    /// The variable name, with curly-brace parts expanded.
    pub name: String,
    /// The whole lvalue as written, for messages.
    pub text: String,
    pub target: Target,
}

#[derive(Debug, Clone)]
pub enum Target {
    /// The variable itself.
    Var,
    /// `list[n]`
    ListItem { list: List, key: ItemKey },
    /// `list[n1 : n2]`; `last` is `None` for an omitted upper bound.
    ListRange {
        list: List,
        first: ItemKey,
        n1: usize,
        last: Option<usize>,
    },
    /// `dict[key]` or `dict.key`, which may not exist yet.
    DictKey { dict: Dict, key: SmolStr },
}

impl Target {
    /// The value at the place, if it holds a single one.
    fn value(&self) -> Option<Value> {
        match self {
            Target::ListItem { list, key } => list.item(*key),
            Target::DictKey { dict, key } => dict.get(key),
            _ => None,
        }
    }
}

impl Lval {
    /// Whether the place holds a value. Used by `exists()`.
    pub fn exists(&self, interp: &mut Interp) -> bool {
        match &self.target {
            Target::Var => interp.find_var(&self.name).is_some(),
            Target::DictKey { dict, key } => dict.contains_key(key),
            _ => true,
        }
    }
}

impl<'i, 'src> Eval<'i, 'src> {
    /// Parse an lvalue. The variable of a subscripted lvalue must exist and
    /// the subscripts are evaluated; a missing final dictionary key is
    /// allowed.
    pub fn get_lval(&mut self) -> Result<Lval> {
        let src = self.lex.source();
        let start = self.lex.peek_span().start;
        let text = &src[start..];
        let end = find_name_end(text, false, true);
        if end.len == 0 {
            return Err(EvalError::parse(
                "E461",
                format!("Illegal variable name: {}", text),
            ));
        }
        let raw = &text[..end.len];
        self.lex.reset(start + end.len);
        let name = match end.braces {
            Some(_) => self.expand_name(raw)?,
            None => raw.to_owned(),
        };

        let mut target = Target::Var;
        while let Some(dot) = self.peek_subscript() {
            let base = match &target {
                Target::Var => self.interp.get_var(&name)?,
                Target::ListRange { .. } => {
                    return Err(EvalError::parse("E708", "[:] must come last"))
                }
                Target::DictKey { dict, key } if !dict.contains_key(key) => {
                    return Err(key_not_present(key))
                }
                t => t.value().unwrap_or_default(),
            };
            self.lex.next();
            target = self.subscript_target(&base, dot)?;
        }

        let text = src[start..self.lex.offset()].to_owned();
        Ok(Lval { name, text, target })
    }

    /// Whether a subscript follows, and whether it is `.key`.
    fn peek_subscript(&mut self) -> Option<bool> {
        if !self.lex.is_adjacent() {
            return None;
        }
        match self.lex.peek() {
            Some(Token::LBracket) => Some(false),
            Some(Token::Dot) if dict_key_len(&self.lex.rest()[1..]) > 0 => Some(true),
            _ => None,
        }
    }

    /// The place `base[...]` or `base.key`, after the `[` or `.`.
    fn subscript_target(&mut self, base: &Value, dot: bool) -> Result<Target> {
        let mut first = None;
        let mut last = None;
        let mut range = false;
        if dot {
            let src = self.lex.source();
            let start = self.lex.offset();
            let len = dict_key_len(&src[start..]);
            self.lex.reset(start + len);
            first = Some(Value::from(&src[start..start + len]));
        } else {
            if !self.peek_is(Token::Colon) {
                first = Some(self.expr1(true)?);
            }
            if self.lex.eat(Token::Colon) {
                range = true;
                if !self.peek_is(Token::RBracket) {
                    last = Some(self.expr1(true)?);
                }
            }
            if !self.lex.eat(Token::RBracket) {
                return Err(EvalError::parse("E111", "Missing ']'"));
            }
        }

        match base {
            Value::Dict(dict) => {
                if range {
                    return Err(EvalError::type_error(
                        "E719",
                        "Cannot use [:] with a Dictionary",
                    ));
                }
                let key = match &first {
                    Some(k) => SmolStr::new(k.get_string()?),
                    None => SmolStr::default(),
                };
                if !dict.contains_key(&key) && dict.scope() == DictScope::Fixed {
                    return Err(EvalError::parse(
                        "E461",
                        format!("Illegal variable name: {}", key),
                    ));
                }
                Ok(Target::DictKey {
                    dict: dict.clone(),
                    key,
                })
            }
            Value::List(list) if !dot => {
                let n1 = first.map(|n| n.get_number()).transpose()?.unwrap_or(0);
                let key = list.find(n1).ok_or_else(|| list_index_error(n1))?;
                if !range {
                    return Ok(Target::ListItem {
                        list: list.clone(),
                        key,
                    });
                }
                let idx = list.index_of(key).unwrap_or_default();
                let last = match last {
                    None => None,
                    Some(n) => {
                        let n2 = n.get_number()?;
                        let n2 = if n2 < 0 {
                            list.find(n2)
                                .and_then(|k| list.index_of(k))
                                .ok_or_else(|| list_index_error(n2))?
                        } else {
                            n2 as usize
                        };
                        if n2 < idx {
                            return Err(list_index_error(n2 as i64));
                        }
                        Some(n2)
                    }
                };
                Ok(Target::ListRange {
                    list: list.clone(),
                    first: key,
                    n1: idx,
                    last,
                })
            }
            _ => Err(EvalError::type_error(
                "E689",
                "Can only index a List or Dictionary",
            )),
        }
    }
}

/// `target op= rhs`, where `op` is one of `+ - * / % .`.
fn compound(target: &Value, rhs: Value, op: u8) -> Result<Value> {
    let wrong = || {
        EvalError::type_error(
            "E734",
            format!("Wrong variable type for {}=", op as char),
        )
    };
    match target {
        Value::List(l) => match (op, &rhs) {
            (b'+', Value::List(r)) => {
                l.check_lock("")?;
                l.extend(r, None);
                Ok(target.clone())
            }
            _ => Err(wrong()),
        },
        Value::Number(_) | Value::String(_) => {
            if rhs.is_list() || rhs.is_dict() || rhs.is_func() {
                return Err(wrong());
            }
            if op == b'.' {
                if rhs.is_float() {
                    return Err(wrong());
                }
                let mut s = target.get_string()?.into_owned();
                s.push_str(&rhs.get_string()?);
                return Ok(Value::from(s));
            }
            if rhs.is_float() && op == b'%' {
                return Err(wrong());
            }
            arith(op, &Value::Number(target.get_number()?), &rhs)
        }
        Value::Float(f) => {
            let f2 = match &rhs {
                _ if op == b'%' || op == b'.' => return Err(wrong()),
                Value::Float(g) => *g,
                Value::Number(_) | Value::String(_) => rhs.get_number()? as f64,
                _ => return Err(wrong()),
            };
            Ok(Value::Float(float_arith(op, *f, f2)))
        }
        _ => Err(wrong()),
    }
}

impl Interp {
    /// Assign `value` to the place of `lv`, or combine the value there with
    /// it when `op` is given.
    pub fn set_lval(&mut self, lv: &Lval, value: Value, op: Option<u8>) -> Result<()> {
        match &lv.target {
            Target::Var => {
                let value = match op {
                    None => value,
                    Some(op) => {
                        let old = self.get_var(&lv.name)?;
                        if let Some((_, item)) = self.find_var_item(&lv.name) {
                            check_ro(item.flags, &lv.name)?;
                            check_lock(item.lock, &lv.name)?;
                        }
                        compound(&old, value, op)?
                    }
                };
                self.set_var(&lv.name, value)
            }
            Target::ListItem { list, key } => {
                check_lock(list.item_lock(*key), &lv.text)?;
                let value = match op {
                    None => value,
                    Some(op) => compound(&list.item(*key).unwrap_or_default(), value, op)?,
                };
                list.set_item(*key, value);
                Ok(())
            }
            Target::ListRange {
                list,
                first,
                n1,
                last,
            } => set_list_range(lv, list, *first, *n1, *last, value, op),
            Target::DictKey { dict, key } => match dict.item(key) {
                Some(item) => {
                    check_ro(item.flags, &lv.text)?;
                    if item.flags.contains(ItemFlags::LOCK) {
                        check_lock(VarLock::Locked, &lv.text)?;
                    }
                    check_lock(item.lock, &lv.text)?;
                    let value = match op {
                        None => value,
                        Some(op) => compound(&item.value, value, op)?,
                    };
                    dict.update(key, |item| item.value = value);
                    Ok(())
                }
                None => {
                    if op.is_some() {
                        return Err(key_not_present(key));
                    }
                    dict.check_lock(&lv.text)?;
                    dict.add(key, value)
                }
            },
        }
    }

    /// `:unlet` of the place of `lv`. With `force` a missing variable or key
    /// is not an error.
    pub fn unlet_lval(&mut self, lv: &Lval, force: bool) -> Result<()> {
        match &lv.target {
            Target::Var => self.unlet_var(&lv.name, force),
            Target::ListItem { list, key } => {
                list.check_lock(&lv.text)?;
                check_lock(list.item_lock(*key), &lv.text)?;
                list.remove(*key);
                Ok(())
            }
            Target::ListRange {
                list, first, last, ..
            } => {
                list.check_lock(&lv.text)?;
                let end = match last {
                    None => list.last(),
                    Some(n) => list.find(*n as i64).or_else(|| list.last()),
                };
                let end = end.ok_or_else(|| list_index_error(0))?;
                let mut key = Some(*first);
                while let Some(k) = key {
                    check_lock(list.item_lock(k), &lv.text)?;
                    key = if k == end { None } else { list.next(k) };
                }
                list.remove_range(*first, end);
                Ok(())
            }
            Target::DictKey { dict, key } => {
                let item = match dict.item(key) {
                    Some(item) => item,
                    None if force => return Ok(()),
                    None => return Err(key_not_present(key)),
                };
                dict.check_lock(&lv.text)?;
                check_fixed(item.flags, &lv.text)?;
                check_ro(item.flags, &lv.text)?;
                dict.remove(key);
                Ok(())
            }
        }
    }

    /// `:lockvar` (`lock == true`) or `:unlockvar` of the place of `lv`,
    /// `deep` levels down.
    pub fn lock_lval(&mut self, lv: &Lval, deep: i64, lock: bool) -> Result<()> {
        match &lv.target {
            Target::Var => self.lock_var(&lv.name, deep, lock),
            Target::ListItem { list, key } => lock_list_item(list, *key, deep, lock),
            Target::ListRange {
                list, first, last, ..
            } => {
                let mut key = Some(*first);
                let mut idx = list.index_of(*first).unwrap_or_default();
                while let Some(k) = key {
                    if last.map_or(false, |last| idx > last) {
                        break;
                    }
                    lock_list_item(list, k, deep, lock)?;
                    key = list.next(k);
                    idx += 1;
                }
                Ok(())
            }
            Target::DictKey { dict, key } => {
                let item = dict.item(key).ok_or_else(|| key_not_present(key))?;
                if deep != 0 {
                    dict.update(key, |item| item.lock = change_lock(lock, item.lock));
                }
                lock_contents(&item.value, deep, lock, 0)
            }
        }
    }

    /// The dictionary and key named by `text`, which must be a subscripted
    /// lvalue like `dict.key` or `dict['key']`.
    pub(crate) fn dict_target(&mut self, text: &str) -> Result<(Dict, SmolStr)> {
        let mut eval = Eval::new(self, text);
        let lv = eval.get_lval()?;
        eval.expect_end()?;
        match lv.target {
            Target::DictKey { dict, key } => Ok((dict, key)),
            _ => Err(EvalError::type_error(
                "E718",
                format!("Funcref required: {}", text),
            )),
        }
    }
}

fn lock_list_item(list: &List, key: ItemKey, deep: i64, lock: bool) -> Result<()> {
    if deep != 0 {
        list.set_item_lock(key, change_lock(lock, list.item_lock(key)));
    }
    lock_contents(&list.item(key).unwrap_or_default(), deep, lock, 0)
}

/// `let list[n1 : n2] = value`. Items past the end of the list are appended.
fn set_list_range(
    lv: &Lval,
    list: &List,
    first: ItemKey,
    n1: usize,
    last: Option<usize>,
    value: Value,
    op: Option<u8>,
) -> Result<()> {
    let src = match &value {
        Value::List(l) => l.values(),
        _ => return Err(EvalError::type_error("E709", "[:] requires a List value")),
    };

    let mut key = Some(first);
    let mut idx = n1;
    while let Some(k) = key {
        if last.map_or(false, |last| idx > last) {
            break;
        }
        check_lock(list.item_lock(k), &lv.text)?;
        key = list.next(k);
        idx += 1;
    }

    let mut values = src.into_iter().peekable();
    let mut key = first;
    let mut idx = n1;
    while let Some(v) = values.next() {
        let v = match op {
            None => v,
            Some(op) => compound(&list.item(key).unwrap_or_default(), v, op)?,
        };
        list.set_item(key, v);
        if values.peek().is_none() || last == Some(idx) {
            break;
        }
        key = match list.next(key) {
            Some(k) => k,
            None => list.push(Value::Number(0)),
        };
        idx += 1;
    }

    if values.peek().is_some() {
        return Err(EvalError::index("E710", "List value has more items than target"));
    }
    let short = match last {
        None => list.next(key).is_some(),
        Some(last) => idx != last,
    };
    if short {
        return Err(EvalError::index("E711", "List value has not enough items"));
    }
    Ok(())
}
