use std::cmp::Ordering;

use crate::error::{EvalError, Result};
use crate::interp::Interp;
use crate::value::{Equality, Value};

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// `=~`
    Match,
    /// `!~`
    NoMatch,
    Is,
    IsNot,
}

impl CmpOp {
    fn is_equality(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }

    fn is_identity(self) -> bool {
        matches!(self, CmpOp::Is | CmpOp::IsNot)
    }

    fn is_match(self) -> bool {
        matches!(self, CmpOp::Match | CmpOp::NoMatch)
    }

    /// Result of the operator for operands ordered as `ord`. Unordered
    /// operands (a NaN) only compare not equal.
    fn holds(self, ord: Option<Ordering>) -> bool {
        let ord = match ord {
            Some(ord) => ord,
            None => return matches!(self, CmpOp::Ne | CmpOp::IsNot),
        };
        match self {
            CmpOp::Eq | CmpOp::Is => ord == Ordering::Equal,
            CmpOp::Ne | CmpOp::IsNot => ord != Ordering::Equal,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Match | CmpOp::NoMatch => false,
        }
    }
}

/// Compare two values. `ic` ignores case for strings and for strings
/// inside containers.
pub(crate) fn compare(interp: &mut Interp, a: &Value, b: &Value, op: CmpOp, ic: bool) -> Result<bool> {
    let same_type = a.type_id() == b.type_id();
    if op.is_identity() && !same_type {
        return Ok(op == CmpOp::IsNot);
    }

    if a.is_list() || b.is_list() {
        if op.is_identity() {
            let same = matches!((a, b), (Value::List(x), Value::List(y)) if x.ptr_eq(y));
            return Ok(same == (op == CmpOp::Is));
        }
        if !same_type {
            return Err(EvalError::type_error("E691", "Can only compare List with List"));
        }
        if !op.is_equality() {
            return Err(EvalError::type_error("E692", "Invalid operation for List"));
        }
        let eq = Equality::new().equal(a, b, ic);
        return Ok(eq == (op == CmpOp::Eq));
    }

    if a.is_dict() || b.is_dict() {
        if op.is_identity() {
            let same = matches!((a, b), (Value::Dict(x), Value::Dict(y)) if x.ptr_eq(y));
            return Ok(same == (op == CmpOp::Is));
        }
        if !same_type {
            return Err(EvalError::type_error(
                "E735",
                "Can only compare Dictionary with Dictionary",
            ));
        }
        if !op.is_equality() {
            return Err(EvalError::type_error("E736", "Invalid operation for Dictionary"));
        }
        let eq = Equality::new().equal(a, b, ic);
        return Ok(eq == (op == CmpOp::Eq));
    }

    if a.is_func() || b.is_func() {
        if !op.is_equality() && !op.is_identity() {
            return Err(EvalError::type_error("E694", "Invalid operation for Funcrefs"));
        }
        if !same_type {
            return Err(EvalError::type_error(
                "E693",
                "Can only compare Funcref with Funcref",
            ));
        }
        let eq = Equality::new().equal(a, b, false);
        return Ok(eq == matches!(op, CmpOp::Eq | CmpOp::Is));
    }

    if (a.is_float() || b.is_float()) && !op.is_match() {
        let f1 = a.get_float()?;
        let f2 = b.get_float()?;
        return Ok(op.holds(f1.partial_cmp(&f2)));
    }

    if (a.is_number() || b.is_number()) && !op.is_match() {
        let n1 = a.get_number()?;
        let n2 = b.get_number()?;
        return Ok(op.holds(Some(n1.cmp(&n2))));
    }

    let s1 = a.get_string()?;
    let s2 = b.get_string()?;
    if op.is_match() {
        let matched = interp.patterns.is_match(&s2, &s1, ic)?;
        return Ok(matched == (op == CmpOp::Match));
    }
    let ord = if ic {
        s1.chars()
            .flat_map(char::to_lowercase)
            .cmp(s2.chars().flat_map(char::to_lowercase))
    } else {
        s1.cmp(&s2)
    };
    Ok(op.holds(Some(ord)))
}
