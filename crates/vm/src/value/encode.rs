//! Conversion of values to text, as done by `string()` and `:echo`.

use std::fmt::Write;

use super::Value;

/// Format a Float the way `%g` does in scripts: six significant digits,
/// trailing zeros dropped but at least one digit after the point.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".into();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let abs = f.abs();
    if f == 0.0 || (1e-3..1e7).contains(&abs) {
        let s = format!("{:.6}", f);
        trim_fraction(&s).to_owned()
    } else {
        let s = format!("{:.6e}", f);
        match s.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_fraction(mantissa), exp),
            None => s,
        }
    }
}

fn trim_fraction(s: &str) -> &str {
    match s.find('.') {
        Some(dot) => {
            let trimmed = s.trim_end_matches('0');
            if trimmed.len() == dot + 1 {
                &s[..dot + 2]
            } else {
                trimmed
            }
        }
        None => s,
    }
}

struct Encoder {
    out: String,
    /// Containers on the path from the top level value to the current one.
    path: Vec<*const ()>,
}

impl Encoder {
    fn push_str_repr(&mut self, s: &str) {
        self.out.push('\'');
        for c in s.chars() {
            if c == '\'' {
                self.out.push('\'');
            }
            self.out.push(c);
        }
        self.out.push('\'');
    }

    fn value(&mut self, v: &Value, raw: bool) {
        match v {
            Value::Number(n) => {
                let _ = write!(self.out, "{}", n);
            }
            Value::Float(f) => self.out.push_str(&format_float(*f)),
            Value::String(s) if raw => self.out.push_str(s),
            Value::String(s) => self.push_str_repr(s),
            Value::Func(f) if raw => self.out.push_str(&f.name()),
            Value::Func(f) => {
                self.out.push_str("function(");
                self.push_str_repr(&f.name());
                self.out.push(')');
            }
            Value::List(l) => {
                let ptr = l.as_ptr();
                if self.path.contains(&ptr) {
                    self.out.push_str("[...]");
                    return;
                }
                self.path.push(ptr);
                self.out.push('[');
                for (i, item) in l.values().iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.value(item, false);
                }
                self.out.push(']');
                self.path.pop();
            }
            Value::Dict(d) => {
                let ptr = d.as_ptr();
                if self.path.contains(&ptr) {
                    self.out.push_str("{...}");
                    return;
                }
                self.path.push(ptr);
                self.out.push('{');
                for (i, (key, item)) in d.entries().iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.push_str_repr(key);
                    self.out.push_str(": ");
                    self.value(item, false);
                }
                self.out.push('}');
                self.path.pop();
            }
            Value::Unknown => {}
        }
    }
}

/// Render `v`. With `echo` set a top level String or Funcref is written
/// without quotes.
pub(crate) fn to_string(v: &Value, echo: bool) -> String {
    let mut enc = Encoder {
        out: String::new(),
        path: Vec::new(),
    };
    enc.value(v, echo);
    enc.out
}
