//! Scanners for number and string literals.
//!
//! Every scanner takes the text starting at the literal and returns the
//! decoded value together with the number of bytes it consumed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralError {
    /// A `"` string without its closing quote.
    MissingQuote,
    /// A `'` string without its closing quote.
    MissingLitQuote,
}

impl LiteralError {
    /// The message id used when reporting this error.
    pub fn id(&self) -> &'static str {
        match self {
            LiteralError::MissingQuote => "E114",
            LiteralError::MissingLitQuote => "E115",
        }
    }
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralError::MissingQuote => write!(f, "Missing quote"),
            LiteralError::MissingLitQuote => write!(f, "Missing quote"),
        }
    }
}

impl std::error::Error for LiteralError {}

fn skip_digits(b: &[u8], mut p: usize) -> usize {
    while b.get(p).map_or(false, u8::is_ascii_digit) {
        p += 1;
    }
    p
}

/// Scan a number literal at the start of `s`.
///
/// With `want_string` set (the operand of `.`), `1.5` is not a float but the
/// number `1` followed by the concatenation of `5`.
pub fn scan_number(s: &str, want_string: bool) -> (Number, usize) {
    if !want_string {
        if let Some((f, len)) = scan_float(s) {
            return (Number::Float(f), len);
        }
    }
    let (n, len) = str2nr(s, false);
    (Number::Int(n), len)
}

fn scan_float(s: &str) -> Option<(f64, usize)> {
    let b = s.as_bytes();
    let mut p = skip_digits(b, 0);
    if p == 0 || b.get(p) != Some(&b'.') || !b.get(p + 1).map_or(false, u8::is_ascii_digit) {
        return None;
    }
    p = skip_digits(b, p + 1);
    if matches!(b.get(p), Some(b'e' | b'E')) {
        p += 1;
        if matches!(b.get(p), Some(b'+' | b'-')) {
            p += 1;
        }
        if !b.get(p).map_or(false, u8::is_ascii_digit) {
            return None;
        }
        p = skip_digits(b, p);
    }
    if b.get(p).map_or(false, |&c| c.is_ascii_alphabetic() || c == b'.') {
        return None;
    }
    s[..p].parse::<f64>().ok().map(|f| (f, p))
}

/// Convert the leading number of `s`, recognizing hex (`0x`), binary (`0b`)
/// and octal (leading `0`) forms. Values that do not fit saturate.
///
/// Returns `(0, 0)` when `s` does not start with a number.
pub fn str2nr(s: &str, allow_sign: bool) -> (i64, usize) {
    let b = s.as_bytes();
    let negative = allow_sign && b.first() == Some(&b'-');
    let p = usize::from(negative);

    let (radix, start) = match (b.get(p), b.get(p + 1), b.get(p + 2)) {
        (Some(b'0'), Some(b'x' | b'X'), Some(c)) if c.is_ascii_hexdigit() => (16, p + 2),
        (Some(b'0'), Some(b'b' | b'B'), Some(b'0' | b'1')) => (2, p + 2),
        (Some(b'0'), Some(c), _) if c.is_ascii_digit() => {
            let end = skip_digits(b, p + 1);
            if b[p + 1..end].iter().all(|&c| c < b'8') {
                (8, p + 1)
            } else {
                (10, p)
            }
        }
        _ => (10, p),
    };

    let mut n: u64 = 0;
    let mut q = start;
    while let Some(d) = b.get(q).and_then(|&c| (c as char).to_digit(radix)) {
        n = n
            .checked_mul(radix as u64)
            .and_then(|n| n.checked_add(d as u64))
            .unwrap_or(u64::MAX);
        q += 1;
    }
    if q == start && radix == 10 {
        return (0, 0);
    }

    let value = if negative {
        if n > i64::MAX as u64 {
            i64::MIN
        } else {
            -(n as i64)
        }
    } else {
        n.min(i64::MAX as u64) as i64
    };
    (value, q)
}

/// Scan a `"` string with backslash escapes. `s` must start with the quote.
pub fn scan_string(s: &str) -> Result<(String, usize), LiteralError> {
    let b = s.as_bytes();
    let mut p = 1;
    loop {
        match b.get(p) {
            None => return Err(LiteralError::MissingQuote),
            Some(b'"') => break,
            Some(b'\\') if p + 1 < b.len() => p += 2,
            Some(_) => p += 1,
        }
    }
    let body = &s[1..p];
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        if c != '\\' {
            out.push(c);
            continue;
        }
        let e = match rest.chars().next() {
            Some(e) => e,
            None => break,
        };
        rest = &rest[e.len_utf8()..];
        match e {
            'b' => out.push('\x08'),
            'e' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' | 'X' | 'u' | 'U' => {
                let max = match e {
                    'x' | 'X' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let n = rest
                    .bytes()
                    .take(max)
                    .take_while(u8::is_ascii_hexdigit)
                    .count();
                if n == 0 {
                    out.push(e);
                    continue;
                }
                let code = u32::from_str_radix(&rest[..n], 16).unwrap_or(0);
                rest = &rest[n..];
                push_code(&mut out, code);
            }
            '0'..='7' => {
                let n = rest
                    .bytes()
                    .take(2)
                    .take_while(|c| (b'0'..=b'7').contains(c))
                    .count();
                let code = rest[..n]
                    .bytes()
                    .fold(e as u32 - '0' as u32, |acc, d| acc * 8 + (d - b'0') as u32);
                rest = &rest[n..];
                push_code(&mut out, code);
            }
            '<' => match special_key(rest) {
                Some((key, len)) => {
                    out.push_str(&key);
                    rest = &rest[len..];
                }
                None => out.push('<'),
            },
            other => out.push(other),
        }
    }

    Ok((out, p + 1))
}

/// NUL can't live inside a value, so it is dropped.
fn push_code(out: &mut String, code: u32) {
    if code == 0 {
        return;
    }
    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
}

/// Decode the `Key>` part of a `<Key>` notation. `s` starts right after `<`.
fn special_key(s: &str) -> Option<(String, usize)> {
    let end = s.find('>')?;
    let name = &s[..end];
    let len = end + 1;

    if let Some(c) = name
        .strip_prefix("C-")
        .or_else(|| name.strip_prefix("c-"))
    {
        let mut chars = c.chars();
        let ch = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        let ctrl = match ch {
            '?' => 0x7f,
            c if c.is_ascii_alphabetic() || "@[\\]^_".contains(c) => {
                c.to_ascii_uppercase() as u32 & 0x1f
            }
            _ => return None,
        };
        return char::from_u32(ctrl).map(|c| (c.to_string(), len));
    }

    let key = match name.to_ascii_lowercase().as_str() {
        "cr" | "return" | "enter" => "\r",
        "nl" | "newline" | "lf" | "linefeed" => "\n",
        "tab" => "\t",
        "esc" => "\x1b",
        "space" => " ",
        "lt" => "<",
        "bslash" => "\\",
        "bar" => "|",
        "bs" | "backspace" => "\x08",
        "del" => "\x7f",
        _ => return None,
    };
    Some((key.to_owned(), len))
}

/// Scan a `'` string, where `''` stands for one quote. `s` must start with
/// the quote.
pub fn scan_lit_string(s: &str) -> Result<(String, usize), LiteralError> {
    let mut out = String::new();
    let mut rest = &s[1..];
    let mut len = 1;
    loop {
        let i = rest.find('\'').ok_or(LiteralError::MissingLitQuote)?;
        out.push_str(&rest[..i]);
        len += i + 1;
        rest = &rest[i + 1..];
        if rest.starts_with('\'') {
            out.push('\'');
            rest = &rest[1..];
            len += 1;
        } else {
            return Ok((out, len));
        }
    }
}
