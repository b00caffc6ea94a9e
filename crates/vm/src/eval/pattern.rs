//! Patterns of `=~` and `!~`.
//!
//! Vim patterns are translated to the syntax of the `regex` crate. The
//! magic levels `\v`, `\m`, `\M` and `\V` and the case flags `\c` and `\C`
//! are understood; look-around, back references and the other atoms the
//! `regex` crate has no equivalent for are rejected.

use fnv::FnvHashMap;
use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::error::{EvalError, Result};

/// Compiled patterns are kept until this many have accumulated.
const CACHE_SIZE: usize = 64;

#[derive(Default)]
pub(crate) struct PatternCache {
    compiled: FnvHashMap<(String, bool), Regex>,
}

impl PatternCache {
    /// Whether `pat` matches anywhere in `text`.
    pub(crate) fn is_match(&mut self, pat: &str, text: &str, ic: bool) -> Result<bool> {
        let key = (pat.to_owned(), ic);
        if let Some(re) = self.compiled.get(&key) {
            return Ok(re.is_match(text));
        }
        if self.compiled.len() >= CACHE_SIZE {
            self.compiled.clear();
        }
        let re = compile(pat, ic)?;
        let matched = re.is_match(text);
        self.compiled.insert(key, re);
        Ok(matched)
    }
}

fn compile(pat: &str, ic: bool) -> Result<Regex> {
    let (source, case) = translate(pat)?;
    trace!(%pat, %source, "compiled pattern");
    RegexBuilder::new(&source)
        .case_insensitive(case.unwrap_or(ic))
        .build()
        .map_err(|_| invalid(pat))
}

fn invalid(pat: &str) -> EvalError {
    EvalError::parse("E383", format!("Invalid search string: {}", pat))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Magic {
    /// `\v`
    Very,
    /// `\m`, the default
    Magic,
    /// `\M`
    No,
    /// `\V`
    VeryNo,
}

/// What a character stands for at a given magic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    Special(char),
    Literal(char),
}

fn classify(c: char, escaped: bool, magic: Magic) -> Atom {
    let special = match c {
        '(' | ')' | '|' | '+' | '?' | '=' | '{' | '@' | '<' | '>' => {
            (magic == Magic::Very) != escaped
        }
        '.' | '[' | '~' | '*' => {
            let magic_on = matches!(magic, Magic::Very | Magic::Magic);
            magic_on != escaped
        }
        '^' | '$' => (magic == Magic::VeryNo) == escaped,
        _ => false,
    };
    if special {
        Atom::Special(c)
    } else {
        Atom::Literal(c)
    }
}

/// Character classes behind a backslash.
fn class(c: char) -> Option<&'static str> {
    Some(match c {
        's' => "[ \\t]",
        'S' => "[^ \\t]",
        'd' => "[0-9]",
        'D' => "[^0-9]",
        'w' => "[0-9A-Za-z_]",
        'W' => "[^0-9A-Za-z_]",
        'a' => "[A-Za-z]",
        'A' => "[^A-Za-z]",
        'l' => "[a-z]",
        'L' => "[^a-z]",
        'u' => "[A-Z]",
        'U' => "[^A-Z]",
        'x' => "[0-9A-Fa-f]",
        'X' => "[^0-9A-Fa-f]",
        'o' => "[0-7]",
        'O' => "[^0-7]",
        'h' => "[A-Za-z_]",
        'H' => "[^A-Za-z_]",
        'e' => "\\x1b",
        't' => "\\t",
        'r' => "\\r",
        'n' => "\\n",
        _ => return None,
    })
}

/// Translate a pattern, returning the regex source and the case
/// sensitivity forced by `\c` or `\C`.
pub(crate) fn translate(pat: &str) -> Result<(String, Option<bool>)> {
    let mut out = String::with_capacity(pat.len() * 2);
    let mut case = None;
    let mut magic = Magic::Magic;
    let mut chars = pat.chars().peekable();

    while let Some(c) = chars.next() {
        let atom = if c == '\\' {
            let n = match chars.next() {
                Some(n) => n,
                None => {
                    out.push_str("\\\\");
                    break;
                }
            };
            match n {
                'v' => magic = Magic::Very,
                'm' => magic = Magic::Magic,
                'M' => magic = Magic::No,
                'V' => magic = Magic::VeryNo,
                'c' => case = Some(true),
                'C' => case = Some(false),
                _ => {}
            }
            if "vmMVcC".contains(n) {
                continue;
            }
            if let Some(cls) = class(n) {
                out.push_str(cls);
                continue;
            }
            match classify(n, true, magic) {
                Atom::Literal(l) if l.is_ascii_alphanumeric() => return Err(invalid(pat)),
                atom => atom,
            }
        } else {
            classify(c, false, magic)
        };

        match atom {
            Atom::Literal(l) => push_literal(&mut out, l),
            Atom::Special(s) => match s {
                '(' | ')' | '|' | '+' | '.' | '^' | '$' => out.push(s),
                '?' | '=' => out.push('?'),
                '<' | '>' => out.push_str("\\b"),
                '~' => {}
                '*' => {
                    // At the start of a branch a star is a literal.
                    if out.is_empty() || out.ends_with('(') || out.ends_with('|') {
                        out.push_str("\\*");
                    } else {
                        out.push('*');
                    }
                }
                '{' => {
                    let mut body = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('\\') if chars.peek() == Some(&'}') => {
                                chars.next();
                                break;
                            }
                            Some(d) => body.push(d),
                            None => return Err(invalid(pat)),
                        }
                    }
                    out.push_str(&repeat(&body).ok_or_else(|| invalid(pat))?);
                }
                '[' => {
                    let consumed = collection(&mut out, chars.clone().collect::<String>().as_str());
                    match consumed {
                        Some(n) => {
                            for _ in 0..n {
                                chars.next();
                            }
                        }
                        None => out.push_str("\\["),
                    }
                }
                _ => return Err(invalid(pat)),
            },
        }
    }
    Ok((out, case))
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// The body of `\{n,m}`. A leading `-` makes the repetition lazy.
fn repeat(body: &str) -> Option<String> {
    let (lazy, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let valid = body.chars().all(|c| c.is_ascii_digit() || c == ',');
    if !valid || body.matches(',').count() > 1 {
        return None;
    }
    let mut rep = match body.split_once(',') {
        None if body.is_empty() => "*".to_owned(),
        None => format!("{{{}}}", body),
        Some(("", "")) => "*".to_owned(),
        Some(("", max)) => format!("{{0,{}}}", max),
        Some((min, max)) => format!("{{{},{}}}", min, max),
    };
    if lazy {
        rep.push('?');
    }
    Some(rep)
}

/// Translate a `[]` collection; `rest` is the text after the `[`. Returns
/// the number of characters consumed, `None` when there is no closing `]`
/// and the `[` is a literal.
fn collection(out: &mut String, rest: &str) -> Option<usize> {
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    let mut class = String::from("[");
    if chars.first() == Some(&'^') {
        class.push('^');
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        class.push_str("\\]");
        i += 1;
    }
    loop {
        let c = *chars.get(i)?;
        i += 1;
        match c {
            ']' => break,
            '[' if chars.get(i) == Some(&':') => {
                let end = chars[i..].windows(2).position(|w| w == [':', ']'])?;
                class.push('[');
                class.extend(&chars[i..i + end + 2]);
                i += end + 2;
            }
            '\\' => {
                let n = *chars.get(i)?;
                i += 1;
                match n {
                    'e' => class.push_str("\\x1b"),
                    't' => class.push_str("\\t"),
                    'n' => class.push_str("\\n"),
                    'r' => class.push_str("\\r"),
                    '\\' | ']' | '^' | '-' => {
                        class.push('\\');
                        class.push(n);
                    }
                    _ => {
                        class.push_str("\\\\");
                        i -= 1;
                    }
                }
            }
            '-' => class.push('-'),
            '[' | '&' | '~' => {
                class.push('\\');
                class.push(c);
            }
            c => class.push(c),
        }
    }
    class.push(']');
    out.push_str(&class);
    Some(i)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_env_log::test;

    use super::*;

    fn source(pat: &str) -> String {
        translate(pat).expect("translate").0
    }

    #[test]
    fn test_translate_magic() {
        assert_eq!(source("^a.*b$"), "^a.*b$");
        assert_eq!(source("\\(ab\\)\\+"), "(ab)+");
        assert_eq!(source("a\\|b"), "a|b");
        assert_eq!(source("(x)"), "\\(x\\)");
        assert_eq!(source("\\<word\\>"), "\\bword\\b");
        assert_eq!(source("a\\{2,3}"), "a{2,3}");
        assert_eq!(source("a\\{-1,}"), "a{1,}?");
        assert_eq!(source("\\d\\+"), "[0-9]+");
        assert_eq!(source("*a"), "\\*a");
    }

    #[test]
    fn test_translate_levels() {
        assert_eq!(source("\\v(a|b)+"), "(a|b)+");
        assert_eq!(source("\\Va.b"), "a\\.b");
        assert_eq!(source("\\Ma*"), "a\\*");
        assert_eq!(translate("\\cabc").expect("translate").1, Some(true));
    }

    #[test]
    fn test_collection() {
        assert_eq!(source("[abc]x"), "[abc]x");
        assert_eq!(source("[^]a]"), "[^\\]a]");
        assert_eq!(source("[[:alpha:]]"), "[[:alpha:]]");
        assert_eq!(source("a[b"), "a\\[b");
        assert_eq!(source("[é[:digit:]]ü"), "[é[:digit:]]ü");
        assert_eq!(source("[[:éé:]"), "\\[[:éé:]");

        let mut cache = PatternCache::default();
        assert_eq!(cache.is_match("[[:éé:]", "[é", false), Ok(true));
    }

    #[test]
    fn test_match_cache() {
        let mut cache = PatternCache::default();
        assert_eq!(cache.is_match("^fo\\+$", "foo", false), Ok(true));
        assert_eq!(cache.is_match("^fo\\+$", "FOO", false), Ok(false));
        assert_eq!(cache.is_match("^fo\\+$", "FOO", true), Ok(true));
        assert_eq!(cache.is_match("\\Cfoo", "FOO", true), Ok(false));
        assert_eq!(cache.is_match("\\(", "x", false).unwrap_err().id(), "E383");
    }
}
