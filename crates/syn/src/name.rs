//! Character classes and scanners for variable and function names.

/// Characters that may be used as a one-letter scope prefix (`g:`, `l:`...).
pub const SCOPE_CHARS: &[u8] = b"abglstvw";

/// The separator of autoload names (`dir#file#func`).
pub const AUTOLOAD_CHAR: u8 = b'#';

/// Returns `true` if `c` can be used in a variable or function name. Does not
/// include the curly braces of name expansion.
pub fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b':' || c == AUTOLOAD_CHAR
}

/// Returns `true` if `c` can start a variable or function name.
pub fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// Returns `true` if `c` can be used in a `dict.key` key.
pub fn is_dict_key_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Returns `true` if `c` is an identifier character, as used in environment
/// variable and option names.
pub fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Result of [`find_name_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameEnd {
    /// Length of the name in bytes, `0` when there is no valid name.
    pub len: usize,
    /// Offsets of the `{` and the matching `}` of the first curly-brace
    /// fragment, if there is one.
    pub braces: Option<(usize, usize)>,
}

/// Find the end of a variable or function name, taking care of curly-brace
/// fragments.
///
/// With `include_brackets` set, `[index]` and `.key` subscripts are part of
/// the name (used to find the end of an assignment target). With
/// `check_start` set the name must start with a letter, `_` or `{`.
pub fn find_name_end(s: &str, include_brackets: bool, check_start: bool) -> NameEnd {
    let b = s.as_bytes();
    let mut braces = None;
    let mut brace_start = None;

    if check_start && !b.first().map_or(false, |&c| is_name_start(c) || c == b'{') {
        return NameEnd { len: 0, braces };
    }

    let mut mb_nest = 0usize;
    let mut br_nest = 0usize;
    let mut p = 0;
    while let Some(&c) = b.get(p) {
        let continues = is_name_char(c)
            || c == b'{'
            || (include_brackets
                && (c == b'[' || (c == b'.' && b.get(p + 1).map_or(false, |&c| is_dict_key_char(c)))))
            || mb_nest != 0
            || br_nest != 0;
        if !continues {
            break;
        }

        if c == b'\'' {
            match s[p + 1..].find('\'') {
                Some(i) => p += i + 1,
                None => {
                    p = b.len();
                    break;
                }
            }
        } else if c == b'"' {
            p += 1;
            loop {
                match b.get(p) {
                    None => break,
                    Some(b'"') => break,
                    Some(b'\\') if p + 1 < b.len() => p += 2,
                    Some(_) => p += 1,
                }
            }
            if p >= b.len() {
                break;
            }
        } else if br_nest == 0 && mb_nest == 0 && c == b':' {
            // "s:" starts "s:var", but "n:" does not and can be used in a
            // slice "[n:]". "xx:" isn't a scope either, but "{ns}:" is.
            if (p > 1 && b[p - 1] != b'}') || (p == 1 && !SCOPE_CHARS.contains(&b[0])) {
                break;
            }
        }

        if mb_nest == 0 {
            if c == b'[' {
                br_nest += 1;
            } else if c == b']' {
                br_nest = br_nest.saturating_sub(1);
            }
        }

        if br_nest == 0 {
            if c == b'{' {
                mb_nest += 1;
                brace_start.get_or_insert(p);
            } else if c == b'}' {
                mb_nest = mb_nest.saturating_sub(1);
                if mb_nest == 0 && braces.is_none() {
                    if let Some(start) = brace_start {
                        braces = Some((start, p));
                    }
                }
            }
        }

        p += 1;
    }

    NameEnd { len: p, braces }
}

/// Length of a plain name without curly braces, `0` if there is none.
///
/// A `:` only continues the name directly after a one-letter scope, so `n`
/// in `l[n:]` is a name of its own.
pub fn id_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut p = 0;
    while let Some(&c) = b.get(p) {
        if !is_name_char(c) {
            break;
        }
        if c == b':' && (p > 1 || (p == 1 && !SCOPE_CHARS.contains(&b[0]))) {
            break;
        }
        p += 1;
    }
    p
}

/// Length of a `<SID>`, `<SNR>` or `s:` prefix of a function name, or `0`.
pub fn script_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    if b.len() >= 5
        && b[0] == b'<'
        && (b[1..4].eq_ignore_ascii_case(b"SID") || b[1..4].eq_ignore_ascii_case(b"SNR"))
        && b[4] == b'>'
    {
        5
    } else if b.starts_with(b"s:") {
        2
    } else {
        0
    }
}

/// Length of an environment variable or option name, `0` if there is none.
pub fn ident_len(s: &str) -> usize {
    s.bytes().take_while(|&c| is_ident_char(c)).count()
}

/// Length of a `dict.key` key, `0` if there is none.
pub fn dict_key_len(s: &str) -> usize {
    s.bytes().take_while(|&c| is_dict_key_char(c)).count()
}
