use expect_test::expect;
use pretty_assertions::assert_eq;
use test_env_log::test;

use crate::literal::{scan_lit_string, scan_number, scan_string, str2nr, LiteralError, Number};
use crate::name::{find_name_end, id_len, script_prefix_len, NameEnd};
use crate::{Lexer, Token};

#[test]
fn test_lex_operators() {
    let lexer = Lexer::new("a ==# b ? [1, 2] : #{k: 1} .. 'x' =~ \"y\"");
    let res = lexer.collect::<Vec<_>>();
    expect![[r#"
        [
            Name,
            EqEq,
            Hash,
            Name,
            Question,
            LBracket,
            Number,
            Comma,
            Number,
            RBracket,
            Colon,
            HashBrace,
            Name,
            Colon,
            Number,
            RBrace,
            DotDot,
            SingleQuote,
            Name,
            SingleQuote,
            Match,
            DoubleQuote,
            Name,
            DoubleQuote,
        ]
    "#]]
    .assert_debug_eq(&res);
}

#[test]
fn test_lex_assign_ops() {
    use Token::*;
    let lexer = Lexer::new("+= -= *= /= %= .= ..= =");
    let res = lexer.collect::<Vec<_>>();
    assert_eq!(
        res,
        vec![
            PlusAssign,
            MinusAssign,
            StarAssign,
            SlashAssign,
            PercentAssign,
            DotAssign,
            DotDotAssign,
            Assign
        ]
    );
    assert!(res.iter().all(|t| t.is_assign_op()));
}

#[test]
fn test_reset_and_adjacency() {
    let mut lexer = Lexer::new("foo [1] bar[2]");
    assert_eq!(lexer.next(), Some(Token::Name));
    assert_eq!(lexer.slice(), "foo");
    assert!(!lexer.is_adjacent(), "space before the bracket");

    lexer.reset(8);
    assert_eq!(lexer.offset(), 8);
    assert_eq!(lexer.next(), Some(Token::Name));
    assert_eq!(lexer.span(), 8..11);
    assert!(lexer.is_adjacent());
    assert_eq!(lexer.peek(), Some(Token::LBracket));
    assert_eq!(lexer.peek_slice(), "[");

    lexer.bump(2);
    assert_eq!(lexer.rest(), "]");
    assert!(lexer.eat(Token::RBracket));
    assert!(lexer.at_end());
    assert_eq!(lexer.peek_span(), 14..14);
}

#[test]
fn test_numbers() {
    assert_eq!(scan_number("123abc", false), (Number::Int(123), 3));
    assert_eq!(scan_number("0x1F", false), (Number::Int(31), 4));
    assert_eq!(scan_number("0b101", false), (Number::Int(5), 5));
    assert_eq!(scan_number("017", false), (Number::Int(15), 3));
    assert_eq!(scan_number("018", false), (Number::Int(18), 3), "8 is not octal");
    assert_eq!(scan_number("0", false), (Number::Int(0), 1));
    assert_eq!(scan_number("1.5", false), (Number::Float(1.5), 3));
    assert_eq!(scan_number("1.5e3", false), (Number::Float(1500.0), 5));
    assert_eq!(scan_number("1.5e-3", false), (Number::Float(0.0015), 6));
    assert_eq!(scan_number("1.5", true), (Number::Int(1), 1), "operand of '.'");
    assert_eq!(scan_number("1.5e", false), (Number::Int(1), 1));
    assert_eq!(scan_number("1.5x", false), (Number::Int(1), 1));
    assert_eq!(scan_number("1.2.3", false), (Number::Int(1), 1));
    assert_eq!(
        scan_number("99999999999999999999", false),
        (Number::Int(i64::MAX), 20)
    );
}

#[test]
fn test_str2nr() {
    assert_eq!(str2nr("-12x", true), (-12, 3));
    assert_eq!(str2nr("-12", false), (0, 0));
    assert_eq!(str2nr("abc", true), (0, 0));
    assert_eq!(str2nr("0x", true), (0, 1));
    assert_eq!(str2nr("-99999999999999999999", true), (i64::MIN, 21));
}

#[test]
fn test_strings() {
    assert_eq!(
        scan_string(r#""a\tb\n\x41é\101\<CR>\<C-A>\q" tail"#),
        Ok(("a\tb\nAéA\r\u{1}q".to_owned(), 31))
    );
    assert_eq!(scan_string(r#""say \"hi\"""#), Ok(("say \"hi\"".to_owned(), 12)));
    assert_eq!(scan_string(r#""\<Nope>""#), Ok(("<Nope>".to_owned(), 9)));
    assert_eq!(scan_string(r#""\xZ""#), Ok(("xZ".to_owned(), 5)));
    assert_eq!(scan_string(r#""abc"#), Err(LiteralError::MissingQuote));
    assert_eq!(scan_string(r#""abc\""#), Err(LiteralError::MissingQuote));

    assert_eq!(scan_lit_string("'it''s' x"), Ok(("it's".to_owned(), 7)));
    assert_eq!(scan_lit_string(r"'\n'"), Ok((r"\n".to_owned(), 4)));
    assert_eq!(scan_lit_string("'abc"), Err(LiteralError::MissingLitQuote));
    assert_eq!(LiteralError::MissingLitQuote.id(), "E115");
}

#[test]
fn test_find_name_end() {
    assert_eq!(
        find_name_end("g:foo + 1", false, true),
        NameEnd { len: 5, braces: None }
    );
    assert_eq!(find_name_end("n:]", false, true).len, 1, "not a scope");
    assert_eq!(find_name_end("foo#bar#baz()", false, true).len, 11);
    assert_eq!(find_name_end("1abc", false, true).len, 0);
    assert_eq!(
        find_name_end("var_{i + 1}_x = 3", false, true),
        NameEnd {
            len: 13,
            braces: Some((4, 10))
        }
    );
    assert_eq!(find_name_end("{'a'}:x", false, true).len, 7);
    assert_eq!(find_name_end("d.key[x] = 1", true, true).len, 8);
    assert_eq!(find_name_end("l['a]'] = 1", true, true).len, 7);
    assert_eq!(find_name_end("d.key", false, true).len, 1);
}

#[test]
fn test_id_len() {
    assert_eq!(id_len("s:foo("), 5);
    assert_eq!(id_len("abc:"), 3);
    assert_eq!(id_len("x:1"), 1);
    assert_eq!(id_len("(x)"), 0);
    assert_eq!(script_prefix_len("<SID>Foo"), 5);
    assert_eq!(script_prefix_len("<sid>Foo"), 5);
    assert_eq!(script_prefix_len("s:Foo"), 2);
    assert_eq!(script_prefix_len("g:Foo"), 0);
}
