use logos::Logos;

/// Tokens of the expression language.
///
/// Literals, names and most of the punctuation that only makes sense in a
/// context (`&option`, `$ENV`, `@r`, `.key`) are only *started* by a token;
/// the evaluator scans the rest of them from the raw source and then resets
/// the lexer past the scanned text.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Anything that doesn't match
    #[error]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Error,

    // === Literal starts ===
    #[regex(r"[0-9]+")]
    Number,
    #[token("\"")]
    DoubleQuote,
    #[token("'")]
    SingleQuote,

    // === Names ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Name,

    // === Operators ===
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("||")]
    OrOr,
    #[token("&&")]
    AndAnd,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("=~")]
    Match,
    #[token("!~")]
    NotMatch,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,

    // === Assignment ===
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token(".=")]
    DotAssign,
    #[token("..=")]
    DotDotAssign,

    // === Brackets ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("#{")]
    HashBrace,

    // === Punctuation ===
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("&")]
    Amp,
    #[token("$")]
    Dollar,
    #[token("@")]
    At,
    #[token("#")]
    Hash,
    #[token("|")]
    Bar,
}

impl Token {
    /// Returns `true` if the token is one of the assignment operators.
    pub fn is_assign_op(self) -> bool {
        matches!(
            self,
            Token::Assign
                | Token::PlusAssign
                | Token::MinusAssign
                | Token::StarAssign
                | Token::SlashAssign
                | Token::PercentAssign
                | Token::DotAssign
                | Token::DotDotAssign
        )
    }
}
