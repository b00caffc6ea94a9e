use std::ops::Range;

use logos::Logos;

pub mod literal;
pub mod name;
pub mod token;

#[cfg(test)]
mod test;

pub use token::Token;

/// The main lexer used by the evaluator.
///
/// Expressions are parsed straight from the source text: the evaluator often
/// scans a piece of text by hand (a name with curly braces, a number, a
/// string literal) and then [`reset`](Lexer::reset)s the lexer right after
/// it. All spans are absolute byte offsets into [`source`](Lexer::source).
pub struct Lexer<'src> {
    /// The whole text being evaluated.
    source: &'src str,
    /// The actual lexer that does the job. Lexes `source[base..]`.
    inner: logos::Lexer<'src, Token>,
    /// Offset of the inner lexer's input inside `source`.
    base: usize,
    /// The span of the last token
    span: Range<usize>,
    /// Token that has been peeked but not consumed yet.
    pending: Option<(Token, Range<usize>)>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer from string.
    pub fn new(source: &'src str) -> Lexer<'src> {
        Lexer {
            source,
            inner: Token::lexer(source),
            base: 0,
            span: 0..0,
            pending: None,
        }
    }

    /// The underlying source code
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// The span of the current token.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// The slice of string of the current token.
    pub fn slice(&self) -> &'src str {
        &self.source[self.span()]
    }

    /// End of the last consumed token, i.e. where hand-written scanning
    /// should continue.
    pub fn offset(&self) -> usize {
        self.span.end
    }

    /// The source text after the last consumed token, white space included.
    pub fn rest(&self) -> &'src str {
        &self.source[self.offset()..]
    }

    /// Move the lexer to the absolute position `pos`, dropping any peeked
    /// token. `pos` becomes the new [`offset`](Lexer::offset).
    pub fn reset(&mut self, pos: usize) {
        let pos = pos.min(self.source.len());
        self.inner = Token::lexer(&self.source[pos..]);
        self.base = pos;
        self.span = pos..pos;
        self.pending = None;
    }

    /// Skip `len` bytes of raw text after the current offset.
    pub fn bump(&mut self, len: usize) {
        self.reset(self.offset() + len)
    }

    /// Return a copy of the current front token without really consuming it.
    pub fn peek(&mut self) -> Option<Token> {
        if self.pending.is_none() {
            let tok = self.inner.next()?;
            let span = self.inner.span();
            self.pending = Some((tok, span.start + self.base..span.end + self.base));
        }
        self.pending.as_ref().map(|(tok, _)| *tok)
    }

    pub fn peek_span(&mut self) -> Range<usize> {
        let end = self.source.len();
        self.peek();
        self.pending
            .as_ref()
            .map(|(_, span)| span.clone())
            .unwrap_or(end..end)
    }

    pub fn peek_slice(&mut self) -> &'src str {
        &self.source[self.peek_span()]
    }

    /// Whether the next token starts right where the last one ended, with no
    /// white space in between.
    pub fn is_adjacent(&mut self) -> bool {
        self.peek().is_some() && self.peek_span().start == self.offset()
    }

    /// Consume the next token if it is `tok`.
    pub fn eat(&mut self, tok: Token) -> bool {
        if self.peek() == Some(tok) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Whether only white space is left.
    pub fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.peek();
        let (tok, span) = self.pending.take()?;
        self.span = span;
        Some(tok)
    }
}

/// Skip spaces and tabs at the start of `s`, returning the remaining text.
pub fn skip_white(s: &str) -> &str {
    s.trim_start_matches(|c| c == ' ' || c == '\t')
}
