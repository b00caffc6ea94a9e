use std::borrow::Cow;

use thiserror::Error;
use vimscript_syn::literal::LiteralError;

use crate::hashtab::HashError;

pub type Result<T, E = EvalError> = std::result::Result<T, E>;

/// Broad category of an [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed expression or statement.
    Parse,
    /// Operation invalid for the type of a value.
    Type,
    /// Unknown variable, function or dictionary key.
    Undefined,
    /// Mutation of a locked, fixed or read-only value.
    Locked,
    /// Deep copy nesting, expression nesting or call depth exceeded.
    RecursionLimit,
    TooFewArguments,
    TooManyArguments,
    /// A `dict` function called without a dictionary.
    DictRequired,
    /// List index or range out of bounds.
    Index,
    OutOfMemory,
    /// The host raised its interrupt flag.
    Interrupted,
}

/// An error raised while evaluating or executing script code.
///
/// Each error carries the classic message id (`"E121"`), rendered in front
/// of the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.id, .message))]
pub struct EvalError {
    kind: ErrorKind,
    id: &'static str,
    message: Cow<'static, str>,
}

fn render(id: &str, message: &str) -> String {
    if id.is_empty() {
        message.to_owned()
    } else {
        format!("{}: {}", id, message)
    }
}

impl EvalError {
    pub fn new(kind: ErrorKind, id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        EvalError {
            kind,
            id,
            message: message.into(),
        }
    }

    pub fn parse(id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Parse, id, message)
    }

    pub fn type_error(id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Type, id, message)
    }

    pub fn undefined(id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Undefined, id, message)
    }

    pub fn locked(id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Locked, id, message)
    }

    pub fn index(id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Index, id, message)
    }

    pub fn recursion(id: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::RecursionLimit, id, message)
    }

    /// `E15: Invalid expression: "..."`
    pub fn invalid_expr(text: &str) -> Self {
        Self::parse("E15", format!("Invalid expression: \"{}\"", text))
    }

    pub fn interrupted() -> Self {
        Self::new(ErrorKind::Interrupted, "", "Interrupted")
    }

    pub fn out_of_memory() -> Self {
        Self::new(ErrorKind::OutOfMemory, "E342", "Out of memory!")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message id, e.g. `"E121"`. Empty for interrupts.
    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_interrupt(&self) -> bool {
        self.kind == ErrorKind::Interrupted
    }
}

impl From<LiteralError> for EvalError {
    fn from(e: LiteralError) -> Self {
        let id = e.id();
        EvalError::parse(id, e.to_string())
    }
}

/// Errors of the hash table that reach script code through a dictionary.
pub(crate) fn dict_error(e: HashError, key: &str) -> EvalError {
    match e {
        HashError::EmptyKey => EvalError::type_error("E713", "Cannot use empty key for Dictionary"),
        HashError::Duplicate => {
            EvalError::type_error("E721", format!("Duplicate key in Dictionary: \"{}\"", key))
        }
        HashError::Full | HashError::OutOfMemory => EvalError::out_of_memory(),
    }
}
