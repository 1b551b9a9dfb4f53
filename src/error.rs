// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use lexrs::{Location, Token};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    Declaration,
    Type,
    Mutability,
    ControlFlow,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SemanticErrorKind::Declaration => write!(f, "declaration"),
            SemanticErrorKind::Type => write!(f, "type"),
            SemanticErrorKind::Mutability => write!(f, "mutability"),
            SemanticErrorKind::ControlFlow => write!(f, "control flow"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub message: String,
    pub loc: Location,
    pub kind: SemanticErrorKind,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, message: &str, loc: Location) -> Self {
        Self {
            message: message.to_string(),
            loc,
            kind,
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Semantic Error ({}): {} at {}.", self.kind, self.message, self.loc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    TooManyArguments { function: String, count: usize },
    RegistersExhausted,
    MissingMain,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendError::TooManyArguments { function, count } => write!(
                f,
                "Code Generation Error: function \"{}\" takes {} arguments but at most 4 are supported.",
                function, count
            ),
            BackendError::RegistersExhausted => {
                write!(f, "Code Generation Error: temporary registers exhausted.")
            }
            BackendError::MissingMain => {
                write!(f, "Code Generation Error: no \"main\" function was defined.")
            }
        }
    }
}

fn format_set(set: &[String]) -> String {
    let mut string = String::new();
    let last = set.len().saturating_sub(1);
    for (index, item) in set.iter().enumerate() {
        if index == 0 {
            string += item;
        } else {
            if index == last {
                string += " or ";
            } else {
                string += ", ";
            };
            string += item;
        }
    }
    string
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lexical { token: Token },
    Syntax { token: Token, expected: Vec<String> },
    Semantic(SemanticError),
    Backend(BackendError),
    Grammar(String),
}

impl From<SemanticError> for CompileError {
    fn from(error: SemanticError) -> Self {
        CompileError::Semantic(error)
    }
}

impl From<BackendError> for CompileError {
    fn from(error: BackendError) -> Self {
        CompileError::Backend(error)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Lexical { token } => write!(
                f,
                "Lexical Error: unknown token \"{}\" at {}.",
                token.content, token.loc
            ),
            CompileError::Syntax { token, expected } => write!(
                f,
                "Syntax Error: expected: {} found: {} (\"{}\") at {}.",
                format_set(expected),
                token.kind,
                token.content,
                token.loc
            ),
            CompileError::Semantic(error) => write!(f, "{}", error),
            CompileError::Backend(error) => write!(f, "{}", error),
            CompileError::Grammar(message) => write!(f, "Grammar Error: {}.", message),
        }
    }
}

impl CompileError {
    /// The process exit code the driver maps this error to.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Grammar(_) => 2,
            CompileError::Lexical { .. } => 3,
            CompileError::Syntax { .. } => 4,
            CompileError::Semantic(_) => 5,
            CompileError::Backend(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrs::TokenKind;

    #[test]
    fn syntax_error_lists_the_expected_set() {
        let token = Token::new(1, "}", TokenKind::RBrace, Location::new(3, 7));
        let error = CompileError::Syntax {
            token,
            expected: vec![";".to_string(), ",".to_string(), ")".to_string()],
        };
        let text = error.to_string();
        assert!(text.contains("expected: ;, , or )"));
        assert!(text.contains("3:7"));
        assert_eq!(error.exit_code(), 4);
    }
}
