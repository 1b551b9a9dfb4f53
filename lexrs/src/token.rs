// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::location::Location;
use serde::Serialize;
use std::fmt;

/// The closed set of token kinds.
///
/// The discriminant order is load bearing: `kind as u16` is the dense
/// terminal id used to index the ACTION table, and the names returned by
/// [`TokenKind::name`] are the terminal names a grammar file must use.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Identifier,
    MacroIdentifier,
    IntegerConstant,
    FloatConstant,
    CharConstant,
    StringConstant,
    LineComment,
    BlockComment,
    Let,
    Fn,
    Mut,
    If,
    Else,
    While,
    For,
    In,
    Loop,
    Break,
    Continue,
    Return,
    I32,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Amp,
    Not,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Semicolon,
    Comma,
    Arrow,
    Dot,
    DotDot,
    Eof,
    Unknown,
}

impl TokenKind {
    pub const ALL: [TokenKind; 48] = [
        TokenKind::Identifier,
        TokenKind::MacroIdentifier,
        TokenKind::IntegerConstant,
        TokenKind::FloatConstant,
        TokenKind::CharConstant,
        TokenKind::StringConstant,
        TokenKind::LineComment,
        TokenKind::BlockComment,
        TokenKind::Let,
        TokenKind::Fn,
        TokenKind::Mut,
        TokenKind::If,
        TokenKind::Else,
        TokenKind::While,
        TokenKind::For,
        TokenKind::In,
        TokenKind::Loop,
        TokenKind::Break,
        TokenKind::Continue,
        TokenKind::Return,
        TokenKind::I32,
        TokenKind::Assign,
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::EqEq,
        TokenKind::NotEq,
        TokenKind::Lt,
        TokenKind::Gt,
        TokenKind::Le,
        TokenKind::Ge,
        TokenKind::Amp,
        TokenKind::Not,
        TokenKind::LParen,
        TokenKind::RParen,
        TokenKind::LBrace,
        TokenKind::RBrace,
        TokenKind::LBracket,
        TokenKind::RBracket,
        TokenKind::Colon,
        TokenKind::Semicolon,
        TokenKind::Comma,
        TokenKind::Arrow,
        TokenKind::Dot,
        TokenKind::DotDot,
        TokenKind::Eof,
        TokenKind::Unknown,
    ];

    pub fn terminal_id(self) -> u16 {
        self as u16
    }

    pub fn terminal_count() -> usize {
        Self::ALL.len()
    }

    /// The enumerator name, as spelled in grammar files.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Identifier => "Identifier",
            TokenKind::MacroIdentifier => "MacroIdentifier",
            TokenKind::IntegerConstant => "IntegerConstant",
            TokenKind::FloatConstant => "FloatConstant",
            TokenKind::CharConstant => "CharConstant",
            TokenKind::StringConstant => "StringConstant",
            TokenKind::LineComment => "LineComment",
            TokenKind::BlockComment => "BlockComment",
            TokenKind::Let => "Let",
            TokenKind::Fn => "Fn",
            TokenKind::Mut => "Mut",
            TokenKind::If => "If",
            TokenKind::Else => "Else",
            TokenKind::While => "While",
            TokenKind::For => "For",
            TokenKind::In => "In",
            TokenKind::Loop => "Loop",
            TokenKind::Break => "Break",
            TokenKind::Continue => "Continue",
            TokenKind::Return => "Return",
            TokenKind::I32 => "I32",
            TokenKind::Assign => "Assign",
            TokenKind::Plus => "Plus",
            TokenKind::Minus => "Minus",
            TokenKind::Star => "Star",
            TokenKind::Slash => "Slash",
            TokenKind::EqEq => "EqEq",
            TokenKind::NotEq => "NotEq",
            TokenKind::Lt => "Lt",
            TokenKind::Gt => "Gt",
            TokenKind::Le => "Le",
            TokenKind::Ge => "Ge",
            TokenKind::Amp => "Amp",
            TokenKind::Not => "Not",
            TokenKind::LParen => "LParen",
            TokenKind::RParen => "RParen",
            TokenKind::LBrace => "LBrace",
            TokenKind::RBrace => "RBrace",
            TokenKind::LBracket => "LBracket",
            TokenKind::RBracket => "RBracket",
            TokenKind::Colon => "Colon",
            TokenKind::Semicolon => "Semicolon",
            TokenKind::Comma => "Comma",
            TokenKind::Arrow => "Arrow",
            TokenKind::Dot => "Dot",
            TokenKind::DotDot => "DotDot",
            TokenKind::Eof => "Eof",
            TokenKind::Unknown => "Unknown",
        }
    }

    /// Terminal names in id order, for the grammar loader.
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|kind| kind.name().to_string()).collect()
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            TokenKind::Let => "let",
            TokenKind::Fn => "fn",
            TokenKind::Mut => "mut",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Loop => "loop",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::I32 => "i32",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Amp => "&",
            TokenKind::Not => "!",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Arrow => "->",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            other => other.name(),
        };
        write!(f, "{}", text)
    }
}

pub fn keyword_kind(text: &str) -> Option<TokenKind> {
    match text {
        "let" => Some(TokenKind::Let),
        "fn" => Some(TokenKind::Fn),
        "mut" => Some(TokenKind::Mut),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "while" => Some(TokenKind::While),
        "for" => Some(TokenKind::For),
        "in" => Some(TokenKind::In),
        "loop" => Some(TokenKind::Loop),
        "break" => Some(TokenKind::Break),
        "continue" => Some(TokenKind::Continue),
        "return" => Some(TokenKind::Return),
        "i32" => Some(TokenKind::I32),
        _ => None,
    }
}

/// Multi-character operators first so that longest match wins.
pub const SYMBOLS: [(&str, TokenKind); 25] = [
    ("->", TokenKind::Arrow),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    (">=", TokenKind::Ge),
    ("<=", TokenKind::Le),
    ("..", TokenKind::DotDot),
    ("=", TokenKind::Assign),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    (">", TokenKind::Gt),
    ("<", TokenKind::Lt),
    ("&", TokenKind::Amp),
    ("!", TokenKind::Not),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub id: u32,
    pub content: String,
    pub kind: TokenKind,
    pub loc: Location,
}

impl Token {
    pub fn new(id: u32, content: &str, kind: TokenKind, loc: Location) -> Self {
        Self {
            id,
            content: content.to_string(),
            kind,
            loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(\"{}\")", self.kind.name(), self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_ids_are_dense_and_sorted() {
        for (index, kind) in TokenKind::ALL.iter().enumerate() {
            assert_eq!(kind.terminal_id() as usize, index);
        }
        assert_eq!(TokenKind::terminal_count(), 48);
    }

    #[test]
    fn keywords_round_trip_through_display() {
        for kind in [TokenKind::Let, TokenKind::Fn, TokenKind::Loop, TokenKind::I32] {
            assert_eq!(keyword_kind(&kind.to_string()), Some(kind));
        }
        assert_eq!(keyword_kind("letx"), None);
    }

    #[test]
    fn multi_char_symbols_precede_their_prefixes() {
        let position = |text: &str| SYMBOLS.iter().position(|(s, _)| *s == text).unwrap();
        assert!(position("->") < position("-"));
        assert!(position("==") < position("="));
        assert!(position("..") < position("."));
        assert!(position(">=") < position(">"));
        assert!(position("<=") < position("<"));
        assert!(position("!=") < position("!"));
    }
}
