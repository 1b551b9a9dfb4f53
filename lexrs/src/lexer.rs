// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::location::Location;
use crate::token::{keyword_kind, Token, TokenKind, SYMBOLS};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_CRE: Regex = Regex::new(r"^\s+").unwrap();
    static ref LINE_COMMENT_CRE: Regex = Regex::new(r"^//[^\n]*").unwrap();
    static ref CHAR_CRE: Regex = Regex::new(r"^'(\\.|[^\\'])'").unwrap();
    static ref STRING_CRE: Regex = Regex::new(r#"^"(\\.|[^\\"])*""#).unwrap();
    static ref IDENT_CRE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap();
    static ref FLOAT_CRE: Regex = Regex::new(r"^\d+\.\d+([eE][+-]?\d+)?").unwrap();
    static ref INT_CRE: Regex = Regex::new(r"^\d+").unwrap();
}

/// Recognition is by ordered longest match: whitespace, comments, char and
/// string literals, keywords, macro identifiers, identifiers, float before
/// integer literals, multi-character operators before their prefixes.
/// Anything unmatched becomes a single `Unknown` token; lexing never aborts.
#[derive(Debug, Default)]
pub struct Lexer;

struct Scan<'a> {
    text: &'a str,
    pos: usize,
    row: u32,
    col: u32,
    next_id: u32,
    tokens: Vec<Token>,
}

impl<'a> Scan<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            row: 1,
            col: 1,
            next_id: 1,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn advance_over(&mut self, consumed: &str) {
        for ch in consumed.chars() {
            if ch == '\n' {
                self.row += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.pos += consumed.len();
    }

    fn push(&mut self, kind: TokenKind, content: &str) {
        let loc = Location::new(self.row, self.col);
        let token = Token::new(self.next_id, content, kind, loc);
        self.next_id += 1;
        self.tokens.push(token);
        let consumed = content.to_string();
        self.advance_over(&consumed);
    }

    fn push_eof(&mut self) {
        let loc = Location::new(self.row, self.col);
        self.tokens.push(Token::new(self.next_id, "", TokenKind::Eof, loc));
    }
}

/// Scans a `/*`-leading span counting nesting depth. Returns the consumed
/// byte length and whether the comment was balanced.
fn block_comment_span(rest: &str) -> (usize, bool) {
    debug_assert!(rest.starts_with("/*"));
    let mut depth = 0usize;
    let mut index = 0usize;
    while index < rest.len() {
        let tail = &rest[index..];
        if tail.starts_with("/*") {
            depth += 1;
            index += 2;
        } else if tail.starts_with("*/") {
            depth -= 1;
            index += 2;
            if depth == 0 {
                return (index, true);
            }
        } else {
            index += tail.chars().next().unwrap().len_utf8();
        }
    }
    (index, false)
}

impl Lexer {
    pub fn new() -> Self {
        Self
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut scan = Scan::new(text);
        while scan.pos < text.len() {
            let rest = scan.rest();
            if let Some(matched) = WHITESPACE_CRE.find(rest) {
                let consumed = matched.as_str().to_string();
                scan.advance_over(&consumed);
                continue;
            }
            if let Some(matched) = LINE_COMMENT_CRE.find(rest) {
                scan.push(TokenKind::LineComment, matched.as_str());
                continue;
            }
            if rest.starts_with("/*") {
                let (length, balanced) = block_comment_span(rest);
                let kind = if balanced {
                    TokenKind::BlockComment
                } else {
                    TokenKind::Unknown
                };
                scan.push(kind, &rest[..length]);
                continue;
            }
            if let Some(matched) = CHAR_CRE.find(rest) {
                scan.push(TokenKind::CharConstant, matched.as_str());
                continue;
            }
            if let Some(matched) = STRING_CRE.find(rest) {
                scan.push(TokenKind::StringConstant, matched.as_str());
                continue;
            }
            if let Some(matched) = IDENT_CRE.find(rest) {
                let word = matched.as_str();
                if let Some(kind) = keyword_kind(word) {
                    scan.push(kind, word);
                } else if rest[word.len()..].starts_with('!') {
                    scan.push(TokenKind::MacroIdentifier, &rest[..word.len() + 1]);
                } else {
                    scan.push(TokenKind::Identifier, word);
                }
                continue;
            }
            if let Some(matched) = FLOAT_CRE.find(rest) {
                scan.push(TokenKind::FloatConstant, matched.as_str());
                continue;
            }
            if let Some(matched) = INT_CRE.find(rest) {
                scan.push(TokenKind::IntegerConstant, matched.as_str());
                continue;
            }
            if let Some((symbol, kind)) = SYMBOLS.iter().find(|(s, _)| rest.starts_with(s)) {
                scan.push(*kind, symbol);
                continue;
            }
            let unmatched = rest.chars().next().unwrap().to_string();
            scan.push(TokenKind::Unknown, &unmatched);
        }
        scan.push_eof();
        scan.tokens
    }
}

/// First token the parser must not see, if any.
pub fn first_unknown(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().find(|t| t.kind == TokenKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        Lexer::new().tokenize(text).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_declaration() {
        use TokenKind::*;
        assert_eq!(
            kinds("let mut x: i32 = 42;"),
            vec![Let, Mut, Identifier, Colon, I32, Assign, IntegerConstant, Semicolon, Eof]
        );
    }

    #[test]
    fn locations_are_one_based_and_reset_on_newline() {
        let tokens = Lexer::new().tokenize("let x;\nx = 1;");
        assert_eq!(tokens[0].loc, Location::new(1, 1));
        assert_eq!(tokens[1].loc, Location::new(1, 5));
        assert_eq!(tokens[3].loc, Location::new(2, 1));
        assert_eq!(tokens[4].loc, Location::new(2, 3));
    }

    #[test]
    fn multi_char_operators_win_over_prefixes() {
        use TokenKind::*;
        assert_eq!(
            kinds("a==b != c>=d<=e->f..g"),
            vec![
                Identifier, EqEq, Identifier, NotEq, Identifier, Ge, Identifier, Le, Identifier,
                Arrow, Identifier, DotDot, Identifier, Eof
            ]
        );
    }

    #[test]
    fn range_is_not_a_float() {
        use TokenKind::*;
        assert_eq!(
            kinds("for i in 0..10"),
            vec![For, Identifier, In, IntegerConstant, DotDot, IntegerConstant, Eof]
        );
        assert_eq!(kinds("1.25"), vec![FloatConstant, Eof]);
    }

    #[test]
    fn tuple_field_access_lexes_as_dot_integer() {
        use TokenKind::*;
        assert_eq!(
            kinds("t.0"),
            vec![Identifier, Dot, IntegerConstant, Eof]
        );
    }

    #[test]
    fn keywords_beat_macro_identifiers() {
        use TokenKind::*;
        assert_eq!(kinds("println!(\"hi\")"), vec![MacroIdentifier, LParen, StringConstant, RParen, Eof]);
        assert_eq!(kinds("if!"), vec![If, Not, Eof]);
    }

    #[test]
    fn nested_block_comment_is_one_token() {
        let tokens = Lexer::new().tokenize("a /* x /* y */ z */ b");
        assert_eq!(tokens[1].kind, TokenKind::BlockComment);
        assert_eq!(tokens[1].content, "/* x /* y */ z */");
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].content, "b");
    }

    #[test]
    fn unterminated_block_comment_is_unknown() {
        let tokens = Lexer::new().tokenize("a /* never closed");
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert!(first_unknown(&tokens).is_some());
    }

    #[test]
    fn unmatched_character_is_a_single_unknown() {
        let tokens = Lexer::new().tokenize("let a @ b;");
        let unknown = first_unknown(&tokens).unwrap();
        assert_eq!(unknown.content, "@");
        assert_eq!(unknown.loc, Location::new(1, 7));
        // Lexing carries on past the bad character.
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn dense_source_reconstructs_from_token_contents() {
        let source = "fn main(){let x=1+2*3;}";
        let tokens = Lexer::new().tokenize(source);
        let rebuilt: String = tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn token_ids_are_serial_from_one() {
        let tokens = Lexer::new().tokenize("a b c");
        let ids: Vec<u32> = tokens.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
