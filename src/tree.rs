// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use lexrs::Token;

/// A concrete syntax tree node: the grammar symbol at the root and the
/// reduced children in right-hand-side order.
#[derive(Debug, Clone, PartialEq)]
pub struct CstNode {
    pub symbol: String,
    pub children: Vec<CstNode>,
}

impl CstNode {
    pub fn internal(symbol: &str, children: Vec<CstNode>) -> Self {
        Self {
            symbol: symbol.to_string(),
            children,
        }
    }

    pub fn leaf(token: &Token) -> Self {
        let symbol = if token.content.is_empty() {
            token.kind.name().to_string()
        } else {
            format!("{} \"{}\"", token.kind.name(), token.content)
        };
        Self {
            symbol,
            children: Vec::new(),
        }
    }

    /// Indented one-node-per-line listing.
    pub fn description(&self) -> String {
        let mut text = String::new();
        self.write_description(&mut text, 0);
        text
    }

    fn write_description(&self, text: &mut String, depth: usize) {
        text.push_str(&"  ".repeat(depth));
        text.push_str(&self.symbol);
        text.push('\n');
        for child in &self.children {
            child.write_description(text, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrs::{Location, TokenKind};

    #[test]
    fn description_indents_children() {
        let token = Token::new(1, "x", TokenKind::Identifier, Location::new(1, 1));
        let tree = CstNode::internal(
            "Assignable",
            vec![CstNode::leaf(&token)],
        );
        assert_eq!(tree.description(), "Assignable\n  Identifier \"x\"\n");
    }
}
