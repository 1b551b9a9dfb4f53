// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

pub mod lexer;
pub mod location;
pub mod token;

pub use crate::lexer::Lexer;
pub use crate::location::Location;
pub use crate::token::{Token, TokenKind};
