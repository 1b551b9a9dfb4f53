// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::ir::{Operand, Quadruple};
use crate::semantic::symbol::ParamSpec;
use crate::semantic::types::Type;
use lexrs::{Location, Token};

/// Where an lvalue lives: a named frame slot, an element of an aggregate
/// (base place plus index place), or the target of a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum LValuePlace {
    Slot(String),
    Element { base: Operand, index: Operand },
    Deref(Operand),
}

/// The symbol a reference expression borrowed, carried so that a `let`
/// binding the reference can record the link.
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowSource {
    pub target: String,
    pub mutable: bool,
}

/// Attributes of a value-producing subtree. `place` is absent exactly for
/// void expressions; `base_mutable` survives into element accesses.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprAttr {
    pub ty: Type,
    pub place: Option<Operand>,
    pub code: Vec<Quadruple>,
    pub base_mutable: bool,
    pub borrow: Option<BorrowSource>,
}

impl ExprAttr {
    pub fn new(ty: Type, place: Operand, code: Vec<Quadruple>) -> Self {
        Self {
            ty,
            place: Some(place),
            code,
            base_mutable: true,
            borrow: None,
        }
    }

    pub fn void(code: Vec<Quadruple>) -> Self {
        Self {
            ty: Type::Void,
            place: None,
            code,
            base_mutable: true,
            borrow: None,
        }
    }

    /// The place of a non-void expression.
    pub fn place(&self) -> Operand {
        self.place.clone().expect("void expression has no place")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LValueAttr {
    pub name: Option<String>,
    pub ty: Type,
    pub place: LValuePlace,
    pub code: Vec<Quadruple>,
    pub is_mutable: bool,
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureAttr {
    pub name: String,
    pub loc: Location,
    pub params: Vec<ParamSpec>,
}

/// One variant per non-terminal category, plus the terminal variant pushed
/// on every shift (with the parsed value for integer literals).
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Token { token: Token, value: Option<i32> },
    Expr(ExprAttr),
    LValue(LValueAttr),
    DeclInner { name: String, is_mutable: bool, loc: Location },
    TypeSpec(Type),
    TypeList(Vec<Type>),
    Param(ParamSpec),
    Params(Vec<ParamSpec>),
    Args(Vec<ExprAttr>),
    Elements(Vec<ExprAttr>),
    Signature(SignatureAttr),
    Header { name: String, code: Vec<Quadruple> },
    Code(Vec<Quadruple>),
    Default,
}

impl Default for AttributeData {
    fn default() -> Self {
        AttributeData::Default
    }
}

impl AttributeData {
    pub fn location(&self) -> Option<Location> {
        match self {
            AttributeData::Token { token, .. } => Some(token.loc),
            AttributeData::DeclInner { loc, .. } => Some(*loc),
            AttributeData::Signature(sig) => Some(sig.loc),
            _ => None,
        }
    }

    pub fn token(self) -> Token {
        match self {
            AttributeData::Token { token, .. } => token,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn token_value(&self) -> i32 {
        match self {
            AttributeData::Token { value: Some(value), .. } => *value,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn expr(self) -> ExprAttr {
        match self {
            AttributeData::Expr(attr) => attr,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn lvalue(self) -> LValueAttr {
        match self {
            AttributeData::LValue(attr) => attr,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn decl_inner(self) -> (String, bool, Location) {
        match self {
            AttributeData::DeclInner { name, is_mutable, loc } => (name, is_mutable, loc),
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn type_spec(self) -> Type {
        match self {
            AttributeData::TypeSpec(ty) => ty,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn type_list(self) -> Vec<Type> {
        match self {
            AttributeData::TypeList(list) => list,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn param(self) -> ParamSpec {
        match self {
            AttributeData::Param(param) => param,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn params(self) -> Vec<ParamSpec> {
        match self {
            AttributeData::Params(list) => list,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn args(self) -> Vec<ExprAttr> {
        match self {
            AttributeData::Args(list) => list,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn elements(self) -> Vec<ExprAttr> {
        match self {
            AttributeData::Elements(list) => list,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn signature(self) -> SignatureAttr {
        match self {
            AttributeData::Signature(sig) => sig,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn header(self) -> (String, Vec<Quadruple>) {
        match self {
            AttributeData::Header { name, code } => (name, code),
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }

    pub fn code(self) -> Vec<Quadruple> {
        match self {
            AttributeData::Code(code) => code,
            AttributeData::Expr(attr) => attr.code,
            _ => panic!("{:?}: Wrong attribute variant.", self),
        }
    }
}
