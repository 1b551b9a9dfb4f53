// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::fmt;

/// The closed quadruple vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    FuncBegin,
    FuncEnd,
    Param,
    Call,
    Return,
    ReturnVal,
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Label,
    Jump,
    IfFalse,
    IfTrue,
    Ref,
    DerefLoad,
    DerefStore,
    ArrayInit,
    ArraySet,
    ArrayLoad,
    ArrayStore,
    TupleInit,
    TupleSet,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            OpCode::FuncBegin => "FUNC_BEGIN",
            OpCode::FuncEnd => "FUNC_END",
            OpCode::Param => "PARAM",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::ReturnVal => "RETURN_VAL",
            OpCode::Assign => "ASSIGN",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Lt => "LT",
            OpCode::Le => "LE",
            OpCode::Gt => "GT",
            OpCode::Ge => "GE",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::Label => "LABEL",
            OpCode::Jump => "JUMP",
            OpCode::IfFalse => "IF_FALSE",
            OpCode::IfTrue => "IF_TRUE",
            OpCode::Ref => "REF",
            OpCode::DerefLoad => "DEREF_LOAD",
            OpCode::DerefStore => "DEREF_STORE",
            OpCode::ArrayInit => "ARRAY_INIT",
            OpCode::ArraySet => "ARRAY_SET",
            OpCode::ArrayLoad => "ARRAY_LOAD",
            OpCode::ArrayStore => "ARRAY_STORE",
            OpCode::TupleInit => "TUPLE_INIT",
            OpCode::TupleSet => "TUPLE_SET",
        };
        write!(f, "{}", text)
    }
}

/// A quadruple operand: a constant, a named slot, a temporary `t<k>` or a
/// label `L<k>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Const(i32),
    Var(String),
    Temp(u32),
    Label(u32),
}

impl Operand {
    pub fn var(name: &str) -> Self {
        Operand::Var(name.to_string())
    }

    /// The frame-slot key for variables and temporaries, if any.
    pub fn slot_name(&self) -> Option<String> {
        match self {
            Operand::Var(name) => Some(name.clone()),
            Operand::Temp(_) => Some(self.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Const(value) => write!(f, "{}", value),
            Operand::Var(name) => write!(f, "{}", name),
            Operand::Temp(k) => write!(f, "t{}", k),
            Operand::Label(k) => write!(f, "L{}", k),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quadruple {
    pub op: OpCode,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    pub result: Option<Operand>,
}

impl Quadruple {
    pub fn new(
        op: OpCode,
        arg1: Option<Operand>,
        arg2: Option<Operand>,
        result: Option<Operand>,
    ) -> Self {
        Self {
            op,
            arg1,
            arg2,
            result,
        }
    }

    pub fn label(label: u32) -> Self {
        Self::new(OpCode::Label, None, None, Some(Operand::Label(label)))
    }

    pub fn jump(label: u32) -> Self {
        Self::new(OpCode::Jump, None, None, Some(Operand::Label(label)))
    }

    pub fn if_false(cond: Operand, label: u32) -> Self {
        Self::new(OpCode::IfFalse, Some(cond), None, Some(Operand::Label(label)))
    }

    pub fn if_true(cond: Operand, label: u32) -> Self {
        Self::new(OpCode::IfTrue, Some(cond), None, Some(Operand::Label(label)))
    }

    pub fn assign(source: Operand, destination: Operand) -> Self {
        Self::new(OpCode::Assign, Some(source), None, Some(destination))
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn part(operand: &Option<Operand>) -> String {
            match operand {
                Some(op) => op.to_string(),
                None => "_".to_string(),
            }
        }
        write!(
            f,
            "({}, {}, {}, {})",
            self.op,
            part(&self.arg1),
            part(&self.arg2),
            part(&self.result)
        )
    }
}

/// Writes a numbered listing of a quadruple program.
pub fn listing(quads: &[Quadruple]) -> String {
    let mut text = String::new();
    for (index, quad) in quads.iter().enumerate() {
        text += &format!("{:03}: {}\n", index, quad);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_the_quadruple_form() {
        let quad = Quadruple::new(
            OpCode::Add,
            Some(Operand::Const(1)),
            Some(Operand::Temp(1)),
            Some(Operand::Temp(2)),
        );
        assert_eq!(quad.to_string(), "(ADD, 1, t1, t2)");
        assert_eq!(Quadruple::label(3).to_string(), "(LABEL, _, _, L3)");
    }

    #[test]
    fn slot_names_cover_variables_and_temporaries() {
        assert_eq!(Operand::var("x").slot_name(), Some("x".to_string()));
        assert_eq!(Operand::Temp(7).slot_name(), Some("t7".to_string()));
        assert_eq!(Operand::Const(3).slot_name(), None);
        assert_eq!(Operand::Label(1).slot_name(), None);
    }
}
