// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! The syntax-directed semantic analyzer. The parser calls
//! [`SemanticAnalyzer::apply`] on every reduction; the handler for the
//! production checks scopes, types, mutability and borrows, and returns the
//! left-hand side's attributes carrying the complete quadruple code for the
//! subtree.

pub mod symbol;
pub mod types;

use crate::attributes::{
    AttributeData, BorrowSource, ExprAttr, LValueAttr, LValuePlace, SignatureAttr,
};
use crate::error::{SemanticError, SemanticErrorKind};
use crate::ir::{OpCode, Operand, Quadruple};
use crate::semantic::symbol::{
    FunctionSig, ParamSpec, ScopeStack, Symbol, SymbolExtra, SymbolKind,
};
use crate::semantic::types::{compatible, Type};
use lexrs::{Location, TokenKind};
use std::collections::{BTreeMap, BTreeSet};
use std::mem;

/// The productions the handlers below were written against, in grammar-file
/// order. The analyzer refuses to run against a grammar that disagrees.
pub const GRAMMAR_RULES: [&str; 107] = [
    // program structure
    "Program -> ItemList",
    "ItemList -> Function",
    "ItemList -> ItemList Function",
    // functions
    "Function -> FunctionHeader Block",
    "FunctionHeader -> FnSignature",
    "FunctionHeader -> FnSignature Arrow Type",
    "FnSignature -> Fn Identifier LParen ParameterList RParen",
    "ParameterList -> epsilon",
    "ParameterList -> Parameter",
    "ParameterList -> Parameter Comma ParameterList",
    "Parameter -> Identifier Colon Type",
    "Parameter -> Mut Identifier Colon Type",
    // types
    "Type -> I32",
    "Type -> Amp Type",
    "Type -> Amp Mut Type",
    "Type -> LBracket Type Semicolon IntegerConstant RBracket",
    "Type -> LParen TypeList RParen",
    "TypeList -> Type",
    "TypeList -> Type Comma TypeList",
    // blocks
    "Block -> BlockBegin StatementList RBrace",
    "Block -> BlockBegin StatementList Expression RBrace",
    "BlockBegin -> LBrace",
    "StatementList -> epsilon",
    "StatementList -> StatementList Statement",
    // statements
    "Statement -> LetStatement",
    "Statement -> AssignmentStatement",
    "Statement -> ExpressionStatement",
    "Statement -> IfStatement",
    "Statement -> WhileStatement",
    "Statement -> ForStatement",
    "Statement -> LoopStatement",
    "Statement -> BreakStatement",
    "Statement -> ContinueStatement",
    "Statement -> ReturnStatement",
    "Statement -> Semicolon",
    "LetStatement -> Let VariableDeclarationInner Semicolon",
    "LetStatement -> Let VariableDeclarationInner Colon Type Semicolon",
    "LetStatement -> Let VariableDeclarationInner Assign RValue Semicolon",
    "LetStatement -> Let VariableDeclarationInner Colon Type Assign RValue Semicolon",
    "VariableDeclarationInner -> Identifier",
    "VariableDeclarationInner -> Mut Identifier",
    "AssignmentStatement -> Assignable Assign RValue Semicolon",
    "ExpressionStatement -> Expression Semicolon",
    "ReturnStatement -> Return Semicolon",
    "ReturnStatement -> Return RValue Semicolon",
    "BreakStatement -> Break Semicolon",
    "BreakStatement -> Break RValue Semicolon",
    "ContinueStatement -> Continue Semicolon",
    "ContinueStatement -> Continue RValue Semicolon",
    // conditionals
    "IfStatement -> If Expression Block",
    "IfStatement -> If Expression Block Else Block",
    "IfStatement -> If Expression Block Else IfStatement",
    "IfExpression -> If Expression Block Else Block",
    "IfExpression -> If Expression Block Else IfExpression",
    // loops
    "WhileStatement -> WhileHeader Block",
    "WhileHeader -> While Expression",
    "ForStatement -> ForHeader Block",
    "ForHeader -> For Identifier In Expression DotDot Expression",
    "LoopStatement -> LoopStatementHeader Block",
    "LoopStatementHeader -> Loop",
    "LoopExpression -> LoopExpressionHeader Block",
    "LoopExpressionHeader -> Loop",
    // expressions
    "RValue -> Expression",
    "RValue -> IfExpression",
    "RValue -> LoopExpression",
    "Expression -> ComparisonExpression",
    "ComparisonExpression -> AdditionExpression",
    "ComparisonExpression -> AdditionExpression CmpOp AdditionExpression",
    "AdditionExpression -> Term",
    "AdditionExpression -> AdditionExpression AddOp Term",
    "Term -> Factor",
    "Term -> Term MulOp Factor",
    "Factor -> Element",
    "Factor -> Amp Assignable",
    "Factor -> Amp Mut Assignable",
    "Element -> IntegerConstant",
    "Element -> Assignable",
    "Element -> FunctionCall",
    "Element -> LParen Expression RParen",
    "Element -> ArrayLiteral",
    "Element -> TupleLiteral",
    "Element -> Block",
    "Assignable -> Identifier",
    "Assignable -> Element LBracket Expression RBracket",
    "Assignable -> Element Dot IntegerConstant",
    "Assignable -> Star Element",
    "AddOp -> Plus",
    "AddOp -> Minus",
    "MulOp -> Star",
    "MulOp -> Slash",
    "CmpOp -> Lt",
    "CmpOp -> Le",
    "CmpOp -> Gt",
    "CmpOp -> Ge",
    "CmpOp -> EqEq",
    "CmpOp -> NotEq",
    // calls and literals
    "FunctionCall -> Identifier LParen ArgumentList RParen",
    "ArgumentList -> epsilon",
    "ArgumentList -> RValue",
    "ArgumentList -> RValue Comma ArgumentList",
    "ArrayLiteral -> LBracket ElementList RBracket",
    "ElementList -> Expression",
    "ElementList -> Expression Comma ElementList",
    "TupleLiteral -> LParen Expression Comma TupleTail RParen",
    "TupleTail -> epsilon",
    "TupleTail -> Expression",
    "TupleTail -> Expression Comma TupleTail",
];

/// The default grammar text, identical in content to `configs/grammar.cfg`.
pub fn grammar_text() -> String {
    let mut text = GRAMMAR_RULES.join("\n");
    text.push('\n');
    text
}

/// Confirms that a loaded grammar numbers its productions the way the
/// semantic actions expect.
pub fn check_grammar(grammar: &lr1_gen::Grammar) -> Result<(), String> {
    // The loaded grammar carries one extra production: the augmentation.
    if grammar.productions.len() != GRAMMAR_RULES.len() + 1 {
        return Err(format!(
            "grammar has {} productions, semantic actions expect {}",
            grammar.productions.len() - 1,
            GRAMMAR_RULES.len()
        ));
    }
    for (ident, expected) in GRAMMAR_RULES.iter().enumerate() {
        let actual = grammar.rule_string(ident as u32);
        if actual != *expected {
            return Err(format!(
                "production {} is \"{}\", semantic actions expect \"{}\"",
                ident, actual, expected
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    While,
    For,
    Loop,
}

#[derive(Debug)]
struct LoopExprCtx {
    result_temp: u32,
    ty: Option<Type>,
}

#[derive(Debug)]
struct LoopCtx {
    kind: LoopKind,
    start_label: u32,
    continue_label: u32,
    end_label: u32,
    expr: Option<LoopExprCtx>,
    for_data: Option<(String, Operand)>,
}

#[derive(Debug)]
struct FunctionCtx {
    name: String,
    return_type: Type,
}

/// One analyzer instance per compilation; the scope stack and the emitted
/// code are not reentrant.
#[derive(Debug)]
pub struct SemanticAnalyzer {
    scopes: ScopeStack,
    temp_count: u32,
    label_count: u32,
    current_function: Option<FunctionCtx>,
    loop_stack: Vec<LoopCtx>,
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn take(rhs: &mut Vec<AttributeData>, index: usize) -> AttributeData {
    mem::take(&mut rhs[index])
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::default(),
            temp_count: 0,
            label_count: 0,
            current_function: None,
            loop_stack: Vec::new(),
        }
    }

    fn new_temp(&mut self) -> Operand {
        self.temp_count += 1;
        Operand::Temp(self.temp_count)
    }

    fn new_label(&mut self) -> u32 {
        self.label_count += 1;
        self.label_count
    }

    fn decl_err(message: String, loc: &Location) -> SemanticError {
        SemanticError::new(SemanticErrorKind::Declaration, &message, *loc)
    }

    fn type_err(message: String, loc: &Location) -> SemanticError {
        SemanticError::new(SemanticErrorKind::Type, &message, *loc)
    }

    fn mut_err(message: String, loc: &Location) -> SemanticError {
        SemanticError::new(SemanticErrorKind::Mutability, &message, *loc)
    }

    fn flow_err(message: String, loc: &Location) -> SemanticError {
        SemanticError::new(SemanticErrorKind::ControlFlow, &message, *loc)
    }

    /// Snapshot of the declared functions, for code generation.
    pub fn functions(&self) -> BTreeMap<String, FunctionSig> {
        self.scopes.functions()
    }

    /// The semantic action for `production`, with the attributes of the
    /// right-hand side and an approximate source location.
    pub fn apply(
        &mut self,
        production: u32,
        mut rhs: Vec<AttributeData>,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        match production {
            // Program -> ItemList
            0 => Ok(AttributeData::Code(take(&mut rhs, 0).code())),
            // ItemList -> Function
            1 => Ok(take(&mut rhs, 0)),
            // ItemList -> ItemList Function
            2 => {
                let mut code = take(&mut rhs, 0).code();
                code.extend(take(&mut rhs, 1).code());
                Ok(AttributeData::Code(code))
            }
            // Function -> FunctionHeader Block
            3 => {
                let (name, mut code) = take(&mut rhs, 0).header();
                let block = take(&mut rhs, 1).expr();
                let ctx = self
                    .current_function
                    .take()
                    .expect("function body outside of a function header");
                code.extend(block.code);
                if block.ty != Type::Void {
                    if !compatible(&ctx.return_type, &block.ty) {
                        return Err(Self::type_err(
                            format!(
                                "mismatched function result: \"{}\" returns {}, body produces {}",
                                ctx.name, ctx.return_type, block.ty
                            ),
                            loc,
                        ));
                    }
                    code.push(Quadruple::new(
                        OpCode::ReturnVal,
                        Some(block.place.expect("non-void block has a place")),
                        None,
                        None,
                    ));
                }
                code.push(Quadruple::new(
                    OpCode::FuncEnd,
                    Some(Operand::var(&name)),
                    None,
                    None,
                ));
                self.scopes.exit();
                Ok(AttributeData::Code(code))
            }
            // FunctionHeader -> FnSignature
            4 => {
                let sig = take(&mut rhs, 0).signature();
                self.register_function(sig, Type::Void)
            }
            // FunctionHeader -> FnSignature Arrow Type
            5 => {
                let sig = take(&mut rhs, 0).signature();
                let return_type = take(&mut rhs, 2).type_spec();
                if return_type.is_aggregate() {
                    return Err(Self::type_err(
                        format!(
                            "function \"{}\" returns {}: aggregate return types are not supported",
                            sig.name, return_type
                        ),
                        loc,
                    ));
                }
                self.register_function(sig, return_type)
            }
            // FnSignature -> Fn Identifier LParen ParameterList RParen
            6 => {
                let token = take(&mut rhs, 1).token();
                let params = take(&mut rhs, 3).params();
                Ok(AttributeData::Signature(SignatureAttr {
                    name: token.content,
                    loc: token.loc,
                    params,
                }))
            }
            // ParameterList -> epsilon
            7 => Ok(AttributeData::Params(Vec::new())),
            // ParameterList -> Parameter
            8 => Ok(AttributeData::Params(vec![take(&mut rhs, 0).param()])),
            // ParameterList -> Parameter Comma ParameterList
            9 => {
                let head = take(&mut rhs, 0).param();
                let mut list = take(&mut rhs, 2).params();
                list.insert(0, head);
                Ok(AttributeData::Params(list))
            }
            // Parameter -> Identifier Colon Type
            10 => {
                let token = take(&mut rhs, 0).token();
                let ty = take(&mut rhs, 2).type_spec();
                Ok(AttributeData::Param(ParamSpec {
                    name: token.content,
                    ty,
                    is_mutable: false,
                    loc: token.loc,
                }))
            }
            // Parameter -> Mut Identifier Colon Type
            11 => {
                let token = take(&mut rhs, 1).token();
                let ty = take(&mut rhs, 3).type_spec();
                Ok(AttributeData::Param(ParamSpec {
                    name: token.content,
                    ty,
                    is_mutable: true,
                    loc: token.loc,
                }))
            }
            // Type -> I32
            12 => Ok(AttributeData::TypeSpec(Type::I32)),
            // Type -> Amp Type
            13 => {
                let inner = take(&mut rhs, 1).type_spec();
                Ok(AttributeData::TypeSpec(Type::reference(false, inner)))
            }
            // Type -> Amp Mut Type
            14 => {
                let inner = take(&mut rhs, 2).type_spec();
                Ok(AttributeData::TypeSpec(Type::reference(true, inner)))
            }
            // Type -> LBracket Type Semicolon IntegerConstant RBracket
            15 => {
                let element = take(&mut rhs, 1).type_spec();
                let length = rhs[3].token_value();
                if !element.is_scalar() {
                    return Err(Self::type_err(
                        format!(
                            "array element type must be i32 or a reference, found {}",
                            element
                        ),
                        loc,
                    ));
                }
                if length <= 0 {
                    return Err(Self::decl_err("Array size must be positive".to_string(), loc));
                }
                Ok(AttributeData::TypeSpec(Type::array(element, length as u32)))
            }
            // Type -> LParen TypeList RParen
            16 => {
                let elements = take(&mut rhs, 1).type_list();
                for element in &elements {
                    if !element.is_scalar() {
                        return Err(Self::type_err(
                            format!(
                                "tuple element type must be i32 or a reference, found {}",
                                element
                            ),
                            loc,
                        ));
                    }
                }
                Ok(AttributeData::TypeSpec(Type::Tuple(elements)))
            }
            // TypeList -> Type
            17 => Ok(AttributeData::TypeList(vec![take(&mut rhs, 0).type_spec()])),
            // TypeList -> Type Comma TypeList
            18 => {
                let head = take(&mut rhs, 0).type_spec();
                let mut list = take(&mut rhs, 2).type_list();
                list.insert(0, head);
                Ok(AttributeData::TypeList(list))
            }
            // Block -> BlockBegin StatementList RBrace
            19 => {
                let code = take(&mut rhs, 1).code();
                self.scopes.exit();
                Ok(AttributeData::Expr(ExprAttr::void(code)))
            }
            // Block -> BlockBegin StatementList Expression RBrace
            20 => {
                let mut code = take(&mut rhs, 1).code();
                let value = take(&mut rhs, 2).expr();
                code.extend(value.code);
                self.scopes.exit();
                Ok(AttributeData::Expr(ExprAttr {
                    ty: value.ty,
                    place: value.place,
                    code,
                    base_mutable: value.base_mutable,
                    borrow: value.borrow,
                }))
            }
            // BlockBegin -> LBrace
            21 => {
                self.scopes.enter();
                Ok(AttributeData::Default)
            }
            // StatementList -> epsilon
            22 => Ok(AttributeData::Code(Vec::new())),
            // StatementList -> StatementList Statement
            23 => {
                let mut code = take(&mut rhs, 0).code();
                code.extend(take(&mut rhs, 1).code());
                Ok(AttributeData::Code(code))
            }
            // Statement -> LetStatement | ... | ReturnStatement
            24..=33 => Ok(take(&mut rhs, 0)),
            // Statement -> Semicolon
            34 => Ok(AttributeData::Code(Vec::new())),
            // LetStatement -> Let VariableDeclarationInner Semicolon
            35 => {
                let inner = take(&mut rhs, 1).decl_inner();
                self.declare(inner, None, None, loc)
            }
            // LetStatement -> Let VariableDeclarationInner Colon Type Semicolon
            36 => {
                let inner = take(&mut rhs, 1).decl_inner();
                let ty = take(&mut rhs, 3).type_spec();
                self.declare(inner, Some(ty), None, loc)
            }
            // LetStatement -> Let VariableDeclarationInner Assign RValue Semicolon
            37 => {
                let inner = take(&mut rhs, 1).decl_inner();
                let value = take(&mut rhs, 3).expr();
                self.declare(inner, None, Some(value), loc)
            }
            // LetStatement -> Let VariableDeclarationInner Colon Type Assign RValue Semicolon
            38 => {
                let inner = take(&mut rhs, 1).decl_inner();
                let ty = take(&mut rhs, 3).type_spec();
                let value = take(&mut rhs, 5).expr();
                self.declare(inner, Some(ty), Some(value), loc)
            }
            // VariableDeclarationInner -> Identifier
            39 => {
                let token = take(&mut rhs, 0).token();
                Ok(AttributeData::DeclInner {
                    name: token.content,
                    is_mutable: false,
                    loc: token.loc,
                })
            }
            // VariableDeclarationInner -> Mut Identifier
            40 => {
                let token = take(&mut rhs, 1).token();
                Ok(AttributeData::DeclInner {
                    name: token.content,
                    is_mutable: true,
                    loc: token.loc,
                })
            }
            // AssignmentStatement -> Assignable Assign RValue Semicolon
            41 => {
                let lvalue = take(&mut rhs, 0).lvalue();
                let value = take(&mut rhs, 2).expr();
                self.assign(lvalue, value, loc)
            }
            // ExpressionStatement -> Expression Semicolon
            42 => Ok(AttributeData::Code(take(&mut rhs, 0).code())),
            // ReturnStatement -> Return Semicolon
            43 => {
                let ctx = self.current_function.as_ref().ok_or_else(|| {
                    Self::flow_err("'return' outside of a function".to_string(), loc)
                })?;
                if ctx.return_type != Type::Void {
                    return Err(Self::flow_err(
                        format!(
                            "function \"{}\" expects a return value of type {}",
                            ctx.name, ctx.return_type
                        ),
                        loc,
                    ));
                }
                Ok(AttributeData::Code(vec![Quadruple::new(
                    OpCode::Return,
                    None,
                    None,
                    None,
                )]))
            }
            // ReturnStatement -> Return RValue Semicolon
            44 => {
                let value = take(&mut rhs, 1).expr();
                let ctx = self.current_function.as_ref().ok_or_else(|| {
                    Self::flow_err("'return' outside of a function".to_string(), loc)
                })?;
                let ExprAttr {
                    ty, place, code: value_code, ..
                } = value;
                let mut code = value_code;
                if ty == Type::Void {
                    if ctx.return_type != Type::Void {
                        return Err(Self::type_err(
                            format!(
                                "mismatched return type: expected {}, found ()",
                                ctx.return_type
                            ),
                            loc,
                        ));
                    }
                    code.push(Quadruple::new(OpCode::Return, None, None, None));
                } else {
                    if !compatible(&ctx.return_type, &ty) {
                        return Err(Self::type_err(
                            format!(
                                "mismatched return type: expected {}, found {}",
                                ctx.return_type, ty
                            ),
                            loc,
                        ));
                    }
                    code.push(Quadruple::new(
                        OpCode::ReturnVal,
                        Some(place.expect("non-void value has a place")),
                        None,
                        None,
                    ));
                }
                Ok(AttributeData::Code(code))
            }
            // BreakStatement -> Break Semicolon
            45 => {
                let ctx = self.loop_stack.last().ok_or_else(|| {
                    Self::flow_err("'break' outside of a loop".to_string(), loc)
                })?;
                if ctx.expr.is_some() {
                    return Err(Self::flow_err(
                        "'break' in a loop expression must provide a value".to_string(),
                        loc,
                    ));
                }
                Ok(AttributeData::Code(vec![Quadruple::jump(ctx.end_label)]))
            }
            // BreakStatement -> Break RValue Semicolon
            46 => {
                let value = take(&mut rhs, 1).expr();
                let ctx = self.loop_stack.last_mut().ok_or_else(|| {
                    Self::flow_err("'break' outside of a loop".to_string(), loc)
                })?;
                let end_label = ctx.end_label;
                let expr_ctx = match ctx.expr.as_mut() {
                    Some(expr_ctx) => expr_ctx,
                    None => {
                        return Err(Self::flow_err(
                            "'break <expression>' is only allowed in loop expressions".to_string(),
                            loc,
                        ))
                    }
                };
                if value.ty == Type::Void {
                    return Err(Self::type_err(
                        "a loop expression cannot break with ()".to_string(),
                        loc,
                    ));
                }
                match &expr_ctx.ty {
                    None => expr_ctx.ty = Some(value.ty.clone()),
                    Some(expected) => {
                        if !compatible(expected, &value.ty) {
                            return Err(Self::type_err(
                                format!(
                                    "mismatched break value: expected {}, found {}",
                                    expected, value.ty
                                ),
                                loc,
                            ));
                        }
                    }
                }
                let result = Operand::Temp(expr_ctx.result_temp);
                let ExprAttr { place, code: value_code, .. } = value;
                let mut code = value_code;
                code.push(Quadruple::assign(
                    place.expect("non-void value has a place"),
                    result,
                ));
                code.push(Quadruple::jump(end_label));
                Ok(AttributeData::Code(code))
            }
            // ContinueStatement -> Continue Semicolon
            47 => {
                let ctx = self.loop_stack.last().ok_or_else(|| {
                    Self::flow_err("'continue' outside of a loop".to_string(), loc)
                })?;
                Ok(AttributeData::Code(vec![Quadruple::jump(ctx.continue_label)]))
            }
            // ContinueStatement -> Continue RValue Semicolon
            48 => Err(Self::flow_err("'continue' cannot take a value".to_string(), loc)),
            // IfStatement -> If Expression Block
            49 => {
                let cond = take(&mut rhs, 1).expr();
                let body = take(&mut rhs, 2).expr();
                let place = self.condition_place(&cond, loc)?;
                let end_label = self.new_label();
                let mut code = cond.code;
                code.push(Quadruple::if_false(place, end_label));
                code.extend(body.code);
                code.push(Quadruple::label(end_label));
                Ok(AttributeData::Code(code))
            }
            // IfStatement -> If Expression Block Else Block
            // IfStatement -> If Expression Block Else IfStatement
            50 | 51 => {
                let cond = take(&mut rhs, 1).expr();
                let then_code = take(&mut rhs, 2).code();
                let else_code = take(&mut rhs, 4).code();
                let place = self.condition_place(&cond, loc)?;
                let else_label = self.new_label();
                let end_label = self.new_label();
                let mut code = cond.code;
                code.push(Quadruple::if_false(place, else_label));
                code.extend(then_code);
                code.push(Quadruple::jump(end_label));
                code.push(Quadruple::label(else_label));
                code.extend(else_code);
                code.push(Quadruple::label(end_label));
                Ok(AttributeData::Code(code))
            }
            // IfExpression -> If Expression Block Else Block
            // IfExpression -> If Expression Block Else IfExpression
            52 | 53 => {
                let cond = take(&mut rhs, 1).expr();
                let then_arm = take(&mut rhs, 2).expr();
                let else_arm = take(&mut rhs, 4).expr();
                self.if_expression(cond, then_arm, else_arm, loc)
            }
            // WhileStatement -> WhileHeader Block
            54 => {
                let cond = take(&mut rhs, 0).expr();
                let body = take(&mut rhs, 1).expr();
                let ctx = self.loop_stack.pop().expect("while loop context");
                debug_assert_eq!(ctx.kind, LoopKind::While);
                let ExprAttr { place, code: cond_code, .. } = cond;
                let mut code = vec![Quadruple::label(ctx.start_label)];
                code.extend(cond_code);
                code.push(Quadruple::if_false(
                    place.expect("condition has a place"),
                    ctx.end_label,
                ));
                code.extend(body.code);
                code.push(Quadruple::jump(ctx.start_label));
                code.push(Quadruple::label(ctx.end_label));
                Ok(AttributeData::Code(code))
            }
            // WhileHeader -> While Expression
            55 => {
                let cond = take(&mut rhs, 1).expr();
                self.condition_place(&cond, loc)?;
                let start_label = self.new_label();
                let end_label = self.new_label();
                self.loop_stack.push(LoopCtx {
                    kind: LoopKind::While,
                    start_label,
                    continue_label: start_label,
                    end_label,
                    expr: None,
                    for_data: None,
                });
                Ok(AttributeData::Expr(cond))
            }
            // ForStatement -> ForHeader Block
            56 => {
                let header_code = take(&mut rhs, 0).code();
                let body = take(&mut rhs, 1).expr();
                let ctx = self.loop_stack.pop().expect("for loop context");
                debug_assert_eq!(ctx.kind, LoopKind::For);
                let (iterator, bound) = ctx.for_data.expect("for loop data");
                let exit_test = self.new_temp();
                let increment = self.new_temp();
                let mut code = header_code;
                code.push(Quadruple::label(ctx.start_label));
                code.push(Quadruple::new(
                    OpCode::Ge,
                    Some(Operand::var(&iterator)),
                    Some(bound),
                    Some(exit_test.clone()),
                ));
                code.push(Quadruple::if_true(exit_test, ctx.end_label));
                code.extend(body.code);
                code.push(Quadruple::label(ctx.continue_label));
                code.push(Quadruple::new(
                    OpCode::Add,
                    Some(Operand::var(&iterator)),
                    Some(Operand::Const(1)),
                    Some(increment.clone()),
                ));
                code.push(Quadruple::assign(increment, Operand::var(&iterator)));
                code.push(Quadruple::jump(ctx.start_label));
                code.push(Quadruple::label(ctx.end_label));
                self.scopes.exit();
                Ok(AttributeData::Code(code))
            }
            // ForHeader -> For Identifier In Expression DotDot Expression
            57 => {
                let token = take(&mut rhs, 1).token();
                let low = take(&mut rhs, 3).expr();
                let high = take(&mut rhs, 5).expr();
                if low.ty != Type::I32 || high.ty != Type::I32 {
                    return Err(Self::type_err(
                        format!("range bounds must be i32, found {}..{}", low.ty, high.ty),
                        loc,
                    ));
                }
                // The loop variable is bound in its own scope.
                self.scopes.enter();
                let level = self.scopes.current_level();
                self.scopes.insert(Symbol::new(
                    &token.content,
                    SymbolKind::Variable,
                    Type::I32,
                    level,
                    false,
                    true,
                    token.loc.row,
                ));
                let bound = self.new_temp();
                let mut code = low.code;
                code.extend(high.code);
                code.push(Quadruple::assign(
                    low.place.expect("range bound has a place"),
                    Operand::var(&token.content),
                ));
                code.push(Quadruple::assign(
                    high.place.expect("range bound has a place"),
                    bound.clone(),
                ));
                let start_label = self.new_label();
                let continue_label = self.new_label();
                let end_label = self.new_label();
                self.loop_stack.push(LoopCtx {
                    kind: LoopKind::For,
                    start_label,
                    continue_label,
                    end_label,
                    expr: None,
                    for_data: Some((token.content, bound)),
                });
                Ok(AttributeData::Code(code))
            }
            // LoopStatement -> LoopStatementHeader Block
            58 => {
                let body = take(&mut rhs, 1).expr();
                let ctx = self.loop_stack.pop().expect("loop context");
                debug_assert_eq!(ctx.kind, LoopKind::Loop);
                let mut code = vec![Quadruple::label(ctx.start_label)];
                code.extend(body.code);
                code.push(Quadruple::jump(ctx.start_label));
                code.push(Quadruple::label(ctx.end_label));
                Ok(AttributeData::Code(code))
            }
            // LoopStatementHeader -> Loop
            59 => {
                let start_label = self.new_label();
                let end_label = self.new_label();
                self.loop_stack.push(LoopCtx {
                    kind: LoopKind::Loop,
                    start_label,
                    continue_label: start_label,
                    end_label,
                    expr: None,
                    for_data: None,
                });
                Ok(AttributeData::Default)
            }
            // LoopExpression -> LoopExpressionHeader Block
            60 => {
                let body = take(&mut rhs, 1).expr();
                let ctx = self.loop_stack.pop().expect("loop expression context");
                let expr_ctx = ctx.expr.expect("loop expression data");
                let ty = expr_ctx.ty.ok_or_else(|| {
                    Self::flow_err(
                        "loop expression lacks a 'break <value>' to determine its type".to_string(),
                        loc,
                    )
                })?;
                let mut code = vec![Quadruple::label(ctx.start_label)];
                code.extend(body.code);
                code.push(Quadruple::jump(ctx.start_label));
                code.push(Quadruple::label(ctx.end_label));
                Ok(AttributeData::Expr(ExprAttr::new(
                    ty,
                    Operand::Temp(expr_ctx.result_temp),
                    code,
                )))
            }
            // LoopExpressionHeader -> Loop
            61 => {
                let result = self.new_temp();
                let result_temp = match result {
                    Operand::Temp(k) => k,
                    _ => unreachable!(),
                };
                let start_label = self.new_label();
                let end_label = self.new_label();
                self.loop_stack.push(LoopCtx {
                    kind: LoopKind::Loop,
                    start_label,
                    continue_label: start_label,
                    end_label,
                    expr: Some(LoopExprCtx {
                        result_temp,
                        ty: None,
                    }),
                    for_data: None,
                });
                Ok(AttributeData::Default)
            }
            // RValue and expression chain rules
            62..=66 | 68 | 70 | 72 => Ok(take(&mut rhs, 0)),
            // ComparisonExpression -> AdditionExpression CmpOp AdditionExpression
            // AdditionExpression -> AdditionExpression AddOp Term
            // Term -> Term MulOp Factor
            67 | 69 | 71 => {
                let left = take(&mut rhs, 0).expr();
                let operator = take(&mut rhs, 1).token();
                let right = take(&mut rhs, 2).expr();
                self.binary_op(left, operator.kind, right, loc)
            }
            // Factor -> Amp Assignable
            73 => {
                let lvalue = take(&mut rhs, 1).lvalue();
                self.reference_op(lvalue, false, loc)
            }
            // Factor -> Amp Mut Assignable
            74 => {
                let lvalue = take(&mut rhs, 2).lvalue();
                self.reference_op(lvalue, true, loc)
            }
            // Element -> IntegerConstant
            75 => {
                let value = rhs[0].token_value();
                Ok(AttributeData::Expr(ExprAttr::new(
                    Type::I32,
                    Operand::Const(value),
                    Vec::new(),
                )))
            }
            // Element -> Assignable
            76 => {
                let lvalue = take(&mut rhs, 0).lvalue();
                self.element_value(lvalue, loc)
            }
            // Element -> FunctionCall
            77 => Ok(take(&mut rhs, 0)),
            // Element -> LParen Expression RParen
            78 => Ok(take(&mut rhs, 1)),
            // Element -> ArrayLiteral | TupleLiteral | Block
            79..=81 => Ok(take(&mut rhs, 0)),
            // Assignable -> Identifier
            82 => {
                let token = take(&mut rhs, 0).token();
                let symbol = self.scopes.lookup(&token.content).ok_or_else(|| {
                    Self::decl_err(
                        format!("Variable \"{}\" not declared", token.content),
                        &token.loc,
                    )
                })?;
                if symbol.kind == SymbolKind::Function {
                    return Err(Self::type_err(
                        format!("\"{}\" is a function, not a value", token.content),
                        &token.loc,
                    ));
                }
                Ok(AttributeData::LValue(LValueAttr {
                    name: Some(token.content.clone()),
                    ty: symbol.ty.clone(),
                    place: LValuePlace::Slot(token.content),
                    code: Vec::new(),
                    is_mutable: symbol.is_mutable,
                    initialized: symbol.initialized,
                }))
            }
            // Assignable -> Element LBracket Expression RBracket
            83 => {
                let base = take(&mut rhs, 0).expr();
                let index = take(&mut rhs, 2).expr();
                if index.ty != Type::I32 {
                    return Err(Self::type_err(
                        format!("array index must be i32, found {}", index.ty),
                        loc,
                    ));
                }
                let element = match &base.ty {
                    Type::Array { element, .. } => (**element).clone(),
                    other => {
                        return Err(Self::type_err(
                            format!("cannot index a value of type {}", other),
                            loc,
                        ))
                    }
                };
                let ExprAttr {
                    place: base_place,
                    code: base_code,
                    base_mutable,
                    ..
                } = base;
                let ExprAttr {
                    place: index_place,
                    code: index_code,
                    ..
                } = index;
                let mut code = base_code;
                code.extend(index_code);
                Ok(AttributeData::LValue(LValueAttr {
                    name: None,
                    ty: element,
                    place: LValuePlace::Element {
                        base: base_place.expect("array value has a place"),
                        index: index_place.expect("index has a place"),
                    },
                    code,
                    is_mutable: base_mutable,
                    initialized: true,
                }))
            }
            // Assignable -> Element Dot IntegerConstant
            84 => {
                let base = take(&mut rhs, 0).expr();
                let index = rhs[2].token_value();
                let elements = match &base.ty {
                    Type::Tuple(elements) => elements.clone(),
                    other => {
                        return Err(Self::type_err(
                            format!("cannot access a field of non-tuple type {}", other),
                            loc,
                        ))
                    }
                };
                if index < 0 || index as usize >= elements.len() {
                    return Err(Self::decl_err(
                        format!("tuple index {} out of range for {}", index, base.ty),
                        loc,
                    ));
                }
                let ExprAttr {
                    place: base_place,
                    code: base_code,
                    base_mutable,
                    ..
                } = base;
                Ok(AttributeData::LValue(LValueAttr {
                    name: None,
                    ty: elements[index as usize].clone(),
                    place: LValuePlace::Element {
                        base: base_place.expect("tuple value has a place"),
                        index: Operand::Const(index),
                    },
                    code: base_code,
                    is_mutable: base_mutable,
                    initialized: true,
                }))
            }
            // Assignable -> Star Element
            85 => {
                let value = take(&mut rhs, 1).expr();
                let (mutable, inner) = match &value.ty {
                    Type::Ref { mutable, inner } => (*mutable, (**inner).clone()),
                    other => {
                        return Err(Self::type_err(
                            format!("cannot dereference a value of type {}", other),
                            loc,
                        ))
                    }
                };
                let ExprAttr { place, code, .. } = value;
                Ok(AttributeData::LValue(LValueAttr {
                    name: None,
                    ty: inner,
                    place: LValuePlace::Deref(place.expect("reference has a place")),
                    code,
                    is_mutable: mutable,
                    initialized: true,
                }))
            }
            // AddOp | MulOp | CmpOp -> operator terminal
            86..=95 => Ok(take(&mut rhs, 0)),
            // FunctionCall -> Identifier LParen ArgumentList RParen
            96 => {
                let token = take(&mut rhs, 0).token();
                let args = take(&mut rhs, 2).args();
                self.call(token.content, args, &token.loc)
            }
            // ArgumentList -> epsilon
            97 => Ok(AttributeData::Args(Vec::new())),
            // ArgumentList -> RValue
            98 => Ok(AttributeData::Args(vec![take(&mut rhs, 0).expr()])),
            // ArgumentList -> RValue Comma ArgumentList
            99 => {
                let head = take(&mut rhs, 0).expr();
                let mut list = take(&mut rhs, 2).args();
                list.insert(0, head);
                Ok(AttributeData::Args(list))
            }
            // ArrayLiteral -> LBracket ElementList RBracket
            100 => {
                let elements = take(&mut rhs, 1).elements();
                self.array_literal(elements, loc)
            }
            // ElementList -> Expression
            101 => Ok(AttributeData::Elements(vec![take(&mut rhs, 0).expr()])),
            // ElementList -> Expression Comma ElementList
            102 => {
                let head = take(&mut rhs, 0).expr();
                let mut list = take(&mut rhs, 2).elements();
                list.insert(0, head);
                Ok(AttributeData::Elements(list))
            }
            // TupleLiteral -> LParen Expression Comma TupleTail RParen
            103 => {
                let first = take(&mut rhs, 1).expr();
                let mut elements = vec![first];
                elements.extend(take(&mut rhs, 3).elements());
                self.tuple_literal(elements, loc)
            }
            // TupleTail -> epsilon
            104 => Ok(AttributeData::Elements(Vec::new())),
            // TupleTail -> Expression
            105 => Ok(AttributeData::Elements(vec![take(&mut rhs, 0).expr()])),
            // TupleTail -> Expression Comma TupleTail
            106 => {
                let head = take(&mut rhs, 0).expr();
                let mut list = take(&mut rhs, 2).elements();
                list.insert(0, head);
                Ok(AttributeData::Elements(list))
            }
            other => panic!("no semantic action for production {}", other),
        }
    }

    fn register_function(
        &mut self,
        sig: SignatureAttr,
        return_type: Type,
    ) -> Result<AttributeData, SemanticError> {
        if let Some(existing) = self.scopes.lookup(&sig.name) {
            if existing.kind == SymbolKind::Function {
                return Err(Self::decl_err(
                    format!("Function \"{}\" already declared", sig.name),
                    &sig.loc,
                ));
            }
        }
        let mut seen = BTreeSet::new();
        for param in &sig.params {
            if !seen.insert(param.name.clone()) {
                return Err(Self::decl_err(
                    format!(
                        "duplicate parameter \"{}\" in function \"{}\"",
                        param.name, sig.name
                    ),
                    &param.loc,
                ));
            }
        }
        let mut symbol = Symbol::new(
            &sig.name,
            SymbolKind::Function,
            return_type.clone(),
            0,
            false,
            true,
            sig.loc.row,
        );
        symbol.extra = SymbolExtra::Function(FunctionSig {
            params: sig.params.clone(),
            return_type: return_type.clone(),
        });
        self.scopes.insert(symbol);
        self.current_function = Some(FunctionCtx {
            name: sig.name.clone(),
            return_type,
        });
        self.scopes.enter();
        let level = self.scopes.current_level();
        for param in &sig.params {
            self.scopes.insert(Symbol::new(
                &param.name,
                SymbolKind::Parameter,
                param.ty.clone(),
                level,
                param.is_mutable,
                true,
                param.loc.row,
            ));
        }
        let code = vec![Quadruple::new(
            OpCode::FuncBegin,
            Some(Operand::var(&sig.name)),
            None,
            None,
        )];
        Ok(AttributeData::Header {
            name: sig.name,
            code,
        })
    }

    fn declare(
        &mut self,
        inner: (String, bool, Location),
        declared: Option<Type>,
        value: Option<ExprAttr>,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let (name, is_mutable, decl_loc) = inner;
        let mut code = Vec::new();
        let (ty, initialized, borrow) = match value {
            Some(expr) => {
                let ExprAttr {
                    ty: found,
                    place,
                    code: expr_code,
                    borrow,
                    ..
                } = expr;
                code.extend(expr_code);
                if found == Type::Void {
                    return Err(Self::type_err(
                        format!("cannot bind \"{}\" to a value of type ()", name),
                        loc,
                    ));
                }
                let ty = match declared {
                    Some(expected) => {
                        if !compatible(&expected, &found) {
                            return Err(Self::type_err(
                                format!("mismatched types: expected {}, found {}", expected, found),
                                loc,
                            ));
                        }
                        expected
                    }
                    None => found,
                };
                code.push(Quadruple::assign(
                    place.expect("non-void value has a place"),
                    Operand::var(&name),
                ));
                (ty, true, borrow)
            }
            None => (declared.unwrap_or(Type::Unknown), false, None),
        };
        let kind = SymbolKind::for_binding(&ty);
        let mut symbol = Symbol::new(
            &name,
            kind,
            ty.clone(),
            self.scopes.current_level(),
            is_mutable,
            initialized,
            decl_loc.row,
        );
        if let Some(source) = &borrow {
            if matches!(ty, Type::Ref { .. }) {
                symbol.extra = SymbolExtra::Borrow {
                    target: source.target.clone(),
                    mutable: source.mutable,
                };
            }
        }
        // Shadowing a reference binding releases the borrow it held.
        if let Some(shadowed) = self.scopes.insert(symbol) {
            if let SymbolExtra::Borrow { target, mutable } = shadowed.extra {
                self.scopes.release_borrow(&target, mutable);
            }
        }
        Ok(AttributeData::Code(code))
    }

    fn assign(
        &mut self,
        lvalue: LValueAttr,
        value: ExprAttr,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let LValueAttr {
            name,
            ty: slot_ty,
            place,
            code: lvalue_code,
            is_mutable,
            initialized,
        } = lvalue;
        let ExprAttr {
            ty: found,
            place: value_place,
            code: value_code,
            borrow,
            ..
        } = value;
        let mut code = lvalue_code;
        code.extend(value_code);
        match place {
            LValuePlace::Slot(slot) => {
                if !is_mutable && initialized {
                    return Err(Self::mut_err(
                        format!("cannot assign twice to immutable variable \"{}\"", slot),
                        loc,
                    ));
                }
                if found == Type::Void {
                    return Err(Self::type_err(
                        format!("cannot assign a value of type () to \"{}\"", slot),
                        loc,
                    ));
                }
                if slot_ty == Type::Unknown {
                    let symbol = self.scopes.lookup_mut(&slot).expect("resolved lvalue");
                    symbol.ty = found.clone();
                    symbol.kind = SymbolKind::for_binding(&found);
                } else if !compatible(&slot_ty, &found) {
                    return Err(Self::type_err(
                        format!("mismatched types: expected {}, found {}", slot_ty, found),
                        loc,
                    ));
                }
                // Rebinding a reference releases the borrow it held.
                let old_borrow = {
                    let symbol = self.scopes.lookup_mut(&slot).expect("resolved lvalue");
                    symbol.initialized = true;
                    match &symbol.extra {
                        SymbolExtra::Borrow { target, mutable } => {
                            Some((target.clone(), *mutable))
                        }
                        _ => None,
                    }
                };
                if let Some((target, mutable)) = old_borrow {
                    self.scopes.release_borrow(&target, mutable);
                    if let Some(symbol) = self.scopes.lookup_mut(&slot) {
                        symbol.extra = SymbolExtra::None;
                    }
                }
                if let Some(source) = borrow {
                    let symbol = self.scopes.lookup_mut(&slot).expect("resolved lvalue");
                    if matches!(symbol.ty, Type::Ref { .. }) {
                        symbol.extra = SymbolExtra::Borrow {
                            target: source.target,
                            mutable: source.mutable,
                        };
                    }
                }
                code.push(Quadruple::assign(
                    value_place.expect("non-void value has a place"),
                    Operand::var(&slot),
                ));
            }
            LValuePlace::Element { base, index } => {
                if !is_mutable {
                    let described = name.unwrap_or_else(|| base.to_string());
                    return Err(Self::mut_err(
                        format!("cannot assign to an element of immutable \"{}\"", described),
                        loc,
                    ));
                }
                if !compatible(&slot_ty, &found) {
                    return Err(Self::type_err(
                        format!("mismatched types: expected {}, found {}", slot_ty, found),
                        loc,
                    ));
                }
                code.push(Quadruple::new(
                    OpCode::ArrayStore,
                    Some(base),
                    Some(index),
                    Some(value_place.expect("non-void value has a place")),
                ));
            }
            LValuePlace::Deref(pointer) => {
                if !is_mutable {
                    return Err(Self::mut_err(
                        "cannot assign through a shared reference".to_string(),
                        loc,
                    ));
                }
                if !compatible(&slot_ty, &found) {
                    return Err(Self::type_err(
                        format!("mismatched types: expected {}, found {}", slot_ty, found),
                        loc,
                    ));
                }
                code.push(Quadruple::new(
                    OpCode::DerefStore,
                    Some(pointer),
                    Some(value_place.expect("non-void value has a place")),
                    None,
                ));
            }
        }
        Ok(AttributeData::Code(code))
    }

    fn binary_op(
        &mut self,
        left: ExprAttr,
        operator: TokenKind,
        right: ExprAttr,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let op = match operator {
            TokenKind::Plus => OpCode::Add,
            TokenKind::Minus => OpCode::Sub,
            TokenKind::Star => OpCode::Mul,
            TokenKind::Slash => OpCode::Div,
            TokenKind::Lt => OpCode::Lt,
            TokenKind::Le => OpCode::Le,
            TokenKind::Gt => OpCode::Gt,
            TokenKind::Ge => OpCode::Ge,
            TokenKind::EqEq => OpCode::Eq,
            TokenKind::NotEq => OpCode::Ne,
            other => panic!("not a binary operator: {:?}", other),
        };
        let comparison = matches!(
            op,
            OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge | OpCode::Eq | OpCode::Ne
        );
        if comparison {
            if left.ty != right.ty {
                return Err(Self::type_err(
                    format!("comparison of mismatched types: {} vs {}", left.ty, right.ty),
                    loc,
                ));
            }
            if left.ty != Type::I32 {
                return Err(Self::type_err(
                    format!("comparison is not supported for type {}", left.ty),
                    loc,
                ));
            }
        } else {
            if left.ty != Type::I32 || right.ty != Type::I32 {
                return Err(Self::type_err(
                    format!(
                        "arithmetic requires i32 operands, found {} and {}",
                        left.ty, right.ty
                    ),
                    loc,
                ));
            }
            if op == OpCode::Div && right.place == Some(Operand::Const(0)) {
                return Err(Self::type_err("division by zero".to_string(), loc));
            }
        }
        let result = self.new_temp();
        let ExprAttr {
            place: left_place,
            code: left_code,
            ..
        } = left;
        let ExprAttr {
            place: right_place,
            code: right_code,
            ..
        } = right;
        let mut code = left_code;
        code.extend(right_code);
        code.push(Quadruple::new(
            op,
            Some(left_place.expect("non-void operand has a place")),
            Some(right_place.expect("non-void operand has a place")),
            Some(result.clone()),
        ));
        Ok(AttributeData::Expr(ExprAttr::new(Type::I32, result, code)))
    }

    fn reference_op(
        &mut self,
        lvalue: LValueAttr,
        mutable: bool,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let target = match &lvalue.place {
            LValuePlace::Slot(name) => name.clone(),
            _ => {
                return Err(Self::mut_err(
                    "references can only be taken of named variables".to_string(),
                    loc,
                ))
            }
        };
        let (target_ty, target_mutable, target_initialized, borrows) = {
            let symbol = self.scopes.lookup(&target).expect("resolved lvalue");
            (
                symbol.ty.clone(),
                symbol.is_mutable,
                symbol.initialized,
                symbol.borrows,
            )
        };
        if !target_initialized {
            return Err(Self::decl_err(
                format!("Variable \"{}\" used before initialization", target),
                loc,
            ));
        }
        if mutable {
            if !target_mutable {
                return Err(Self::mut_err(
                    format!(
                        "cannot take a mutable reference to immutable variable \"{}\"",
                        target
                    ),
                    loc,
                ));
            }
            if borrows.mutable > 0 || borrows.immutable > 0 {
                return Err(Self::mut_err(
                    format!("cannot borrow \"{}\" mutably: it is already borrowed", target),
                    loc,
                ));
            }
        } else if borrows.mutable > 0 {
            return Err(Self::mut_err(
                format!("cannot borrow \"{}\": it is already mutably borrowed", target),
                loc,
            ));
        }
        {
            let symbol = self.scopes.lookup_mut(&target).expect("resolved lvalue");
            if mutable {
                symbol.borrows.mutable += 1;
            } else {
                symbol.borrows.immutable += 1;
            }
        }
        let result = self.new_temp();
        let mut code = lvalue.code;
        code.push(Quadruple::new(
            OpCode::Ref,
            Some(Operand::var(&target)),
            None,
            Some(result.clone()),
        ));
        let mut attr = ExprAttr::new(Type::reference(mutable, target_ty), result, code);
        attr.borrow = Some(BorrowSource { target, mutable });
        Ok(AttributeData::Expr(attr))
    }

    /// An lvalue used as a value: named slots read in place, element and
    /// dereference accesses load into a fresh temporary.
    fn element_value(
        &mut self,
        lvalue: LValueAttr,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let LValueAttr {
            ty,
            place,
            code: lvalue_code,
            is_mutable,
            ..
        } = lvalue;
        match place {
            LValuePlace::Slot(name) => {
                let symbol = self.scopes.lookup(&name).expect("resolved lvalue");
                if !symbol.initialized {
                    return Err(Self::decl_err(
                        format!("Variable \"{}\" used before initialization", name),
                        loc,
                    ));
                }
                let mut attr = ExprAttr::new(ty, Operand::var(&name), lvalue_code);
                attr.base_mutable = symbol.is_mutable;
                Ok(AttributeData::Expr(attr))
            }
            LValuePlace::Element { base, index } => {
                let result = self.new_temp();
                let mut code = lvalue_code;
                code.push(Quadruple::new(
                    OpCode::ArrayLoad,
                    Some(base),
                    Some(index),
                    Some(result.clone()),
                ));
                let mut attr = ExprAttr::new(ty, result, code);
                attr.base_mutable = is_mutable;
                Ok(AttributeData::Expr(attr))
            }
            LValuePlace::Deref(pointer) => {
                let result = self.new_temp();
                let mut code = lvalue_code;
                code.push(Quadruple::new(
                    OpCode::DerefLoad,
                    Some(pointer),
                    None,
                    Some(result.clone()),
                ));
                let mut attr = ExprAttr::new(ty, result, code);
                attr.base_mutable = is_mutable;
                Ok(AttributeData::Expr(attr))
            }
        }
    }

    fn call(
        &mut self,
        name: String,
        args: Vec<ExprAttr>,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let sig = {
            let symbol = self.scopes.lookup(&name).ok_or_else(|| {
                Self::decl_err(format!("Function \"{}\" not declared", name), loc)
            })?;
            symbol
                .signature()
                .ok_or_else(|| Self::type_err(format!("\"{}\" is not a function", name), loc))?
                .clone()
        };
        if args.len() != sig.params.len() {
            return Err(Self::type_err(
                format!(
                    "function \"{}\" expects {} arguments but {} were supplied",
                    name,
                    sig.params.len(),
                    args.len()
                ),
                loc,
            ));
        }
        let mut code = Vec::new();
        let mut places = Vec::new();
        for (param, arg) in sig.params.iter().zip(args.into_iter()) {
            if !compatible(&param.ty, &arg.ty) {
                return Err(Self::type_err(
                    format!(
                        "mismatched argument for \"{}\" of \"{}\": expected {}, found {}",
                        param.name, name, param.ty, arg.ty
                    ),
                    loc,
                ));
            }
            let ExprAttr { place, code: arg_code, .. } = arg;
            code.extend(arg_code);
            places.push(place.expect("non-void argument has a place"));
        }
        // Argument transfers sit directly before the call so nested calls
        // cannot interleave with them.
        let count = places.len();
        for place in places {
            code.push(Quadruple::new(OpCode::Param, Some(place), None, None));
        }
        let result = if sig.return_type != Type::Void {
            Some(self.new_temp())
        } else {
            None
        };
        code.push(Quadruple::new(
            OpCode::Call,
            Some(Operand::var(&name)),
            Some(Operand::Const(count as i32)),
            result.clone(),
        ));
        Ok(AttributeData::Expr(ExprAttr {
            ty: sig.return_type,
            place: result,
            code,
            base_mutable: true,
            borrow: None,
        }))
    }

    fn condition_place(
        &self,
        cond: &ExprAttr,
        loc: &Location,
    ) -> Result<Operand, SemanticError> {
        if cond.ty != Type::I32 {
            return Err(Self::type_err(
                format!("condition must be i32, found {}", cond.ty),
                loc,
            ));
        }
        Ok(cond.place())
    }

    fn if_expression(
        &mut self,
        cond: ExprAttr,
        then_arm: ExprAttr,
        else_arm: ExprAttr,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let place = self.condition_place(&cond, loc)?;
        if then_arm.ty == Type::Void || else_arm.ty == Type::Void {
            return Err(Self::type_err(
                "both arms of an if expression must produce a value".to_string(),
                loc,
            ));
        }
        if !compatible(&then_arm.ty, &else_arm.ty) {
            return Err(Self::type_err(
                format!(
                    "if and else arms have incompatible types: {} vs {}",
                    then_arm.ty, else_arm.ty
                ),
                loc,
            ));
        }
        let result = self.new_temp();
        let else_label = self.new_label();
        let end_label = self.new_label();
        let ty = then_arm.ty.clone();
        let mut code = cond.code;
        code.push(Quadruple::if_false(place, else_label));
        code.extend(then_arm.code);
        code.push(Quadruple::assign(
            then_arm.place.expect("non-void arm has a place"),
            result.clone(),
        ));
        code.push(Quadruple::jump(end_label));
        code.push(Quadruple::label(else_label));
        code.extend(else_arm.code);
        code.push(Quadruple::assign(
            else_arm.place.expect("non-void arm has a place"),
            result.clone(),
        ));
        code.push(Quadruple::label(end_label));
        Ok(AttributeData::Expr(ExprAttr::new(ty, result, code)))
    }

    fn array_literal(
        &mut self,
        elements: Vec<ExprAttr>,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let element_ty = elements[0].ty.clone();
        if !element_ty.is_scalar() {
            return Err(Self::type_err(
                format!(
                    "array element type must be i32 or a reference, found {}",
                    element_ty
                ),
                loc,
            ));
        }
        for element in &elements[1..] {
            if !compatible(&element_ty, &element.ty) {
                return Err(Self::type_err(
                    format!(
                        "array elements must all have type {}, found {}",
                        element_ty, element.ty
                    ),
                    loc,
                ));
            }
        }
        let length = elements.len() as u32;
        let place = self.new_temp();
        let mut code = Vec::new();
        let mut places = Vec::new();
        for element in elements {
            let ExprAttr { place, code: element_code, .. } = element;
            code.extend(element_code);
            places.push(place.expect("non-void element has a place"));
        }
        code.push(Quadruple::new(
            OpCode::ArrayInit,
            Some(place.clone()),
            Some(Operand::Const(length as i32)),
            None,
        ));
        for (index, element_place) in places.into_iter().enumerate() {
            code.push(Quadruple::new(
                OpCode::ArraySet,
                Some(place.clone()),
                Some(Operand::Const(index as i32)),
                Some(element_place),
            ));
        }
        Ok(AttributeData::Expr(ExprAttr::new(
            Type::array(element_ty, length),
            place,
            code,
        )))
    }

    fn tuple_literal(
        &mut self,
        elements: Vec<ExprAttr>,
        loc: &Location,
    ) -> Result<AttributeData, SemanticError> {
        let mut element_types = Vec::new();
        for element in &elements {
            if !element.ty.is_scalar() {
                return Err(Self::type_err(
                    format!(
                        "tuple element type must be i32 or a reference, found {}",
                        element.ty
                    ),
                    loc,
                ));
            }
            element_types.push(element.ty.clone());
        }
        let place = self.new_temp();
        let mut code = Vec::new();
        let mut places = Vec::new();
        let length = elements.len();
        for element in elements {
            let ExprAttr { place, code: element_code, .. } = element;
            code.extend(element_code);
            places.push(place.expect("non-void element has a place"));
        }
        code.push(Quadruple::new(
            OpCode::TupleInit,
            Some(place.clone()),
            Some(Operand::Const(length as i32)),
            None,
        ));
        for (index, element_place) in places.into_iter().enumerate() {
            code.push(Quadruple::new(
                OpCode::TupleSet,
                Some(place.clone()),
                Some(Operand::Const(index as i32)),
                Some(element_place),
            ));
        }
        Ok(AttributeData::Expr(ExprAttr::new(
            Type::Tuple(element_types),
            place,
            code,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrs::Token;

    fn token(content: &str, kind: TokenKind) -> AttributeData {
        AttributeData::Token {
            token: Token::new(1, content, kind, Location::new(1, 1)),
            value: None,
        }
    }

    fn int_expr(value: i32) -> AttributeData {
        AttributeData::Expr(ExprAttr::new(Type::I32, Operand::Const(value), Vec::new()))
    }

    #[test]
    fn rule_table_matches_the_loaded_grammar() {
        let grammar =
            lr1_gen::Grammar::parse(&grammar_text(), &lexrs::TokenKind::names()).unwrap();
        assert!(check_grammar(&grammar).is_ok());
    }

    #[test]
    fn the_shipped_grammar_file_matches_the_rule_table() {
        let text = include_str!("../../configs/grammar.cfg");
        let grammar = lr1_gen::Grammar::parse(text, &lexrs::TokenKind::names()).unwrap();
        assert_eq!(check_grammar(&grammar), Ok(()));
    }

    #[test]
    fn every_rule_has_an_arrow() {
        for rule in GRAMMAR_RULES.iter() {
            assert!(rule.contains(" -> "), "bad rule: {}", rule);
        }
    }

    #[test]
    fn division_by_literal_zero_is_rejected() {
        let mut analyzer = SemanticAnalyzer::new();
        let loc = Location::new(2, 5);
        let rhs = vec![int_expr(4), token("/", TokenKind::Slash), int_expr(0)];
        let error = analyzer.apply(71, rhs, &loc).unwrap_err();
        assert_eq!(error.kind, SemanticErrorKind::Type);
        assert!(error.message.contains("division by zero"));
    }

    #[test]
    fn arithmetic_allocates_fresh_temporaries() {
        let mut analyzer = SemanticAnalyzer::new();
        let loc = Location::default();
        let rhs = vec![int_expr(2), token("*", TokenKind::Star), int_expr(3)];
        let attr = analyzer.apply(71, rhs, &loc).unwrap().expr();
        assert_eq!(attr.ty, Type::I32);
        assert_eq!(attr.place, Some(Operand::Temp(1)));
        assert_eq!(attr.code.len(), 1);
        assert_eq!(attr.code[0].to_string(), "(MUL, 2, 3, t1)");
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let mut analyzer = SemanticAnalyzer::new();
        let loc = Location::new(4, 1);
        let rhs = vec![
            token("break", TokenKind::Break),
            token(";", TokenKind::Semicolon),
        ];
        let error = analyzer.apply(45, rhs, &loc).unwrap_err();
        assert_eq!(error.kind, SemanticErrorKind::ControlFlow);
    }

    #[test]
    fn undeclared_variable_is_rejected() {
        let mut analyzer = SemanticAnalyzer::new();
        let loc = Location::default();
        let rhs = vec![token("missing", TokenKind::Identifier)];
        let error = analyzer.apply(82, rhs, &loc).unwrap_err();
        assert_eq!(error.kind, SemanticErrorKind::Declaration);
        assert!(error.message.contains("not declared"));
    }

    #[test]
    fn comparison_of_mismatched_types_is_rejected() {
        let mut analyzer = SemanticAnalyzer::new();
        let loc = Location::default();
        let reference = AttributeData::Expr(ExprAttr::new(
            Type::reference(false, Type::I32),
            Operand::Temp(9),
            Vec::new(),
        ));
        let rhs = vec![int_expr(1), token("<", TokenKind::Lt), reference];
        let error = analyzer.apply(67, rhs, &loc).unwrap_err();
        assert_eq!(error.kind, SemanticErrorKind::Type);
    }
}
