// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! End-to-end pipeline tests: source text through tokens, tables, parsing,
//! semantic checks and quadruples, down to MIPS text.

use lazy_static::lazy_static;
use lr1_gen::ParseTables;
use rsmc::error::{CompileError, SemanticErrorKind};
use rsmc::ir::{OpCode, Quadruple};

lazy_static! {
    static ref TABLES: ParseTables = rsmc::builtin_tables();
}

fn quads(text: &str) -> Vec<Quadruple> {
    rsmc::analyze_text(text, &TABLES)
        .unwrap_or_else(|e| panic!("{} failed: {}", text, e))
        .code
}

fn assembly(text: &str) -> String {
    rsmc::compile_text(text, &TABLES).unwrap_or_else(|e| panic!("{} failed: {}", text, e))
}

fn failure(text: &str) -> CompileError {
    rsmc::compile_text(text, &TABLES).expect_err("compilation should fail")
}

fn semantic_kind(text: &str) -> SemanticErrorKind {
    match failure(text) {
        CompileError::Semantic(error) => error.kind,
        other => panic!("expected a semantic error, got {:?}", other),
    }
}

fn displays(quads: &[Quadruple]) -> Vec<String> {
    quads.iter().map(|q| q.to_string()).collect()
}

// --- end-to-end scenarios ---------------------------------------------

#[test]
fn arithmetic_respects_precedence() {
    let code = quads("fn main(){ let x: i32 = 1 + 2 * 3; }");
    let listing = displays(&code);
    assert_eq!(listing[1], "(MUL, 2, 3, t1)");
    assert_eq!(listing[2], "(ADD, 1, t1, t2)");
    assert_eq!(listing[3], "(ASSIGN, t2, x)");
    let text = assembly("fn main(){ let x: i32 = 1 + 2 * 3; }");
    assert!(text.contains("    mul "));
    assert!(text.contains("    addu "));
}

#[test]
fn array_literals_and_element_accesses() {
    let code = quads("fn main(){ let mut a: [i32;3] = [10,20,30]; a[1] = a[0] + a[2]; }");
    let ops: Vec<OpCode> = code.iter().map(|q| q.op).collect();
    assert_eq!(
        ops,
        vec![
            OpCode::FuncBegin,
            OpCode::ArrayInit,
            OpCode::ArraySet,
            OpCode::ArraySet,
            OpCode::ArraySet,
            OpCode::Assign,
            OpCode::ArrayLoad,
            OpCode::ArrayLoad,
            OpCode::Add,
            OpCode::ArrayStore,
            OpCode::FuncEnd,
        ]
    );
}

#[test]
fn calls_pass_arguments_in_registers() {
    let source = "fn inc(x: i32)->i32 { x + 1 } fn main(){ let y = inc(41); }";
    let listing = displays(&quads(source));
    assert!(listing.contains(&"(PARAM, 41, _, _)".to_string()));
    assert!(listing.contains(&"(CALL, inc, 1, t2)".to_string()));
    assert!(listing.contains(&"(ASSIGN, t2, y)".to_string()));
    let text = assembly(source);
    assert!(text.contains("    li $a0, 41"));
    assert!(text.contains("    jal inc"));
}

#[test]
fn while_loops_have_one_head_one_test_one_back_edge() {
    let code = quads("fn main(){ let mut i = 0; while i < 10 { i = i + 1; } }");
    let count = |op: OpCode| code.iter().filter(|q| q.op == op).count();
    assert_eq!(count(OpCode::Label), 2);
    assert_eq!(count(OpCode::IfFalse), 1);
    assert_eq!(count(OpCode::Jump), 1);
    let listing = displays(&code);
    assert!(listing.contains(&"(JUMP, _, _, L1)".to_string()));
    assert!(listing.contains(&"(IF_FALSE, t1, _, L2)".to_string()));
}

#[test]
fn mutable_references_store_through_the_pointer() {
    let code = quads("fn main(){ let mut x = 0; let r = &mut x; *r = 7; }");
    let listing = displays(&code);
    assert!(listing.contains(&"(REF, x, _, t1)".to_string()));
    assert!(listing.contains(&"(ASSIGN, t1, r)".to_string()));
    assert!(listing.contains(&"(DEREF_STORE, r, 7, _)".to_string()));
}

#[test]
fn a_live_mutable_borrow_blocks_a_shared_one() {
    let kind =
        semantic_kind("fn main(){ let mut x = 0; let r = &mut x; let r2 = &x; *r = 7; }");
    assert_eq!(kind, SemanticErrorKind::Mutability);
}

#[test]
fn loop_expressions_carry_their_break_value() {
    let code = quads("fn main(){ let v = loop { break 5; }; let w = v + 1; }");
    let listing = displays(&code);
    let assign_result = listing
        .iter()
        .position(|l| l == "(ASSIGN, 5, t1)")
        .expect("break writes the loop result");
    let exit_jump = listing
        .iter()
        .position(|l| l == "(JUMP, _, _, L2)")
        .expect("break jumps to the loop end");
    assert!(assign_result < exit_jump);
    assert!(listing.contains(&"(ASSIGN, t1, v)".to_string()));
    // The loop expression typed as i32: v participates in arithmetic.
    assert!(listing.contains(&"(ADD, v, 1, t2)".to_string()));
}

// --- invariants --------------------------------------------------------

fn assert_labels_paired(code: &[Quadruple]) {
    use rsmc::ir::Operand;
    let mut defined = std::collections::BTreeMap::new();
    for quad in code {
        if quad.op == OpCode::Label {
            if let Some(Operand::Label(k)) = &quad.result {
                *defined.entry(*k).or_insert(0u32) += 1;
            }
        }
    }
    for quad in code {
        if matches!(quad.op, OpCode::Jump | OpCode::IfFalse | OpCode::IfTrue) {
            if let Some(Operand::Label(k)) = &quad.result {
                assert_eq!(defined.get(k), Some(&1), "label L{} not uniquely defined", k);
            }
        }
    }
}

fn assert_temps_single_definition(code: &[Quadruple]) {
    use rsmc::ir::Operand;
    let mut seen = std::collections::BTreeSet::new();
    for quad in code {
        if let Some(Operand::Temp(k)) = &quad.result {
            assert!(seen.insert(*k), "temporary t{} defined twice", k);
        }
    }
}

fn assert_functions_balanced(code: &[Quadruple]) {
    let mut open: Option<String> = None;
    for quad in code {
        match quad.op {
            OpCode::FuncBegin => {
                assert!(open.is_none(), "FUNC_BEGIN while a function is open");
                open = quad.arg1.as_ref().map(|o| o.to_string());
            }
            OpCode::FuncEnd => {
                let name = quad.arg1.as_ref().map(|o| o.to_string());
                assert_eq!(open.take(), name, "FUNC_END does not match FUNC_BEGIN");
            }
            _ => assert!(open.is_some(), "{} outside of a function", quad),
        }
    }
    assert!(open.is_none(), "unterminated function");
}

#[test]
fn generated_programs_satisfy_the_ir_invariants() {
    let sources = [
        "fn main(){ let x: i32 = 1 + 2 * 3; }",
        "fn main(){ let mut a: [i32;3] = [10,20,30]; a[1] = a[0] + a[2]; }",
        "fn main(){ let mut i = 0; while i < 10 { i = i + 1; } }",
        "fn main(){ for i in 0..10 { let x = i * 2; } }",
        "fn sum(a: i32, b: i32)->i32 { a + b } fn main(){ let s = sum(1, 2); }",
        "fn main(){ let v = loop { break 5; }; let w = if v < 3 { 1 } else { 2 }; }",
    ];
    for source in sources {
        let code = quads(source);
        assert_labels_paired(&code);
        assert_temps_single_definition(&code);
        assert_functions_balanced(&code);
    }
}

#[test]
fn compiling_twice_produces_identical_assembly() {
    let source = "fn main(){ let mut i = 0; for j in 0..3 { i = i + j; } }";
    assert_eq!(assembly(source), assembly(source));
}

// --- boundaries --------------------------------------------------------

#[test]
fn single_element_arrays_lower_like_any_other() {
    let code = quads("fn main(){ let a = [5]; let x = a[0]; }");
    let listing = displays(&code);
    assert!(listing.contains(&"(ARRAY_INIT, t1, 1, _)".to_string()));
    assert!(listing.contains(&"(ARRAY_LOAD, a, 0, t2)".to_string()));
}

#[test]
fn four_parameters_work_and_a_fifth_does_not() {
    let four = "fn f(a: i32, b: i32, c: i32, d: i32){} fn main(){ f(1, 2, 3, 4); }";
    let text = assembly(four);
    assert!(text.contains("    li $a3, 4"));
    let five = "fn f(a: i32, b: i32, c: i32, d: i32, e: i32){} fn main(){ f(1, 2, 3, 4, 5); }";
    assert!(matches!(failure(five), CompileError::Backend(_)));
}

#[test]
fn else_if_chains_lower_as_nested_ifs() {
    let source =
        "fn main(){ let mut x = 0; if x < 1 { x = 1; } else if x < 2 { x = 2; } else { x = 3; } }";
    let code = quads(source);
    assert_labels_paired(&code);
    assert_eq!(code.iter().filter(|q| q.op == OpCode::IfFalse).count(), 2);
}

#[test]
fn for_loop_continue_advances_the_iterator() {
    // continue jumps to the increment label, not the loop head.
    let code = quads("fn main(){ for i in 0..4 { continue; } }");
    let listing = displays(&code);
    let continue_jump = listing
        .iter()
        .position(|l| l == "(JUMP, _, _, L2)")
        .expect("continue targets the increment");
    let increment_label = listing
        .iter()
        .position(|l| l == "(LABEL, _, _, L2)")
        .expect("increment label exists");
    assert!(continue_jump < increment_label);
}

#[test]
fn tuples_load_and_store_by_field_offset() {
    let source = "fn main(){ let mut t = (1, 2); t.1 = t.0 + 3; }";
    let code = quads(source);
    let listing = displays(&code);
    assert!(listing.contains(&"(TUPLE_INIT, t1, 2, _)".to_string()));
    assert!(listing.contains(&"(TUPLE_SET, t1, 0, 1)".to_string()));
    assert!(listing.contains(&"(ARRAY_LOAD, t, 0, t2)".to_string()));
    assert!(listing.contains(&"(ARRAY_STORE, t, 1, t3)".to_string()));
}

#[test]
fn arrays_pass_to_functions_by_reference() {
    let source =
        "fn first(a: [i32; 2])->i32 { a[0] } fn main(){ let xs = [7, 8]; let x = first(xs); }";
    let text = assembly(source);
    // The caller passes the address, the callee indexes through it.
    assert!(text.contains("    addiu $a0, $fp,"));
}

#[test]
fn same_scope_redeclaration_shadows() {
    let code = quads("fn main(){ let x = 1; let x = x + 1; }");
    let listing = displays(&code);
    assert!(listing.contains(&"(ADD, x, 1, t1)".to_string()));
}

// --- error taxonomy ----------------------------------------------------

#[test]
fn unknown_characters_are_lexical_errors() {
    assert!(matches!(
        failure("fn main(){ let x = 1 @ 2; }"),
        CompileError::Lexical { .. }
    ));
}

#[test]
fn unterminated_comments_are_lexical_errors() {
    assert!(matches!(
        failure("fn main(){} /* open"),
        CompileError::Lexical { .. }
    ));
}

#[test]
fn stray_tokens_are_syntax_errors() {
    match failure("fn main(){ let = 1; }") {
        CompileError::Syntax { expected, .. } => assert!(!expected.is_empty()),
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn declaration_errors() {
    assert_eq!(
        semantic_kind("fn f(){} fn f(){} fn main(){}"),
        SemanticErrorKind::Declaration
    );
    assert_eq!(
        semantic_kind("fn main(){ let y = x + 1; }"),
        SemanticErrorKind::Declaration
    );
    assert_eq!(
        semantic_kind("fn main(){ let x: i32; let y = x + 1; }"),
        SemanticErrorKind::Declaration
    );
    assert_eq!(
        semantic_kind("fn main(){ let a: [i32; 0]; }"),
        SemanticErrorKind::Declaration
    );
    assert_eq!(
        semantic_kind("fn main(){ let t = (1, 2); let x = t.5; }"),
        SemanticErrorKind::Declaration
    );
}

#[test]
fn type_errors() {
    assert_eq!(
        semantic_kind("fn main(){ let a: [i32; 2] = [1, 2, 3]; }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn main(){ let t = (1, 2); let x = t + 1; }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn main(){ let t = (1, 2); if t { } }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn main(){ let x = 1 / 0; }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn main(){ let x = 5; let y = x[0]; }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn main(){ let x = 5; let y = x.0; }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn main(){ let x = 5; let y = *x; }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn g(){} fn main(){ let x = g(); }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn f(x: i32)->i32 { x } fn main(){ let y = f(1, 2); }"),
        SemanticErrorKind::Type
    );
    assert_eq!(
        semantic_kind("fn f()->i32 { return (1, 2); }  fn main(){}"),
        SemanticErrorKind::Type
    );
}

#[test]
fn mutability_errors() {
    assert_eq!(
        semantic_kind("fn main(){ let x = 1; x = 2; }"),
        SemanticErrorKind::Mutability
    );
    assert_eq!(
        semantic_kind("fn main(){ let x = 1; let r = &mut x; }"),
        SemanticErrorKind::Mutability
    );
    assert_eq!(
        semantic_kind("fn main(){ let mut x = 1; let r = &x; *r = 2; }"),
        SemanticErrorKind::Mutability
    );
    assert_eq!(
        semantic_kind("fn main(){ let a = [1, 2]; a[0] = 3; }"),
        SemanticErrorKind::Mutability
    );
}

#[test]
fn control_flow_errors() {
    assert_eq!(
        semantic_kind("fn main(){ break; }"),
        SemanticErrorKind::ControlFlow
    );
    assert_eq!(
        semantic_kind("fn main(){ loop { continue 1; } }"),
        SemanticErrorKind::ControlFlow
    );
    assert_eq!(
        semantic_kind("fn main(){ while 1 { break 5; } }"),
        SemanticErrorKind::ControlFlow
    );
    assert_eq!(
        semantic_kind("fn main(){ let v = loop { }; }"),
        SemanticErrorKind::ControlFlow
    );
    assert_eq!(
        semantic_kind("fn f()->i32 { return; } fn main(){}"),
        SemanticErrorKind::ControlFlow
    );
}

// --- miscellaneous behaviors ------------------------------------------

#[test]
fn an_immutable_binding_may_be_initialized_exactly_once() {
    let code = quads("fn main(){ let x: i32; x = 5; let y = x + 1; }");
    assert!(displays(&code).contains(&"(ASSIGN, 5, x)".to_string()));
    assert_eq!(
        semantic_kind("fn main(){ let x: i32; x = 5; x = 6; }"),
        SemanticErrorKind::Mutability
    );
}

#[test]
fn borrows_release_on_scope_exit() {
    // The mutable borrow lives inside the block; afterwards x can be
    // borrowed again.
    let source = "fn main(){ let mut x = 1; { let r = &mut x; *r = 2; }; let s = &x; }";
    assert!(rsmc::compile_text(source, &TABLES).is_ok());
}

#[test]
fn rebinding_a_reference_releases_its_borrow() {
    let source =
        "fn main(){ let mut x = 1; let mut y = 2; let mut r = &mut x; r = &mut y; let s = &mut x; }";
    assert!(rsmc::compile_text(source, &TABLES).is_ok());
}

#[test]
fn if_expressions_require_compatible_arms() {
    let code = quads("fn main(){ let v = if 1 < 2 { 10 } else { 20 }; }");
    assert_labels_paired(&code);
    assert_eq!(
        semantic_kind("fn main(){ let v = if 1 < 2 { 10 } else { (1, 2) }; }"),
        SemanticErrorKind::Type
    );
}

#[test]
fn expression_block_bodies_return_their_value() {
    let code = quads("fn double(x: i32)->i32 { x * 2 } fn main(){ let y = double(21); }");
    let listing = displays(&code);
    assert!(listing.contains(&"(RETURN_VAL, t1, _, _)".to_string()));
}

#[test]
fn the_assembly_starts_with_the_standard_sections() {
    let text = assembly("fn main(){}");
    assert!(text.starts_with(".data\n"));
    assert!(text.contains(".globl __start"));
    assert!(text.contains("__start:\n    jal main"));
    assert!(text.contains("    li $v0, 10\n    syscall"));
}
