// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! Quadruples to MIPS (MARS/SPIM dialect). Each function gets a frame sized
//! by a conservative pre-scan of its quadruples; slots receive negative
//! `$fp` offsets lazily on first reference; `$t0..$t9` are a free list
//! acquired and released per quadruple.

use crate::error::BackendError;
use crate::ir::{OpCode, Operand, Quadruple};
use crate::semantic::symbol::FunctionSig;
use std::collections::{BTreeMap, BTreeSet};

const TEMP_REGS: [&str; 10] = [
    "$t0", "$t1", "$t2", "$t3", "$t4", "$t5", "$t6", "$t7", "$t8", "$t9",
];
const ARG_REGS: [&str; 4] = ["$a0", "$a1", "$a2", "$a3"];

#[derive(Debug, Default)]
pub struct CodeGenerator {
    lines: Vec<String>,
    free_regs: Vec<&'static str>,
    offsets: BTreeMap<String, i32>,
    /// Aggregate slots and their word counts (in-frame arrays, tuples, and
    /// aggregate values propagated through copies).
    aggregates: BTreeMap<String, u32>,
    /// Slots that hold the address of an aggregate rather than its words
    /// (aggregate parameters).
    address_slots: BTreeSet<String>,
    next_offset: i32,
    pending_params: Vec<Operand>,
    current_function: String,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(
        &mut self,
        quads: &[Quadruple],
        functions: &BTreeMap<String, FunctionSig>,
    ) -> Result<String, BackendError> {
        let mut partitions: Vec<(String, Vec<Quadruple>)> = Vec::new();
        for quad in quads {
            if quad.op == OpCode::FuncBegin {
                let name = quad
                    .arg1
                    .as_ref()
                    .expect("FUNC_BEGIN names its function")
                    .to_string();
                partitions.push((name, Vec::new()));
            }
            if let Some((_, body)) = partitions.last_mut() {
                body.push(quad.clone());
            }
        }
        if !partitions.iter().any(|(name, _)| name == "main") {
            return Err(BackendError::MissingMain);
        }

        self.lines = vec![
            ".data".to_string(),
            String::new(),
            ".text".to_string(),
            ".globl __start".to_string(),
            "__start:".to_string(),
            "    jal main".to_string(),
            "    li $v0, 10".to_string(),
            "    syscall".to_string(),
        ];

        for (name, body) in partitions.iter().filter(|(name, _)| name == "main") {
            self.emit_function(name, body, functions)?;
        }
        for (name, body) in partitions.iter().filter(|(name, _)| name != "main") {
            self.emit_function(name, body, functions)?;
        }

        let mut text = self.lines.join("\n");
        text.push('\n');
        Ok(text)
    }

    fn emit_function(
        &mut self,
        name: &str,
        quads: &[Quadruple],
        functions: &BTreeMap<String, FunctionSig>,
    ) -> Result<(), BackendError> {
        self.offsets.clear();
        self.aggregates.clear();
        self.address_slots.clear();
        self.next_offset = 0;
        self.pending_params.clear();
        self.free_regs = TEMP_REGS.iter().rev().cloned().collect();
        self.current_function = name.to_string();

        let params: Vec<_> = functions
            .get(name)
            .map(|sig| sig.params.clone())
            .unwrap_or_default();
        if params.len() > ARG_REGS.len() {
            return Err(BackendError::TooManyArguments {
                function: name.to_string(),
                count: params.len(),
            });
        }
        for param in &params {
            if param.ty.is_aggregate() {
                self.aggregates
                    .insert(param.name.clone(), param.ty.word_size());
                self.address_slots.insert(param.name.clone());
            }
        }

        let frame_size = self.scan_frame(quads, &params);

        self.emit(format!("\n{}:", name));
        self.emit("    addiu $sp, $sp, -8".to_string());
        self.emit("    sw $ra, 4($sp)".to_string());
        self.emit("    sw $fp, 0($sp)".to_string());
        self.emit("    move $fp, $sp".to_string());
        self.emit(format!("    addiu $sp, $sp, -{}", frame_size));
        for (index, param) in params.iter().enumerate() {
            let offset = self.slot_offset(&param.name);
            self.emit(format!("    sw {}, {}($fp)", ARG_REGS[index], offset));
        }

        for quad in quads {
            self.translate(quad)?;
        }
        Ok(())
    }

    /// Conservative frame sizing: every named slot gets a word, in-frame
    /// aggregates get their word count, and aggregate-ness propagates
    /// through copies. Rounded up to 16 bytes.
    fn scan_frame(&mut self, quads: &[Quadruple], params: &[crate::semantic::symbol::ParamSpec]) -> u32 {
        for quad in quads {
            if let OpCode::ArrayInit | OpCode::TupleInit = quad.op {
                let place = quad
                    .arg1
                    .as_ref()
                    .and_then(Operand::slot_name)
                    .expect("aggregate init names its slot");
                let words = match quad.arg2 {
                    Some(Operand::Const(n)) => n as u32,
                    _ => panic!("aggregate init carries its length"),
                };
                self.aggregates.insert(place, words);
            }
        }
        // An aggregate assigned to another slot makes that slot an
        // in-frame aggregate of the same size.
        let mut changed = true;
        while changed {
            changed = false;
            for quad in quads {
                if quad.op != OpCode::Assign {
                    continue;
                }
                let source = quad.arg1.as_ref().and_then(Operand::slot_name);
                let destination = quad.result.as_ref().and_then(Operand::slot_name);
                if let (Some(source), Some(destination)) = (source, destination) {
                    if let Some(&words) = self.aggregates.get(&source) {
                        if !self.aggregates.contains_key(&destination) {
                            self.aggregates.insert(destination, words);
                            changed = true;
                        }
                    }
                }
            }
        }

        let mut slots: BTreeSet<String> = params.iter().map(|p| p.name.clone()).collect();
        for quad in quads {
            for operand in self.slot_operands(quad) {
                if let Some(name) = operand.slot_name() {
                    slots.insert(name);
                }
            }
        }
        let mut bytes = 0u32;
        for slot in &slots {
            bytes += 4 * self.slot_words(slot);
        }
        (bytes + 15) / 16 * 16
    }

    /// Operand positions that denote frame slots for the given opcode.
    fn slot_operands<'q>(&self, quad: &'q Quadruple) -> Vec<&'q Operand> {
        let mut operands = Vec::new();
        match quad.op {
            OpCode::FuncBegin | OpCode::FuncEnd | OpCode::Label | OpCode::Jump => {}
            OpCode::Call => operands.extend(quad.result.iter()),
            OpCode::Param | OpCode::IfFalse | OpCode::IfTrue | OpCode::ReturnVal => {
                operands.extend(quad.arg1.iter())
            }
            _ => {
                operands.extend(quad.arg1.iter());
                operands.extend(quad.arg2.iter());
                operands.extend(quad.result.iter());
            }
        }
        operands
    }

    fn slot_words(&self, name: &str) -> u32 {
        if self.address_slots.contains(name) {
            1
        } else {
            self.aggregates.get(name).cloned().unwrap_or(1)
        }
    }

    fn slot_offset(&mut self, name: &str) -> i32 {
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }
        let words = self.slot_words(name);
        self.next_offset -= (words * 4) as i32;
        self.offsets.insert(name.to_string(), self.next_offset);
        self.next_offset
    }

    fn emit(&mut self, line: String) {
        self.lines.push(line);
    }

    fn acquire(&mut self) -> Result<&'static str, BackendError> {
        self.free_regs.pop().ok_or(BackendError::RegistersExhausted)
    }

    fn release(&mut self, reg: &'static str) {
        self.free_regs.push(reg);
        self.free_regs.sort_unstable_by(|a, b| b.cmp(a));
    }

    fn load_operand(&mut self, operand: &Operand, reg: &str) {
        match operand {
            Operand::Const(value) => self.emit(format!("    li {}, {}", reg, value)),
            other => {
                let name = other.slot_name().expect("operand denotes a slot");
                let offset = self.slot_offset(&name);
                self.emit(format!("    lw {}, {}($fp)", reg, offset));
            }
        }
    }

    /// The address of an aggregate or scalar slot. Aggregate parameter
    /// slots already hold an address, so they are loaded rather than
    /// computed.
    fn load_address(&mut self, name: &str, reg: &str) {
        let offset = self.slot_offset(name);
        if self.address_slots.contains(name) {
            self.emit(format!("    lw {}, {}($fp)", reg, offset));
        } else {
            self.emit(format!("    addiu {}, $fp, {}", reg, offset));
        }
    }

    /// Leaves the element address in `reg`; may consume a helper register
    /// for a runtime index.
    fn element_address(
        &mut self,
        base: &Operand,
        index: &Operand,
        reg: &'static str,
    ) -> Result<i32, BackendError> {
        let name = base.slot_name().expect("aggregate base denotes a slot");
        self.load_address(&name, reg);
        match index {
            Operand::Const(value) => Ok(value * 4),
            other => {
                let index_reg = self.acquire()?;
                self.load_operand(other, index_reg);
                self.emit(format!("    sll {}, {}, 2", index_reg, index_reg));
                self.emit(format!("    addu {}, {}, {}", reg, reg, index_reg));
                self.release(index_reg);
                Ok(0)
            }
        }
    }

    fn store_to_slot(&mut self, reg: &str, operand: &Operand) {
        let name = operand.slot_name().expect("destination denotes a slot");
        let offset = self.slot_offset(&name);
        self.emit(format!("    sw {}, {}($fp)", reg, offset));
    }

    fn translate(&mut self, quad: &Quadruple) -> Result<(), BackendError> {
        match quad.op {
            OpCode::FuncBegin => {} // the prologue already carries the label
            OpCode::FuncEnd => {
                self.emit(format!("{}_exit:", self.current_function));
                self.emit("    move $sp, $fp".to_string());
                self.emit("    lw $ra, 4($sp)".to_string());
                self.emit("    lw $fp, 0($sp)".to_string());
                self.emit("    addiu $sp, $sp, 8".to_string());
                self.emit("    jr $ra".to_string());
            }
            OpCode::Assign => {
                let source = quad.arg1.as_ref().expect("ASSIGN has a source");
                let destination = quad.result.as_ref().expect("ASSIGN has a destination");
                let aggregate = source
                    .slot_name()
                    .map(|name| self.aggregates.contains_key(&name))
                    .unwrap_or(false);
                if aggregate {
                    let words = self.aggregates[&source.slot_name().unwrap()];
                    let source_reg = self.acquire()?;
                    let dest_reg = self.acquire()?;
                    let value_reg = self.acquire()?;
                    self.load_address(&source.slot_name().unwrap(), source_reg);
                    self.load_address(&destination.slot_name().unwrap(), dest_reg);
                    for word in 0..words {
                        self.emit(format!("    lw {}, {}({})", value_reg, word * 4, source_reg));
                        self.emit(format!("    sw {}, {}({})", value_reg, word * 4, dest_reg));
                    }
                    self.release(value_reg);
                    self.release(dest_reg);
                    self.release(source_reg);
                } else {
                    let reg = self.acquire()?;
                    self.load_operand(source, reg);
                    self.store_to_slot(reg, destination);
                    self.release(reg);
                }
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                let left = self.acquire()?;
                let right = self.acquire()?;
                self.load_operand(quad.arg1.as_ref().expect("binary op has operands"), left);
                self.load_operand(quad.arg2.as_ref().expect("binary op has operands"), right);
                match quad.op {
                    OpCode::Add => self.emit(format!("    addu {}, {}, {}", left, left, right)),
                    OpCode::Sub => self.emit(format!("    subu {}, {}, {}", left, left, right)),
                    OpCode::Mul => self.emit(format!("    mul {}, {}, {}", left, left, right)),
                    OpCode::Div => {
                        self.emit(format!("    div {}, {}", left, right));
                        self.emit(format!("    mflo {}", left));
                    }
                    _ => unreachable!(),
                }
                self.store_to_slot(left, quad.result.as_ref().expect("binary op has a result"));
                self.release(right);
                self.release(left);
            }
            OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge | OpCode::Eq | OpCode::Ne => {
                let left = self.acquire()?;
                let right = self.acquire()?;
                self.load_operand(quad.arg1.as_ref().expect("comparison has operands"), left);
                self.load_operand(quad.arg2.as_ref().expect("comparison has operands"), right);
                let mnemonic = match quad.op {
                    OpCode::Lt => "slt",
                    OpCode::Le => "sle",
                    OpCode::Gt => "sgt",
                    OpCode::Ge => "sge",
                    OpCode::Eq => "seq",
                    OpCode::Ne => "sne",
                    _ => unreachable!(),
                };
                self.emit(format!("    {} {}, {}, {}", mnemonic, left, left, right));
                self.store_to_slot(left, quad.result.as_ref().expect("comparison has a result"));
                self.release(right);
                self.release(left);
            }
            OpCode::Label => {
                let label = quad.result.as_ref().expect("LABEL names its label");
                self.emit(format!("{}:", label));
            }
            OpCode::Jump => {
                let label = quad.result.as_ref().expect("JUMP names its target");
                self.emit(format!("    j {}", label));
            }
            OpCode::IfFalse | OpCode::IfTrue => {
                let reg = self.acquire()?;
                self.load_operand(quad.arg1.as_ref().expect("branch has a condition"), reg);
                let label = quad.result.as_ref().expect("branch names its target");
                let mnemonic = if quad.op == OpCode::IfFalse { "beqz" } else { "bnez" };
                self.emit(format!("    {} {}, {}", mnemonic, reg, label));
                self.release(reg);
            }
            OpCode::Param => {
                let operand = quad.arg1.as_ref().expect("PARAM carries its argument");
                self.pending_params.push(operand.clone());
            }
            OpCode::Call => {
                let callee = quad
                    .arg1
                    .as_ref()
                    .expect("CALL names its function")
                    .to_string();
                if self.pending_params.len() > ARG_REGS.len() {
                    let count = self.pending_params.len();
                    self.pending_params.clear();
                    return Err(BackendError::TooManyArguments {
                        function: callee,
                        count,
                    });
                }
                let params = std::mem::take(&mut self.pending_params);
                for (index, operand) in params.iter().enumerate() {
                    let reg = ARG_REGS[index];
                    match operand.slot_name() {
                        Some(name) if self.aggregates.contains_key(&name) => {
                            // Aggregates pass by reference.
                            self.load_address(&name, reg);
                        }
                        _ => self.load_operand(operand, reg),
                    }
                }
                self.emit(format!("    jal {}", callee));
                if let Some(result) = &quad.result {
                    let result = result.clone();
                    self.store_to_slot("$v0", &result);
                }
            }
            OpCode::Return => {
                self.emit(format!("    j {}_exit", self.current_function));
            }
            OpCode::ReturnVal => {
                self.load_operand(quad.arg1.as_ref().expect("RETURN_VAL carries a value"), "$v0");
                self.emit(format!("    j {}_exit", self.current_function));
            }
            OpCode::Ref => {
                let target = quad
                    .arg1
                    .as_ref()
                    .and_then(Operand::slot_name)
                    .expect("REF names its target");
                let reg = self.acquire()?;
                self.load_address(&target, reg);
                self.store_to_slot(reg, quad.result.as_ref().expect("REF has a result"));
                self.release(reg);
            }
            OpCode::DerefLoad => {
                let pointer = self.acquire()?;
                let value = self.acquire()?;
                self.load_operand(quad.arg1.as_ref().expect("DEREF_LOAD has a pointer"), pointer);
                self.emit(format!("    lw {}, 0({})", value, pointer));
                self.store_to_slot(value, quad.result.as_ref().expect("DEREF_LOAD has a result"));
                self.release(value);
                self.release(pointer);
            }
            OpCode::DerefStore => {
                let pointer = self.acquire()?;
                let value = self.acquire()?;
                self.load_operand(quad.arg1.as_ref().expect("DEREF_STORE has a pointer"), pointer);
                self.load_operand(quad.arg2.as_ref().expect("DEREF_STORE has a value"), value);
                self.emit(format!("    sw {}, 0({})", value, pointer));
                self.release(value);
                self.release(pointer);
            }
            OpCode::ArrayInit | OpCode::TupleInit => {
                // Reserve the slot; no runtime code.
                let place = quad
                    .arg1
                    .as_ref()
                    .and_then(Operand::slot_name)
                    .expect("aggregate init names its slot");
                self.slot_offset(&place);
            }
            OpCode::ArraySet | OpCode::TupleSet => {
                let base = quad.arg1.as_ref().expect("aggregate set has a base");
                let index = quad.arg2.as_ref().expect("aggregate set has an index");
                let address = self.acquire()?;
                let displacement = self.element_address(base, index, address)?;
                let value = self.acquire()?;
                self.load_operand(quad.result.as_ref().expect("aggregate set has a value"), value);
                self.emit(format!("    sw {}, {}({})", value, displacement, address));
                self.release(value);
                self.release(address);
            }
            OpCode::ArrayLoad => {
                let base = quad.arg1.as_ref().expect("ARRAY_LOAD has a base");
                let index = quad.arg2.as_ref().expect("ARRAY_LOAD has an index");
                let address = self.acquire()?;
                let displacement = self.element_address(base, index, address)?;
                let value = self.acquire()?;
                self.emit(format!("    lw {}, {}({})", value, displacement, address));
                self.store_to_slot(value, quad.result.as_ref().expect("ARRAY_LOAD has a result"));
                self.release(value);
                self.release(address);
            }
            OpCode::ArrayStore => {
                let base = quad.arg1.as_ref().expect("ARRAY_STORE has a base");
                let index = quad.arg2.as_ref().expect("ARRAY_STORE has an index");
                let address = self.acquire()?;
                let displacement = self.element_address(base, index, address)?;
                let value = self.acquire()?;
                self.load_operand(quad.result.as_ref().expect("ARRAY_STORE has a value"), value);
                self.emit(format!("    sw {}, {}({})", value, displacement, address));
                self.release(value);
                self.release(address);
            }
        }
        Ok(())
    }
}
