//! Closure-driven traversal of instruction trees.
//!
//! [`Instruction::for_all_ops`] and [`Instruction::for_all_insns`] walk a tree of nested
//! instructions, including the arguments of call descriptors. Visitors return an `i32`;
//! any non-zero value stops the walk and is returned to the caller unchanged.
//!
//! [`mop_visitor`] and [`minsn_visitor`] wrap plain closures so one-off walks need no
//! dedicated visitor type:
//!
//! ```rust
//! use hexsuite::mir::{factory, mop_visitor, Operand, Reg};
//!
//! let mut insn = factory::make_add(0, Reg::new(8, 4), (1u64, 4), Reg::new(0, 4));
//!
//! // replace every read of r8 with zero
//! let mut zero_r8 = mop_visitor(|op: &mut Operand, _, is_target: bool| {
//!     if !is_target && op.as_reg().map(|reg| reg.r) == Some(8) {
//!         *op = Operand::number(0, 4);
//!     }
//!     0
//! });
//! insn.for_all_ops(&mut zero_r8);
//! assert_eq!(insn.l.value(), Some(0));
//! ```

use crate::mir::{Instruction, Operand, TypeInfo};

/// Receives every operand of an instruction tree.
pub trait OperandVisitor {
    /// Visits one operand.
    ///
    /// `ty` is the declared type when the operand is a call argument. `is_target` is set for
    /// the destination of opcodes that write their result there.
    fn visit_operand(&mut self, op: &mut Operand, ty: Option<&TypeInfo>, is_target: bool) -> i32;
}

/// Receives every instruction of an instruction tree.
pub trait InsnVisitor {
    /// Visits one instruction.
    fn visit_insn(&mut self, insn: &mut Instruction) -> i32;
}

/// Operand visitor backed by a closure.
pub struct MopVisitor<F> {
    func: F,
}

impl<F> OperandVisitor for MopVisitor<F>
where
    F: FnMut(&mut Operand, Option<&TypeInfo>, bool) -> i32,
{
    fn visit_operand(&mut self, op: &mut Operand, ty: Option<&TypeInfo>, is_target: bool) -> i32 {
        (self.func)(op, ty, is_target)
    }
}

/// Wraps `func` into an [`OperandVisitor`].
pub fn mop_visitor<F>(func: F) -> MopVisitor<F>
where
    F: FnMut(&mut Operand, Option<&TypeInfo>, bool) -> i32,
{
    MopVisitor { func }
}

/// Instruction visitor backed by a closure.
pub struct MinsnVisitor<F> {
    func: F,
}

impl<F> InsnVisitor for MinsnVisitor<F>
where
    F: FnMut(&mut Instruction) -> i32,
{
    fn visit_insn(&mut self, insn: &mut Instruction) -> i32 {
        (self.func)(insn)
    }
}

/// Wraps `func` into an [`InsnVisitor`].
pub fn minsn_visitor<F>(func: F) -> MinsnVisitor<F>
where
    F: FnMut(&mut Instruction) -> i32,
{
    MinsnVisitor { func }
}

fn walk_operand(
    op: &mut Operand,
    ty: Option<&TypeInfo>,
    is_target: bool,
    visitor: &mut dyn OperandVisitor,
) -> i32 {
    if op.is_null() {
        return 0;
    }

    let code = visitor.visit_operand(op, ty, is_target);
    if code != 0 {
        return code;
    }

    match op {
        Operand::Insn(insn) => insn.for_all_ops(visitor),
        Operand::Call(info) => {
            for arg in &mut info.args {
                let code = walk_operand(&mut arg.op, Some(&arg.ty), false, visitor);
                if code != 0 {
                    return code;
                }
            }
            0
        }
        _ => 0,
    }
}

fn walk_nested_insns(op: &mut Operand, visitor: &mut dyn InsnVisitor) -> i32 {
    match op {
        Operand::Insn(insn) => insn.for_all_insns(visitor),
        Operand::Call(info) => {
            for arg in &mut info.args {
                let code = walk_nested_insns(&mut arg.op, visitor);
                if code != 0 {
                    return code;
                }
            }
            0
        }
        _ => 0,
    }
}

impl Instruction {
    /// Visits every non-empty operand in `l, r, d` order, descending into nested
    /// instructions and call arguments after visiting the operand that holds them.
    ///
    /// Returns the first non-zero visitor result, or 0.
    pub fn for_all_ops(&mut self, visitor: &mut dyn OperandVisitor) -> i32 {
        let writes_dest = self.opcode.writes_dest();
        for (op, is_target) in [
            (&mut self.l, false),
            (&mut self.r, false),
            (&mut self.d, writes_dest),
        ] {
            let code = walk_operand(op, None, is_target, visitor);
            if code != 0 {
                return code;
            }
        }
        0
    }

    /// Visits this instruction, then every nested instruction in `l, r, d` order.
    ///
    /// Returns the first non-zero visitor result, or 0.
    pub fn for_all_insns(&mut self, visitor: &mut dyn InsnVisitor) -> i32 {
        let code = visitor.visit_insn(self);
        if code != 0 {
            return code;
        }

        for op in [&mut self.l, &mut self.r, &mut self.d] {
            let code = walk_nested_insns(op, visitor);
            if code != 0 {
                return code;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{call_info, factory, CallArg, Opcode, Reg};

    fn sample() -> Instruction {
        // call !abs(xds(r8.1)) -> r0.4, then mov that into r16.4
        let ext = factory::make_xds(0, Reg::new(8, 1), Reg::new(24, 4));
        let info = call_info(
            TypeInfo::int(4),
            vec![CallArg::new(ext, TypeInfo::int(4), None)],
        );
        let call = factory::make_call(0, Operand::helper("abs"), info);
        factory::make_mov(0, call, Reg::new(16, 4))
    }

    #[test]
    fn test_operand_order_and_types() {
        let mut insn = sample();
        let mut seen = Vec::new();
        let mut visitor = mop_visitor(|op: &mut Operand, ty: Option<&TypeInfo>, target: bool| {
            seen.push((op.kind(), ty.cloned(), target));
            0
        });
        assert_eq!(insn.for_all_ops(&mut visitor), 0);

        let kinds: Vec<_> = seen.iter().map(|(kind, _, _)| kind.to_string()).collect();
        assert_eq!(
            kinds,
            ["Insn", "Helper", "Call", "Insn", "Reg", "Reg", "Reg"]
        );
        // the call argument carries its declared type
        assert_eq!(seen[3].1, Some(TypeInfo::int(4)));
        // only the outer mov destination is a write target
        assert!(seen[6].2);
        assert!(!seen[0].2);
    }

    #[test]
    fn test_operand_visitor_stops() {
        let mut insn = sample();
        let mut count = 0;
        let mut visitor = mop_visitor(|op: &mut Operand, _: Option<&TypeInfo>, _: bool| {
            count += 1;
            i32::from(op.is_helper()) * 7
        });
        assert_eq!(insn.for_all_ops(&mut visitor), 7);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_insn_order() {
        let mut insn = sample();
        let mut opcodes = Vec::new();
        let mut visitor = minsn_visitor(|insn: &mut Instruction| {
            opcodes.push(insn.opcode);
            0
        });
        insn.for_all_insns(&mut visitor);
        assert_eq!(opcodes, [Opcode::Mov, Opcode::Call, Opcode::Xds]);
    }

    #[test]
    fn test_insn_visitor_rewrites() {
        let mut insn = sample();
        let mut visitor = minsn_visitor(|insn: &mut Instruction| {
            if insn.opcode == Opcode::Xds {
                insn.opcode = Opcode::Xdu;
            }
            0
        });
        insn.for_all_insns(&mut visitor);

        let call = insn.l.as_insn().unwrap();
        let arg = &call.d.as_call().unwrap().args[0];
        assert_eq!(arg.op.as_insn().unwrap().opcode, Opcode::Xdu);
    }
}
