//! Microcode instructions.

use std::fmt;

use crate::mir::{Ea, Opcode, Operand};

/// A three-address microcode instruction.
///
/// Every instruction has exactly three operand slots. Which of them are meaningful is decided
/// by the opcode's [`Shape`](crate::mir::Shape); unused slots hold [`Operand::Null`]. The
/// shape is enforced by the `make_*` factories in [`crate::mir::factory`], not by this
/// struct, so in-place rewriting passes are free to change the opcode and slots directly.
///
/// Wrapping an instruction into [`Operand::Insn`] moves it into the operand, which then owns
/// the nested tree exclusively.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Address of the native instruction this was generated from
    pub ea: Ea,
    /// The operation
    pub opcode: Opcode,
    /// Left operand
    pub l: Operand,
    /// Right operand
    pub r: Operand,
    /// Destination operand
    pub d: Operand,
}

impl Instruction {
    /// Creates an instruction with all three slots empty.
    #[must_use]
    pub fn new(ea: Ea, opcode: Opcode) -> Self {
        Self {
            ea,
            opcode,
            l: Operand::Null,
            r: Operand::Null,
            d: Operand::Null,
        }
    }

    /// Creates an instruction from explicit slot values, taking ownership of each.
    ///
    /// No shape check is made; slots outside the opcode's shape are stored as given.
    #[must_use]
    pub fn with_operands(
        ea: Ea,
        opcode: Opcode,
        l: impl Into<Operand>,
        r: impl Into<Operand>,
        d: impl Into<Operand>,
    ) -> Self {
        Self {
            ea,
            opcode,
            l: l.into(),
            r: r.into(),
            d: d.into(),
        }
    }

    /// Returns the three slots in `l, r, d` order.
    #[must_use]
    pub fn operands(&self) -> [&Operand; 3] {
        [&self.l, &self.r, &self.d]
    }

    /// Returns `true` if every slot outside the opcode's shape is empty.
    #[must_use]
    pub fn matches_shape(&self) -> bool {
        let shape = self.opcode.shape();
        (shape.has_left() || self.l.is_null())
            && (shape.has_right() || self.r.is_null())
            && (shape.has_dest() || self.d.is_null())
    }

    /// Turns the instruction into a `nop`, dropping its operands.
    pub fn make_nop(&mut self) {
        self.opcode = Opcode::Nop;
        self.l = Operand::Null;
        self.r = Operand::Null;
        self.d = Operand::Null;
    }

    /// Swaps the left and right operands.
    pub fn swap_operands(&mut self) {
        std::mem::swap(&mut self.l, &mut self.r);
    }

    /// Number of instructions in this tree, including nested instruction results.
    #[must_use]
    pub fn tree_size(&self) -> usize {
        1 + self
            .operands()
            .into_iter()
            .filter_map(Operand::as_insn)
            .map(Instruction::tree_size)
            .sum::<usize>()
    }
}

// mnemonic followed by the slots of the opcode's shape
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        let shape = self.opcode.shape();
        let slots = [
            (shape.has_left(), &self.l),
            (shape.has_right(), &self.r),
            (shape.has_dest(), &self.d),
        ];

        let mut first = true;
        for (_, operand) in slots.iter().filter(|(used, _)| *used) {
            f.write_str(if first { " " } else { ", " })?;
            write!(f, "{operand}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{factory, Reg};

    #[test]
    fn test_new_is_empty() {
        let insn = Instruction::new(0x401000, Opcode::Ret);
        assert_eq!(insn.ea, 0x401000);
        assert!(insn.operands().iter().all(|op| op.is_null()));
        assert!(insn.matches_shape());
    }

    #[test]
    fn test_matches_shape() {
        let mut insn = factory::make_goto(0, Operand::block(2));
        assert!(insn.matches_shape());
        insn.d = Operand::block(3);
        assert!(!insn.matches_shape());
    }

    #[test]
    fn test_make_nop_and_swap() {
        let mut insn = factory::make_sub(0, (5u64, 4), Reg::new(8, 4), Reg::new(0, 4));
        insn.swap_operands();
        assert_eq!(insn.r.value(), Some(5));
        assert_eq!(insn.l.as_reg(), Some(Reg::new(8, 4)));

        insn.make_nop();
        assert_eq!(insn.opcode, Opcode::Nop);
        assert!(insn.d.is_null());
    }

    #[test]
    fn test_tree_size() {
        let inner = factory::make_xdu(0, Reg::new(0, 1), Reg::new(8, 4));
        let outer = factory::make_add(0, inner, (1u64, 4), Reg::new(16, 4));
        assert_eq!(outer.tree_size(), 2);
    }

    #[test]
    fn test_display() {
        let insn = factory::make_add(0, (2u64, 4), (3u64, 4), Reg::new(0, 4));
        assert_eq!(insn.to_string(), "add #0x2.4, #0x3.4, r0.4");

        let ret = factory::make_ret(0);
        assert_eq!(ret.to_string(), "ret");

        let ijmp = factory::make_ijmp(0, Reg::new(8, 2), Reg::new(16, 8));
        assert_eq!(ijmp.to_string(), "ijmp r8.2, r16.8");
    }
}
