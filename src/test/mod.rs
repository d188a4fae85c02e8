//! Fixtures shared by the unit tests.

use crate::{
    host::{LocalBlock, LocalFunction},
    mir::{factory, FrameId, Instruction, Reg},
};

/// A lone block with serial 0 holding `insns`.
pub fn block_with(insns: Vec<Instruction>) -> LocalBlock {
    let mut blk = LocalBlock::new(0, 0x1000);
    blk.insns = insns;
    blk
}

/// Four blocks `0 -> {1, 2} -> 3`; block 3 returns.
pub fn diamond() -> LocalFunction {
    let mut func = LocalFunction::new(0x1000, FrameId(0));
    for start in [0x1000, 0x1010, 0x1020, 0x1030] {
        func.add_block(start);
    }
    func.link(0, 1);
    func.link(0, 2);
    func.link(1, 3);
    func.link(2, 3);
    func.blocks[3].push(factory::make_ret(0x1030));
    func
}

/// `mov #value.4, r<reg>.4` at `ea`.
pub fn mov_imm(ea: u64, value: u64, reg: i32) -> Instruction {
    factory::make_mov(ea, (value, 4), Reg::new(reg, 4))
}
