//! Integration tests for operand and instruction construction.
//!
//! Every opcode factory is checked against the catalog, and operand ownership is checked on
//! nested instruction trees.

use hexsuite::prelude::*;
use strum::IntoEnumIterator;

/// Builds `opcode` with a distinct register in every slot its shape uses.
fn build(opcode: Opcode) -> Instruction {
    let shape = opcode.shape();
    let slot = |used: bool, r: i32| {
        if used {
            Operand::from(Reg::new(r, 4))
        } else {
            Operand::Null
        }
    };
    factory::minsn(
        0x1000,
        opcode,
        slot(shape.has_left(), 8),
        slot(shape.has_right(), 16),
        slot(shape.has_dest(), 24),
    )
}

#[test]
fn test_every_opcode_has_a_consistent_shape() {
    let mut count = 0;
    for opcode in Opcode::iter() {
        let insn = build(opcode);
        let shape = opcode.shape();

        assert_eq!(insn.opcode, opcode);
        assert!(insn.matches_shape(), "{opcode}");
        assert_eq!(insn.l.is_null(), !shape.has_left(), "{opcode}");
        assert_eq!(insn.r.is_null(), !shape.has_right(), "{opcode}");
        assert_eq!(insn.d.is_null(), !shape.has_dest(), "{opcode}");
        count += 1;
    }
    assert_eq!(count, hexsuite::mir::OPCODE_COUNT);
}

#[test]
fn test_factories_fill_declared_slots() {
    let add = factory::make_add(0x10, (2u64, 4), (3u64, 4), Reg::new(0, 4));
    assert_eq!(add.opcode, Opcode::Add);
    assert_eq!(add.l, Operand::number(2, 4));
    assert_eq!(add.r, Operand::number(3, 4));
    assert_eq!(add.d, Operand::reg(Reg::new(0, 4)));

    let goto = factory::make_goto(0x14, BlockId(3));
    assert_eq!(goto.l, Operand::block(3));
    assert!(goto.r.is_null() && goto.d.is_null());

    let pop = factory::make_pop(0x18, Reg::new(8, 8));
    assert!(pop.l.is_null() && pop.r.is_null());
    assert_eq!(pop.d.as_reg(), Some(Reg::new(8, 8)));

    let ijmp = factory::make_ijmp(0x1c, Reg::new(0, 2), Reg::new(8, 8));
    assert!(ijmp.l.is_null());
    assert_eq!(ijmp.opcode.shape(), Shape::RightDest);

    let ret = factory::make_ret(0x20);
    assert!(ret.operands().iter().all(|op| op.is_null()));
}

#[test]
fn test_immediates_are_unsigned_and_masked() {
    assert_eq!(Operand::number(42, 4).value(), Some(42));
    assert_eq!(Operand::signed(42, 4).value(), Some(42));
    assert_eq!(Operand::signed(-1, 4).value(), Some(0xFFFF_FFFF));
    assert_eq!(Operand::signed(-1, 4).signed_value(), Some(-1));
    assert_eq!(Operand::number(0x1_0000_00FF, 1).value(), Some(0xFF));
}

#[test]
fn test_float_immediates() {
    let single = Operand::float(1.5);
    assert_eq!(single.size(), 4);
    assert_eq!(single.fp_value(), Some(1.5));

    let double = Operand::fp_from_bytes(&2.25f64.to_le_bytes()).unwrap();
    assert_eq!(double.size(), 8);
    assert_eq!(double.fp_value(), Some(2.25));

    assert!(matches!(Operand::fp_from_bytes(&[0; 2]), Err(Error::FloatWidth(2))));
}

#[test]
fn test_move_leaves_null_and_clone_is_deep() {
    let inner = factory::make_xdu(0x10, Reg::new(8, 1), Reg::new(16, 4));
    let mut outer = factory::make_add(0x10, inner, (1u64, 4), Reg::new(0, 4));

    let mut copy = outer.clone();
    copy.l
        .as_insn_mut()
        .expect("nested instruction")
        .opcode = Opcode::Xds;
    assert_eq!(outer.l.as_insn().map(|insn| insn.opcode), Some(Opcode::Xdu));

    let moved = outer.l.take();
    assert!(outer.l.is_null());
    assert_eq!(moved.kind(), OperandKind::Insn);
    assert_eq!(outer.tree_size(), 1);
    assert_eq!(copy.tree_size(), 2);
}

#[test]
fn test_display() {
    let insn = factory::make_add(0x10, (2u64, 4), Reg::new(8, 4), Reg::new(0, 4));
    assert_eq!(insn.to_string(), "add #0x2.4, r8.4, r0.4");
    assert_eq!(factory::make_ret(0).to_string(), "ret");
    assert_eq!(
        factory::make_call(0, Helper("memset"), Operand::Null).to_string(),
        "call !memset, _"
    );
}

#[test]
fn test_conditions_follow_the_predicate_table() {
    assert_eq!(Opcode::Jl.condition(), Some(Condition::L));
    assert_eq!(Opcode::Jl.negate_condition(), Some(Opcode::Jge));
    assert_eq!(Opcode::Setb.negate_condition(), Some(Opcode::Setae));
    assert_eq!(Opcode::Add.condition(), None);

    // signed compare of -1 < 1 at four bytes
    let minus_one = 0xFFFF_FFFF;
    assert!(Condition::L.compare(minus_one, 1, 4));
    assert!(!Condition::B.compare(minus_one, 1, 4));
    assert!(Condition::A.compare(minus_one, 1, 4));
    assert!(Condition::Z.compare(7, 7, 4));
}

#[test]
fn test_operand_visitor_reaches_nested_slots() {
    let inner = factory::make_mul(0, Reg::new(8, 4), (4u64, 4), Operand::Null);
    let mut insn = factory::make_add(0, inner, Reg::new(16, 4), Reg::new(0, 4));

    let mut regs = Vec::new();
    let mut targets = Vec::new();
    insn.for_all_ops(&mut mop_visitor(|op: &mut Operand, _: Option<&TypeInfo>, is_target| {
        if let Some(reg) = op.as_reg() {
            regs.push(reg.r);
            if is_target {
                targets.push(reg.r);
            }
        }
        0
    }));

    regs.sort_unstable();
    assert_eq!(regs, [0, 8, 16]);
    assert_eq!(targets, [0]);
}

#[test]
fn test_physical_registers() {
    assert_eq!(Reg::phys(1, 8), Reg::new(8, 8));
    assert_eq!(Reg::phys(0, 4).r, 0);
}
