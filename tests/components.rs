//! Integration tests for the component lifecycle against the reference host.

use std::{cell::RefCell, rc::Rc};

use hexsuite::{host::HostEventKind, prelude::*};

fn noop_block(host: &LocalHost) -> BlockOptimizer<'_> {
    BlockOptimizer::new(host, |_: &mut dyn MicroBlock| 0)
}

#[test]
fn test_install_twice_registers_once() {
    let host = LocalHost::new();
    let mut opt = InsnOptimizer::new(&host, |_: &mut dyn MicroBlock, _: &mut Instruction, _| 0);

    opt.install();
    opt.install();
    assert_eq!(host.registered(Subsystem::InsnOptimizer), 1);
    assert_eq!(host.log().count(HostEventKind::Registered), 1);

    opt.uninstall();
    opt.uninstall();
    assert_eq!(host.log().count(HostEventKind::Deregistered), 1);
}

#[test]
fn test_list_deregisters_each_member_once() {
    let host = LocalHost::new();
    let mut a = noop_block(&host);
    let mut b = noop_block(&host);
    let mut c = MicrocodeFilter::new(&host, |_: &mut dyn Codegen| false);

    {
        let mut list = ComponentList::new(
            vec![
                &mut a as &mut dyn Component,
                &mut b as &mut dyn Component,
                &mut c as &mut dyn Component,
            ],
            false,
        );
        list.install();
        list.install();
        list.uninstall();
        list.uninstall();
        assert_eq!(list.len(), 3);
    }

    let log = host.log();
    assert_eq!(log.count(HostEventKind::Registered), 3);
    assert_eq!(log.count(HostEventKind::Deregistered), 3);

    let order: Vec<Subsystem> = log
        .filter_kind(HostEventKind::Deregistered)
        .map(|event| event.subsystem)
        .collect();
    assert_eq!(
        order,
        [
            Subsystem::BlockOptimizer,
            Subsystem::BlockOptimizer,
            Subsystem::MicrocodeFilter
        ]
    );
    assert!(!a.is_installed() && !b.is_installed() && !c.is_installed());
}

#[test]
fn test_pipeline_runs_insn_then_block_passes() {
    let host = LocalHost::new();
    let trace = Rc::new(RefCell::new(Vec::new()));

    let insn_trace = trace.clone();
    let mut insn = InsnOptimizer::new(
        &host,
        move |_: &mut dyn MicroBlock, insn: &mut Instruction, _: OptFlags| {
            insn_trace.borrow_mut().push(format!("insn {}", insn.opcode));
            0
        },
    );
    let block_trace = trace.clone();
    let mut block = BlockOptimizer::new(&host, move |blk: &mut dyn MicroBlock| {
        block_trace.borrow_mut().push(format!("block {}", blk.serial()));
        0
    });

    let mut list = ComponentList::new(
        vec![&mut insn as &mut dyn Component, &mut block as &mut dyn Component],
        false,
    );
    list.install();

    let mut func = LocalFunction::new(0x1000, FrameId(0));
    func.add_block(0x1000);
    func.blocks[0].push(factory::make_nop(0x1000));
    func.blocks[0].push(factory::make_ret(0x1001));
    host.optimize_function(&mut func, OptFlags::default());

    assert_eq!(*trace.borrow(), ["insn nop", "insn ret", "block 0"]);
}

#[test]
fn test_block_pass_can_insert_instructions() {
    let host = LocalHost::new();
    let mut terminate = BlockOptimizer::new(&host, |blk: &mut dyn MicroBlock| {
        let ends_in_ret = blk.insns().last().map(|insn| insn.opcode) == Some(Opcode::Ret);
        if ends_in_ret {
            return 0;
        }
        let ea = blk.start();
        blk.insns_mut().push(factory::make_ret(ea));
        1
    });
    terminate.install();

    let mut func = LocalFunction::new(0x2000, FrameId(0));
    func.add_block(0x2000);
    func.add_block(0x2010);
    func.blocks[1].push(factory::make_ret(0x2010));

    assert_eq!(host.optimize_function(&mut func, OptFlags::empty()), 1);
    assert_eq!(func.blocks[0].insns.len(), 1);
    assert_eq!(func.blocks[1].insns.len(), 1);
}

#[test]
fn test_dispatchers_for_other_kinds_stay_neutral() {
    let host = LocalHost::new();
    let calls = Rc::new(RefCell::new(0));
    let seen = calls.clone();
    let mut on_maturity =
        EventDispatcher::on_maturity(&host, move |_: &mut dyn MicroFunction, _: Maturity| {
            *seen.borrow_mut() += 1;
            3
        });
    on_maturity.install();

    let mut func = LocalFunction::new(0, FrameId(0));
    assert_eq!(
        host.dispatch(EventKind::CallsDone, &mut [RawArg::Function(&mut func)]),
        0
    );
    assert_eq!(*calls.borrow(), 0);

    assert_eq!(
        host.dispatch(
            EventKind::Maturity,
            &mut [RawArg::Function(&mut func), RawArg::Int(5)]
        ),
        3
    );
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_refused_components_report_through_the_host() {
    let host = LocalHost::with_config(LocalHostConfig::strict(1));
    let mut first = noop_block(&host);
    let mut second = noop_block(&host);

    first.install();
    second.install();
    assert!(first.is_installed());
    assert!(!second.is_installed());
    assert_eq!(host.log().count_in(Subsystem::BlockOptimizer, HostEventKind::Refused), 1);
    assert_eq!(host.log().summary(), "1 registered, 1 refused");
}

#[test]
fn test_insn_pass_edits_survive_the_sweep() {
    let host = LocalHost::new();
    let mut guard = InsnOptimizer::new(
        &host,
        |blk: &mut dyn MicroBlock, insn: &mut Instruction, _: OptFlags| {
            if insn.opcode != Opcode::Ret {
                return 0;
            }
            let at = blk.len() - 1;
            blk.insns_mut()
                .insert(at, factory::make_und(insn.ea, Reg::new(0, 4)));
            1
        },
    );
    guard.install();

    let mut func = LocalFunction::new(0x1000, FrameId(0));
    func.add_block(0x1000);
    func.blocks[0].push(factory::make_mov(0x1000, (1u64, 4), Reg::new(0, 4)));
    func.blocks[0].push(factory::make_ret(0x1004));

    assert_eq!(host.optimize_function(&mut func, OptFlags::default()), 1);
    let listing: Vec<String> = func.blocks[0].insns.iter().map(ToString::to_string).collect();
    assert_eq!(listing, ["mov #0x1.4, r0.4", "und r0.4", "ret"]);
}
