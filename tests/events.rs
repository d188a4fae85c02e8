//! Integration tests for typed event dispatch through the reference host.

use std::{cell::RefCell, rc::Rc};

use hexsuite::{host::HostEventKind, prelude::*};
use strum::IntoEnumIterator;

#[test]
fn test_build_callinfo_hands_descriptor_to_host() {
    let host = LocalHost::new();
    let mut builder = EventDispatcher::on_build_callinfo(
        &host,
        |_: &mut dyn MicroBlock, ty: &TypeInfo, slot: &mut Option<Box<CallInfo>>| {
            if !ty.is_void() {
                return 0;
            }
            let args = vec![
                CallArg::new(Reg::new(0, 8), TypeInfo::uint(8), None),
                CallArg::new((1u64, 4), TypeInfo::int(4), None),
            ];
            *slot = Some(call_info(TypeInfo::Void, args));
            1
        },
    );
    builder.install();

    let mut blk = LocalBlock::new(0, 0x1000);
    let mut slot = None;
    let result = host.dispatch(
        EventKind::BuildCallinfo,
        &mut [
            RawArg::Block(&mut blk),
            RawArg::Type(&TypeInfo::Void),
            RawArg::CallSlot(&mut slot),
        ],
    );

    assert_eq!(result, 1);
    let info = slot.expect("descriptor");
    assert_eq!(info.args.len(), 2);
    assert_eq!(info.args[0].op.as_reg(), Some(Reg::new(0, 8)));
    assert_eq!(info.args[1].op.value(), Some(1));
    assert_eq!(info.return_size(), 0);
    assert_eq!(info.cc, CallConv::Fastcall);
    assert!(info.flags.contains(CallFlags::FINAL));
}

#[test]
fn test_combine_may_rewrite_the_instruction() {
    let host = LocalHost::new();
    let mut combine =
        EventDispatcher::on_combine(&host, |_: &mut dyn MicroBlock, insn: &mut Instruction| {
            if insn.opcode != Opcode::Xor || insn.l != insn.r {
                return 0;
            }
            let d = insn.d.take();
            let size = d.size();
            *insn = factory::make_mov(insn.ea, Operand::number(0, size), d);
            1
        });
    combine.install();

    let mut blk = LocalBlock::new(0, 0x1000);
    let mut insn = factory::make_xor(0x1000, Reg::new(8, 4), Reg::new(8, 4), Reg::new(8, 4));
    let result = host.dispatch(
        EventKind::Combine,
        &mut [RawArg::Block(&mut blk), RawArg::Insn(&mut insn)],
    );

    assert_eq!(result, 1);
    assert_eq!(insn.to_string(), "mov #0x0.4, r8.4");
}

#[test]
fn test_function_events_reach_only_their_listener() {
    let host = LocalHost::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let mut listeners: Vec<EventDispatcher<'_>> = FunctionEvent::iter()
        .map(|event| {
            let sink = seen.clone();
            EventDispatcher::on_function(&host, event, move |func: &mut dyn MicroFunction| {
                sink.borrow_mut().push((event, func.entry_ea()));
                0
            })
        })
        .collect();
    for listener in &mut listeners {
        listener.install();
    }
    assert_eq!(host.registered(Subsystem::EventCallback), 6);

    let mut func = LocalFunction::new(0x4000, FrameId(0));
    host.dispatch(EventKind::Glbopt, &mut [RawArg::Function(&mut func)]);
    host.dispatch(EventKind::Prealloc, &mut [RawArg::Function(&mut func)]);

    assert_eq!(
        *seen.borrow(),
        [(FunctionEvent::Glbopt, 0x4000), (FunctionEvent::Prealloc, 0x4000)]
    );
}

#[test]
fn test_malformed_arguments_are_neutral() {
    let host = LocalHost::new();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let mut on_maturity =
        EventDispatcher::on_maturity(&host, move |_: &mut dyn MicroFunction, _: Maturity| {
            *counter.borrow_mut() += 1;
            7
        });
    on_maturity.install();

    let mut func = LocalFunction::new(0, FrameId(0));
    // missing level
    assert_eq!(
        host.dispatch(EventKind::Maturity, &mut [RawArg::Function(&mut func)]),
        0
    );
    // level out of range
    assert_eq!(
        host.dispatch(
            EventKind::Maturity,
            &mut [RawArg::Function(&mut func), RawArg::Int(99)]
        ),
        0
    );
    assert_eq!(*calls.borrow(), 0);

    assert_eq!(
        host.dispatch(
            EventKind::Maturity,
            &mut [RawArg::Function(&mut func), RawArg::Int(8)]
        ),
        7
    );
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(host.log().count(HostEventKind::Invoked), 3);
}

#[test]
fn test_dropping_a_dispatcher_removes_it() {
    let host = LocalHost::new();
    {
        let mut on_error = EventDispatcher::on_interr(&host, |_| 1);
        on_error.install();
        assert_eq!(host.dispatch(EventKind::Interr, &mut [RawArg::Int(1)]), 1);
    }

    assert_eq!(host.registered(Subsystem::EventCallback), 0);
    assert_eq!(host.dispatch(EventKind::Interr, &mut [RawArg::Int(1)]), 0);
    assert_eq!(host.log().count(HostEventKind::Deregistered), 1);
}
