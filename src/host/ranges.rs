//! Iterator adapters over host storage.

use crate::{
    host::{MicroBlock, MicroFunction, NamedTypeFlags, TypeLibrary},
    mir::Instruction,
};

/// The successors of `blk`, resolved through `func`.
///
/// Serials that `func` does not know are skipped.
pub fn successors<'a>(
    func: &'a dyn MicroFunction,
    blk: &'a dyn MicroBlock,
) -> impl Iterator<Item = &'a dyn MicroBlock> + 'a {
    blk.successors()
        .iter()
        .filter_map(move |&serial| func.block(serial))
}

/// The predecessors of `blk`, resolved through `func`.
///
/// Serials that `func` does not know are skipped.
pub fn predecessors<'a>(
    func: &'a dyn MicroFunction,
    blk: &'a dyn MicroBlock,
) -> impl Iterator<Item = &'a dyn MicroBlock> + 'a {
    blk.predecessors()
        .iter()
        .filter_map(move |&serial| func.block(serial))
}

/// The instructions of `blk`, in execution order.
pub fn instructions(blk: &dyn MicroBlock) -> std::slice::Iter<'_, Instruction> {
    blk.insns().iter()
}

/// Every block of `func`, in serial order.
pub fn basic_blocks<'a>(func: &'a dyn MicroFunction) -> impl Iterator<Item = &'a dyn MicroBlock> + 'a {
    (0..func.block_count())
        .filter_map(|serial| u32::try_from(serial).ok())
        .filter_map(move |serial| func.block(serial))
}

/// Iterates the names of a type library namespace.
///
/// Created by [`named_types`].
pub struct NamedTypes<'a> {
    library: &'a dyn TypeLibrary,
    flags: NamedTypeFlags,
    at: Option<&'a str>,
    started: bool,
}

impl<'a> Iterator for NamedTypes<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let next = if self.started {
            self.library.next_named_type(self.at?, self.flags)
        } else {
            self.started = true;
            self.library.first_named_type(self.flags)
        };
        self.at = next;
        next
    }
}

/// The names in `library` selected by `flags`, in library order.
///
/// [`NamedTypeFlags::default`] selects the type namespace.
pub fn named_types(library: &dyn TypeLibrary, flags: NamedTypeFlags) -> NamedTypes<'_> {
    NamedTypes {
        library,
        flags,
        at: None,
        started: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::LocalTypeLibrary,
        mir::{Opcode, TypeInfo},
        test::diamond,
    };

    #[test]
    fn test_successors_and_predecessors() {
        let func = diamond();
        let entry = func.block(0).unwrap();
        let exit = func.block(3).unwrap();

        let succs: Vec<u32> = successors(&func, entry).map(|blk| blk.serial()).collect();
        assert_eq!(succs, [1, 2]);

        let preds: Vec<u32> = predecessors(&func, exit).map(|blk| blk.serial()).collect();
        assert_eq!(preds, [1, 2]);
    }

    #[test]
    fn test_basic_blocks_and_instructions() {
        let func = diamond();
        let starts: Vec<u64> = basic_blocks(&func).map(|blk| blk.start()).collect();
        assert_eq!(starts, [0x1000, 0x1010, 0x1020, 0x1030]);

        let exit = func.block(3).unwrap();
        let opcodes: Vec<Opcode> = instructions(exit).map(|insn| insn.opcode).collect();
        assert_eq!(opcodes, [Opcode::Ret]);
        assert_eq!(instructions(func.block(0).unwrap()).count(), 0);
    }

    #[test]
    fn test_named_types() {
        let mut lib = LocalTypeLibrary::new();
        lib.add_type("b", TypeInfo::Bool);
        lib.add_type("a", TypeInfo::int(4));
        lib.add_type("c", TypeInfo::double());

        let names: Vec<&str> = named_types(&lib, NamedTypeFlags::default()).collect();
        assert_eq!(names, ["a", "b", "c"]);

        let empty = LocalTypeLibrary::new();
        assert_eq!(named_types(&empty, NamedTypeFlags::default()).next(), None);
    }
}
