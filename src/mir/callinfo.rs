//! Call descriptors.
//!
//! A [`CallInfo`] describes a call site: calling convention, callee, return type and the
//! ordered, typed argument list. Descriptors are built through [`CallConfig`], whose
//! [`Default`] produces the plain descriptor the decompiler expects for synthesised calls
//! (fastcall, unknown callee, final argument list), and whose [`CallConfig::pure`] preset
//! additionally marks the call free of side effects.
//!
//! # Examples
//!
//! ```rust
//! use hexsuite::mir::{call_info, call_info_pure, CallArg, CallFlags, Reg, TypeInfo};
//!
//! let args = vec![
//!     CallArg::new(Reg::new(0, 8), TypeInfo::uint(8), None),
//!     CallArg::new((1u64, 4), TypeInfo::int(4), Some("count".into())),
//! ];
//! let info = call_info(TypeInfo::Void, args.clone());
//! assert_eq!(info.args.len(), 2);
//! assert_eq!(info.return_size(), 0);
//!
//! let pure = call_info_pure(TypeInfo::int(4), args);
//! assert!(pure.flags.contains(CallFlags::PURE | CallFlags::FINAL));
//!
//! // bare operands become arguments of unknown type
//! let bare = call_info(TypeInfo::Void, [Reg::new(8, 8)]);
//! assert_eq!(bare.args[0].ty, TypeInfo::Unknown);
//! ```

use std::fmt;

use bitflags::bitflags;

use crate::mir::{
    BlockId, Ea, FrameId, Global, Helper, Instruction, Operand, Reg, TypeInfo, NOSIZE,
};

bitflags! {
    /// Properties of a call descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CallFlags: u32 {
        /// Call arguments have been propagated
        const PROP = 0x001;
        /// Return value is unused
        const DEAD = 0x002;
        /// The argument list is final and must not be re-derived
        const FINAL = 0x004;
        /// The call does not return
        const NORET = 0x008;
        /// The call has no side effects and depends only on its arguments
        const PURE = 0x010;
        /// The call has no side effects but may read memory
        const NOSIDE = 0x020;
        /// Stack pointer delta is known
        const SPLOK = 0x040;
        /// The call is itself nested in a call
        const HASCALL = 0x080;
        /// The callee takes a format string
        const HASFMT = 0x100;
    }
}

impl Default for CallFlags {
    fn default() -> Self {
        CallFlags::FINAL | CallFlags::PROP
    }
}

/// Calling convention of a call descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CallConv {
    /// Not determined
    Unknown,
    /// `__cdecl`
    Cdecl,
    /// `__stdcall`
    Stdcall,
    /// `__pascal`
    Pascal,
    /// `__fastcall`
    #[default]
    Fastcall,
    /// `__thiscall`
    Thiscall,
}

impl CallConv {
    /// The host's calling convention code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            CallConv::Unknown => 0x10,
            CallConv::Cdecl => 0x30,
            CallConv::Stdcall => 0x50,
            CallConv::Pascal => 0x60,
            CallConv::Fastcall => 0x70,
            CallConv::Thiscall => 0x80,
        }
    }

    /// Returns `true` if the callee cleans up stack arguments.
    #[must_use]
    pub const fn is_callee_cleanup(self) -> bool {
        matches!(
            self,
            CallConv::Stdcall | CallConv::Pascal | CallConv::Fastcall | CallConv::Thiscall
        )
    }
}

/// Well-known role of a callee, used by the decompiler to special-case intrinsics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FuncRole {
    /// No special role
    #[default]
    Unknown,
    /// `memset`
    Memset,
    /// `memcpy`
    Memcpy,
    /// `strcpy`
    Strcpy,
    /// `strlen`
    Strlen,
    /// `alloca`
    Alloca,
    /// Byte swap
    Bswap,
    /// Bit test
    Bittest,
    /// Bit test and set
    Bittestandset,
    /// Three-way compare
    ThreeWayCmp,
    /// Absolute value
    Abs,
}

/// One argument of a call descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    /// Where the argument value comes from
    pub op: Operand,
    /// Declared type of the argument
    pub ty: TypeInfo,
    /// Optional argument name
    pub name: Option<String>,
}

impl CallArg {
    /// Creates an argument, taking ownership of the operand.
    #[must_use]
    pub fn new(op: impl Into<Operand>, ty: TypeInfo, name: Option<String>) -> Self {
        Self {
            op: op.into(),
            ty,
            name,
        }
    }
}

// a bare operand is an argument of unknown type without a name
macro_rules! bare_call_arg {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CallArg {
                fn from(op: $source) -> Self {
                    CallArg::new(op, TypeInfo::Unknown, None)
                }
            }
        )*
    };
}

bare_call_arg!(
    Operand,
    Reg,
    (Reg, Reg),
    Helper<'_>,
    Global,
    BlockId,
    (FrameId, i64),
    Instruction,
    Box<Instruction>,
    (u64, i32),
    (i64, i32),
    f32,
    f64,
);

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.ty)?;
        if let Some(name) = &self.name {
            write!(f, "{name}=")?;
        }
        write!(f, "{}", self.op)
    }
}

/// Metadata describing a call site.
#[derive(Debug, Clone, PartialEq)]
pub struct CallInfo {
    /// Calling convention
    pub cc: CallConv,
    /// Callee address, `None` if unknown
    pub callee: Option<Ea>,
    /// Number of arguments whose locations are fixed
    pub solid_args: u32,
    /// Stack pointer delta across the call
    pub call_spd: i64,
    /// Top of the stack argument area
    pub stkargs_top: i64,
    /// Well-known role of the callee
    pub role: FuncRole,
    /// Descriptor properties
    pub flags: CallFlags,
    /// Return type
    pub return_type: TypeInfo,
    /// Arguments, in call order
    pub args: Vec<CallArg>,
}

impl CallInfo {
    /// Size of the call's result in bytes.
    ///
    /// `void` calls are zero bytes wide; unknown return types yield [`NOSIZE`].
    #[must_use]
    pub fn return_size(&self) -> i32 {
        match self.return_type.size() {
            Some(size) => i32::try_from(size).unwrap_or(NOSIZE),
            None => NOSIZE,
        }
    }

    /// Returns `true` if the call is marked pure.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.flags.contains(CallFlags::PURE)
    }

    /// Returns `true` if the call never returns.
    #[must_use]
    pub fn is_noret(&self) -> bool {
        self.flags.contains(CallFlags::NORET)
    }

    /// Appends an argument.
    pub fn push_arg(&mut self, arg: CallArg) {
        self.args.push(arg);
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} __{}", self.return_type, self.cc)?;
        match self.callee {
            Some(ea) => write!(f, " ${ea:#X}(")?,
            None => f.write_str("(")?,
        }
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")?;
        if self.is_pure() {
            f.write_str(" pure")?;
        }
        Ok(())
    }
}

/// Settings applied by the call descriptor builder.
///
/// The default configuration matches what the decompiler expects for synthesised calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    /// Calling convention
    pub cc: CallConv,
    /// Callee address, `None` if unknown
    pub callee: Option<Ea>,
    /// Callee role
    pub role: FuncRole,
    /// Descriptor flags
    pub flags: CallFlags,
    /// Number of arguments with fixed locations
    pub solid_args: u32,
    /// Stack pointer delta across the call
    pub call_spd: i64,
    /// Top of the stack argument area
    pub stkargs_top: i64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            cc: CallConv::Fastcall,
            callee: None,
            role: FuncRole::Unknown,
            flags: CallFlags::FINAL | CallFlags::PROP,
            solid_args: 0,
            call_spd: 0,
            stkargs_top: 0,
        }
    }
}

impl CallConfig {
    /// The default configuration with [`CallFlags::PURE`] added.
    #[must_use]
    pub fn pure() -> Self {
        let mut config = Self::default();
        config.flags |= CallFlags::PURE;
        config
    }

    /// Sets the callee address.
    #[must_use]
    pub fn with_callee(mut self, callee: Ea) -> Self {
        self.callee = Some(callee);
        self
    }

    /// Sets the calling convention.
    #[must_use]
    pub fn with_cc(mut self, cc: CallConv) -> Self {
        self.cc = cc;
        self
    }

    /// Builds a descriptor returning `return_type` with `args` in the given order.
    ///
    /// Arguments may be typed [`CallArg`]s or bare operands, which get an unknown type.
    #[must_use]
    pub fn build(
        &self,
        return_type: TypeInfo,
        args: impl IntoIterator<Item = impl Into<CallArg>>,
    ) -> CallInfo {
        CallInfo {
            cc: self.cc,
            callee: self.callee,
            solid_args: self.solid_args,
            call_spd: self.call_spd,
            stkargs_top: self.stkargs_top,
            role: self.role,
            flags: self.flags,
            return_type,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Builds a descriptor with the default configuration.
#[must_use]
pub fn call_info(
    return_type: TypeInfo,
    args: impl IntoIterator<Item = impl Into<CallArg>>,
) -> Box<CallInfo> {
    Box::new(CallConfig::default().build(return_type, args))
}

/// Builds a descriptor with the default configuration, marked pure.
#[must_use]
pub fn call_info_pure(
    return_type: TypeInfo,
    args: impl IntoIterator<Item = impl Into<CallArg>>,
) -> Box<CallInfo> {
    Box::new(CallConfig::pure().build(return_type, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor() {
        let info = call_info(TypeInfo::Void, Vec::<CallArg>::new());

        assert_eq!(info.cc, CallConv::Fastcall);
        assert_eq!(info.callee, None);
        assert_eq!(info.solid_args, 0);
        assert_eq!(info.call_spd, 0);
        assert_eq!(info.stkargs_top, 0);
        assert_eq!(info.role, FuncRole::Unknown);
        assert_eq!(info.flags, CallFlags::FINAL | CallFlags::PROP);
        assert!(!info.is_pure());
    }

    #[test]
    fn test_argument_order() {
        let info = call_info(
            TypeInfo::Void,
            vec![
                CallArg::new(Reg::new(0, 8), TypeInfo::uint(8), None),
                CallArg::new((1u64, 4), TypeInfo::int(4), None),
            ],
        );

        assert_eq!(info.args.len(), 2);
        assert_eq!(info.args[0].op.as_reg(), Some(Reg::new(0, 8)));
        assert_eq!(info.args[1].op.value(), Some(1));
        assert_eq!(info.return_size(), 0);
    }

    #[test]
    fn test_bare_operands_mix_with_typed_args() {
        let args: Vec<CallArg> = vec![
            Reg::new(0, 8).into(),
            CallArg::new((1u64, 4), TypeInfo::int(4), Some("n".to_string())),
            Operand::global(0x3000).into(),
        ];
        let info = call_info(TypeInfo::Void, args);

        assert_eq!(info.args.len(), 3);
        assert_eq!(info.args[0].op.as_reg(), Some(Reg::new(0, 8)));
        assert_eq!(info.args[0].ty, TypeInfo::Unknown);
        assert_eq!(info.args[0].name, None);
        assert_eq!(info.args[1].ty, TypeInfo::int(4));
        assert_eq!(info.args[2].op, Operand::global(0x3000));
    }

    #[test]
    fn test_bare_operand_list() {
        let info = CallConfig::pure().build(TypeInfo::int(8), [Reg::new(8, 8), Reg::new(16, 8)]);

        let regs: Vec<_> = info.args.iter().filter_map(|arg| arg.op.as_reg()).collect();
        assert_eq!(regs, [Reg::new(8, 8), Reg::new(16, 8)]);
        assert!(info.args.iter().all(|arg| arg.ty == TypeInfo::Unknown));
    }

    #[test]
    fn test_pure_overlay() {
        let info = call_info_pure(TypeInfo::int(4), Vec::<CallArg>::new());
        assert!(info.flags.contains(CallFlags::PURE));
        assert!(info.flags.contains(CallFlags::FINAL));
        assert!(info.flags.contains(CallFlags::PROP));
        assert_eq!(info.return_size(), 4);
    }

    #[test]
    fn test_return_size_unknown() {
        let info = call_info(TypeInfo::Unknown, Vec::<CallArg>::new());
        assert_eq!(info.return_size(), NOSIZE);
    }

    #[test]
    fn test_config_builder() {
        let info = CallConfig::default()
            .with_callee(0x1400_1000)
            .with_cc(CallConv::Cdecl)
            .build(TypeInfo::Bool, Vec::<CallArg>::new());

        assert_eq!(info.callee, Some(0x1400_1000));
        assert_eq!(info.cc.code(), 0x30);
        assert!(!info.cc.is_callee_cleanup());
    }

    #[test]
    fn test_display() {
        let info = call_info_pure(
            TypeInfo::int(4),
            vec![CallArg::new(
                (1u64, 4),
                TypeInfo::int(4),
                Some("n".to_string()),
            )],
        );
        assert_eq!(info.to_string(), "int32 __fastcall(int32 n=#0x1.4) pure");
    }
}
