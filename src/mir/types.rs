//! Type descriptors attached to call descriptors and call arguments.
//!
//! The host owns the real type library; [`TypeInfo`] is the value-level description the
//! microcode layer needs: whether a type is void, how wide it is, and how to print it.
//! Named types resolved through a [`crate::host::TypeLibrary`] keep their name and size.

use std::fmt;

/// Pointer width of the analysed program, in bytes.
pub const POINTER_SIZE: u32 = 8;

/// Describes the type of a call return value or argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeInfo {
    /// The type is not known (yet).
    #[default]
    Unknown,
    /// `void`; only meaningful as a return type.
    Void,
    /// A one byte boolean.
    Bool,
    /// An integer of `size` bytes.
    Int {
        /// Width in bytes
        size: u32,
        /// Whether the integer is signed
        signed: bool,
    },
    /// An IEEE754 floating point value of `size` bytes.
    Float {
        /// Width in bytes (4 or 8)
        size: u32,
    },
    /// A pointer to another type.
    Pointer(Box<TypeInfo>),
    /// A type resolved by name from a type library.
    Named {
        /// The library name of the type
        name: String,
        /// Width in bytes
        size: u32,
    },
}

impl TypeInfo {
    /// Signed integer of `size` bytes.
    #[must_use]
    pub const fn int(size: u32) -> Self {
        TypeInfo::Int { size, signed: true }
    }

    /// Unsigned integer of `size` bytes.
    #[must_use]
    pub const fn uint(size: u32) -> Self {
        TypeInfo::Int {
            size,
            signed: false,
        }
    }

    /// 4 byte `float`.
    #[must_use]
    pub const fn float() -> Self {
        TypeInfo::Float { size: 4 }
    }

    /// 8 byte `double`.
    #[must_use]
    pub const fn double() -> Self {
        TypeInfo::Float { size: 8 }
    }

    /// Pointer to `target`.
    #[must_use]
    pub fn pointer_to(target: TypeInfo) -> Self {
        TypeInfo::Pointer(Box::new(target))
    }

    /// Named library type of `size` bytes.
    #[must_use]
    pub fn named(name: impl Into<String>, size: u32) -> Self {
        TypeInfo::Named {
            name: name.into(),
            size,
        }
    }

    /// Returns `true` for `void`.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, TypeInfo::Void)
    }

    /// Returns `true` for floating point types.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, TypeInfo::Float { .. })
    }

    /// Width of the type in bytes, `None` if unknown.
    ///
    /// `void` is zero bytes wide.
    #[must_use]
    pub fn size(&self) -> Option<u32> {
        match self {
            TypeInfo::Unknown => None,
            TypeInfo::Void => Some(0),
            TypeInfo::Bool => Some(1),
            TypeInfo::Int { size, .. } | TypeInfo::Float { size } | TypeInfo::Named { size, .. } => {
                Some(*size)
            }
            TypeInfo::Pointer(_) => Some(POINTER_SIZE),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Unknown => f.write_str("?"),
            TypeInfo::Void => f.write_str("void"),
            TypeInfo::Bool => f.write_str("bool"),
            TypeInfo::Int { size, signed } => {
                write!(f, "{}int{}", if *signed { "" } else { "u" }, u64::from(*size) * 8)
            }
            TypeInfo::Float { size: 4 } => f.write_str("float"),
            TypeInfo::Float { size: 8 } => f.write_str("double"),
            TypeInfo::Float { size } => write!(f, "float{}", u64::from(*size) * 8),
            TypeInfo::Pointer(target) => write!(f, "{target}*"),
            TypeInfo::Named { name, .. } => f.write_str(name),
        }
    }
}
