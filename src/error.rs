use thiserror::Error;

use crate::host::EventKind;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most of the crate is infallible by construction: opcode factories are shape-correct by
/// signature, and operand constructors accept every well-formed input. The variants below
/// cover the few places where a runtime check is possible.
///
/// # Error Categories
///
/// ## Event Decoding Errors
/// - [`Error::EventArity`] - The host passed the wrong number of event arguments
/// - [`Error::EventArgument`] - An event argument did not have the documented kind
///
/// ## Construction Errors
/// - [`Error::FloatWidth`] - A raw floating point image was neither 4 nor 8 bytes
///
/// ## Host Errors
/// - [`Error::HostCapacity`] - The reference host refused a registration
///
/// Adapters never return these across the host boundary. A typed event dispatcher that fails
/// to decode its arguments logs the error and reports the neutral result instead.
///
/// # Examples
///
/// ```rust
/// use hexsuite::{mir::Operand, Error};
///
/// match Operand::fp_from_bytes(&[0u8; 3]) {
///     Err(Error::FloatWidth(width)) => assert_eq!(width, 3),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The raw argument list of an event had an unexpected length.
    ///
    /// Every event kind documents a fixed argument shape. This error is produced when the
    /// host delivers fewer or more arguments than that shape.
    #[error("Event {kind} expects {expected} arguments, got {found}")]
    EventArity {
        /// The event whose arguments were decoded
        kind: EventKind,
        /// Number of arguments documented for the event
        expected: usize,
        /// Number of arguments the host delivered
        found: usize,
    },

    /// A raw event argument had a different kind than the one documented for its position.
    #[error("Event {kind} argument #{index}: expected {expected}, got {found}")]
    EventArgument {
        /// The event whose arguments were decoded
        kind: EventKind,
        /// Zero-based position of the offending argument
        index: usize,
        /// The documented argument kind
        expected: &'static str,
        /// The argument kind actually delivered
        found: &'static str,
    },

    /// A floating point immediate was built from a byte image that is not 4 or 8 bytes long.
    #[error("Floating point immediates must be 4 or 8 bytes wide, got {0}")]
    FloatWidth(usize),

    /// The host subsystem has no room for another registration.
    ///
    /// Only the reference host produces this error; production hosts report capacity
    /// problems through their own channels.
    #[error("Host subsystem '{subsystem}' is full ({capacity} registrations)")]
    HostCapacity {
        /// Name of the subsystem that refused the registration
        subsystem: &'static str,
        /// Configured capacity of the subsystem
        capacity: usize,
    },
}
