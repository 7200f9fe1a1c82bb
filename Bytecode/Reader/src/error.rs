use thiserror::Error;

use crate::opcode::Version;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
	#[error("bad magic")]
	BadMagic,

	#[error("unknown format version {0}")]
	UnknownVersion(u8),

	#[error("format version {found} does not match the selected opcode table ({expected})")]
	VersionMismatch { expected: Version, found: Version },

	#[error("unexpected end of input")]
	Truncated,

	#[error("variable length integer overflows 32 bits")]
	Overflow,

	#[error("prototype declares {declared} bytes but {consumed} were consumed")]
	LengthMismatch { declared: usize, consumed: usize },

	#[error("child constant without a parsed prototype")]
	MissingChild,

	#[error("{0} prototypes left without a parent")]
	DanglingPrototypes(usize),

	#[error("chunk contains no prototype")]
	Empty,

	#[error("debug information overruns its declared size")]
	DebugOverrun,
}

/// A container or section could not be decoded. The offset points at the
/// first byte that could not be accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("malformed bytecode at offset {offset}: {reason}")]
pub struct MalformedBytecode {
	pub offset: usize,
	pub reason: Reason,
}
