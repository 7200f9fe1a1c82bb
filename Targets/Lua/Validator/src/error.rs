use alloc::string::String;
use core::fmt::{Display, Formatter, Result};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Warped,
	Structured,
}

impl Display for Mode {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result {
		match self {
			Self::Warped => f.write_str("warped"),
			Self::Structured => f.write_str("structured"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{mode} tree of the function at line {line} is invalid: {detail}")]
pub struct InvariantViolation {
	pub mode: Mode,
	pub line: u32,
	pub detail: String,
}
