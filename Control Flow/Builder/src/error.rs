use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
	#[error("unsupported opcode {opcode:#04x} at pc {pc}")]
	UnsupportedOpcode { opcode: u8, pc: usize },

	#[error("jump at pc {pc} leaves the function or splits an instruction pair")]
	BadJump { pc: usize },

	#[error("test at pc {pc} is not followed by a jump")]
	MissingJump { pc: usize },

	#[error("operand at pc {pc} does not name a valid constant")]
	BadOperand { pc: usize },

	#[error("variable results at pc {pc} are not consumed by the next instruction")]
	DanglingResults { pc: usize },

	#[error("instruction at pc {pc} expects variable results that were never produced")]
	MissingResults { pc: usize },

	#[error("function has too many blocks")]
	TooManyBlocks,
}
