use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EliminationError {
	#[error("temporary in slot {slot} of block {block} is read {reads} times")]
	ReadCount { block: u16, slot: u16, reads: u32 },

	#[error("temporary in slot {slot} of block {block} cannot move past statement {statement}")]
	Hazard { block: u16, slot: u16, statement: usize },
}

impl EliminationError {
	#[must_use]
	pub const fn block(self) -> u16 {
		match self {
			Self::ReadCount { block, .. } | Self::Hazard { block, .. } => block,
		}
	}
}
