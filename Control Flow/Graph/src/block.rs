use alloc::vec::Vec;
use list::resizable::Resizable;
use lua_tree::statement::Statement;

use crate::warp::Warp;

pub struct Block {
	pub statements: Vec<Statement>,
	pub warp: Warp,

	pub predecessors: Resizable<u16, 7>,

	/// Index of the first instruction the block was decoded from.
	pub start: u32,

	/// The block begins with a `LOOP` instruction.
	pub has_loop_hint: bool,

	/// No path from the entry reaches the block.
	pub is_unreachable: bool,

	/// Upvalues at or above this slot are closed when the block ends.
	pub close: Option<u16>,
}

impl Block {
	#[must_use]
	pub const fn new(start: u32) -> Self {
		Self {
			statements: Vec::new(),
			warp: Warp::End,

			predecessors: Resizable::new(),

			start,

			has_loop_hint: false,
			is_unreachable: false,
			close: None,
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.statements.is_empty() && self.close.is_none()
	}
}

impl Default for Block {
	fn default() -> Self {
		Self::new(0)
	}
}
