#![no_std]

extern crate alloc;

mod block;
mod condition;
mod dot;
mod value;
mod warp;

pub mod dominator;

use alloc::vec::Vec;
use list::resizable::Resizable;

pub use self::{
	block::Block,
	dot::Dot,
	warp::{Branch, GenericLoop, NumericLoop, Warp},
};

/// The warped shape of a function body: basic blocks of statements joined
/// by warps.
///
/// Block `0` is the entry. Blocks are kept in the order of the bytecode they
/// were decoded from, so a target at or before its source is a back edge.
pub struct Graph {
	pub blocks: Vec<Block>,
}

impl Graph {
	#[must_use]
	pub const fn new() -> Self {
		Self { blocks: Vec::new() }
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	#[must_use]
	pub fn block_ids(&self) -> core::ops::Range<u16> {
		0..u16::try_from(self.blocks.len()).unwrap_or(u16::MAX)
	}

	#[must_use]
	pub fn block(&self, id: u16) -> &Block {
		&self.blocks[usize::from(id)]
	}

	pub fn block_mut(&mut self, id: u16) -> &mut Block {
		&mut self.blocks[usize::from(id)]
	}

	pub fn predecessors(&self, id: u16) -> impl Iterator<Item = u16> + '_ {
		self.block(id).predecessors.iter().copied()
	}

	pub fn successors(&self, id: u16) -> impl Iterator<Item = u16> + use<> {
		self.block(id).warp.targets()
	}

	/// Appends a block, returning its id or `None` past the id space.
	pub fn add_block(&mut self, block: Block) -> Option<u16> {
		let id = u16::try_from(self.blocks.len()).ok().filter(|&id| id != u16::MAX)?;

		self.blocks.push(block);

		Some(id)
	}

	/// Recomputes every predecessor list from the warps.
	pub fn compute_predecessors(&mut self) {
		for block in &mut self.blocks {
			block.predecessors = Resizable::new();
		}

		for id in self.block_ids() {
			for successor in self.successors(id) {
				let predecessors = &mut self.block_mut(successor).predecessors;

				if !predecessors.iter().any(|&predecessor| predecessor == id) {
					predecessors.push(id);
				}
			}
		}
	}

	#[must_use]
	pub fn successor_lists(&self) -> Vec<Vec<u16>> {
		self.block_ids()
			.map(|id| self.successors(id).collect())
			.collect()
	}

	#[must_use]
	pub fn is_back_edge(&self, from: u16, to: u16) -> bool {
		to <= from
	}
}

impl Default for Graph {
	fn default() -> Self {
		Self::new()
	}
}
