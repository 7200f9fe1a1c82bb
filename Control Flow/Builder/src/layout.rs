use alloc::vec::Vec;
use luajit_reader::{instruction::Instruction, opcode::Operation};
use set::Set;

use crate::error::BuildError;

pub const NO_BLOCK: u16 = u16::MAX;

/// Where each block starts, in bytecode order.
pub struct Layout {
	/// The block starting at each instruction, or [`NO_BLOCK`].
	pub ids: Vec<u16>,
	/// The copy block taken by the `ISTC`/`ISFC` at each instruction.
	pub copies: Vec<u16>,
	/// The first instruction of every block and whether it is a copy block.
	pub starts: Vec<(usize, bool)>,
}

impl Layout {
	/// The block beginning at `pc`, which must be a boundary.
	pub fn block_at(&self, pc: usize) -> Result<u16, BuildError> {
		self.ids
			.get(pc)
			.copied()
			.filter(|&id| id != NO_BLOCK)
			.ok_or(BuildError::BadJump { pc })
	}
}

pub const fn is_test(operation: Operation) -> bool {
	matches!(
		operation,
		Operation::IsLt
			| Operation::IsGe
			| Operation::IsLe
			| Operation::IsGt
			| Operation::IsEqV
			| Operation::IsNeV
			| Operation::IsEqS
			| Operation::IsNeS
			| Operation::IsEqN
			| Operation::IsNeN
			| Operation::IsEqP
			| Operation::IsNeP
			| Operation::IsTC
			| Operation::IsFC
			| Operation::IsT
			| Operation::IsF
	)
}

/// Whether a jump to `target` enters the control instructions of an
/// iterator loop.
pub fn is_iterator_jump(operations: &[Operation], target: usize) -> bool {
	matches!(
		operations.get(target),
		Some(Operation::IterC | Operation::IterN)
	) && operations.get(target + 1) == Some(&Operation::IterL)
}

fn next_id(starts: &[(usize, bool)]) -> Result<u16, BuildError> {
	u16::try_from(starts.len())
		.ok()
		.filter(|&id| id != NO_BLOCK)
		.ok_or(BuildError::TooManyBlocks)
}

pub struct LayoutFinder {
	leaders: Set,
}

impl LayoutFinder {
	pub const fn new() -> Self {
		Self {
			leaders: Set::new(),
		}
	}

	fn add_leader(&mut self, pc: usize, len: usize) {
		if pc < len {
			self.leaders.grow_insert(pc);
		}
	}

	fn add_jump(
		&mut self,
		instructions: &[Instruction],
		pc: usize,
	) -> Result<usize, BuildError> {
		let len = instructions.len();
		let target = instructions[pc]
			.jump_target(pc, len)
			.ok_or(BuildError::BadJump { pc })?;

		self.add_leader(target, len);
		self.add_leader(pc + 1, len);

		Ok(target)
	}

	fn find_leaders(
		&mut self,
		operations: &[Operation],
		instructions: &[Instruction],
	) -> Result<(), BuildError> {
		let len = instructions.len();

		self.leaders.clear();
		self.add_leader(0, len);

		for (pc, &operation) in operations.iter().enumerate() {
			match operation {
				operation if is_test(operation) => {
					if operations.get(pc + 1) != Some(&Operation::Jmp) {
						return Err(BuildError::MissingJump { pc });
					}

					self.add_jump(instructions, pc + 1)?;
					self.add_leader(pc + 2, len);
				}
				Operation::Jmp | Operation::IsNext => {
					let target = self.add_jump(instructions, pc)?;

					if is_iterator_jump(operations, target) {
						self.add_leader(target + 2, len);
					} else if operation == Operation::IsNext {
						return Err(BuildError::BadJump { pc });
					}
				}
				Operation::UClo | Operation::ForI | Operation::ForL | Operation::IterL => {
					self.add_jump(instructions, pc)?;
				}
				Operation::Ret
				| Operation::Ret0
				| Operation::Ret1
				| Operation::RetM
				| Operation::CallT
				| Operation::CallMT => self.add_leader(pc + 1, len),
				Operation::Loop => self.add_leader(pc, len),
				_ => {}
			}
		}

		// A jump into the middle of a test pair would tear it apart.
		for (pc, &operation) in operations.iter().enumerate() {
			if is_test(operation) && self.leaders.contains(pc + 1) {
				return Err(BuildError::BadJump { pc: pc + 1 });
			}
		}

		Ok(())
	}

	pub fn run(
		&mut self,
		operations: &[Operation],
		instructions: &[Instruction],
	) -> Result<Layout, BuildError> {
		self.find_leaders(operations, instructions)?;

		let len = instructions.len();
		let mut layout = Layout {
			ids: alloc::vec![NO_BLOCK; len],
			copies: alloc::vec![NO_BLOCK; len],
			starts: Vec::new(),
		};

		let mut pending_copy = None;

		for pc in 0..len {
			if self.leaders.contains(pc) {
				// Copy blocks sit right after the block holding their test.
				if let Some(copy) = pending_copy.take() {
					let id = next_id(&layout.starts)?;

					layout.copies[copy] = id;
					layout.starts.push((copy, true));
				}

				let id = next_id(&layout.starts)?;

				layout.ids[pc] = id;
				layout.starts.push((pc, false));
			}

			if matches!(operations[pc], Operation::IsTC | Operation::IsFC) {
				pending_copy = Some(pc);
			}
		}

		if let Some(copy) = pending_copy {
			let id = next_id(&layout.starts)?;

			layout.copies[copy] = id;
			layout.starts.push((copy, true));
		}

		Ok(layout)
	}
}
