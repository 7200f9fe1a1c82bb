// Blocks are kept in bytecode order, and the compiler lays every construct
// out as a contiguous run of blocks. Regions are therefore intervals of block
// ids, entered at their first block and left through one follow block.
#![no_std]

extern crate alloc;

mod branch;
mod error;
mod repeat;

use alloc::{vec, vec::Vec};
use control_flow_graph::{Graph, Warp, dominator::Dominators};
use lua_tree::statement::{Sequence, Statement};
use set::Set;

pub use self::error::UnstructurableControlFlow;

/// The interval being structured and where its jumps may lead.
#[derive(Clone, Copy)]
struct Context {
	end: u16,
	follow: Option<u16>,
	header: Option<u16>,
	exit: Option<u16>,
}

impl Context {
	const fn nested(self, end: u16, follow: Option<u16>) -> Self {
		Self {
			end,
			follow,
			header: self.header,
			exit: self.exit,
		}
	}

	const fn looping(end: u16, header: u16, exit: u16) -> Self {
		Self {
			end,
			follow: None,
			header: Some(header),
			exit: Some(exit),
		}
	}
}

/// Turns the warped shape of a function into nested statements.
pub struct Structurer {
	dominators: Option<Dominators>,
	latches: Vec<Vec<u16>>,
	headers: Set,
	visited: Set,
}

impl Structurer {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			dominators: None,
			latches: Vec::new(),
			headers: Set::new(),
			visited: Set::new(),
		}
	}

	fn error(blocks: &[u16]) -> UnstructurableControlFlow {
		UnstructurableControlFlow {
			blocks: blocks.to_vec(),
		}
	}

	fn is_reachable(&self, id: u16) -> bool {
		self.dominators
			.as_ref()
			.is_some_and(|dominators| dominators.is_reachable(id))
	}

	/// Whether nothing reaches the blocks in `start..end`, so a jump over
	/// them drops no code that could run.
	fn is_dead(&self, start: u16, end: u16) -> bool {
		(start..end).all(|id| !self.is_reachable(id))
	}

	/// The first block from `id` on that can run, folded condition blocks
	/// left behind by earlier passes being skipped.
	fn next_live(&self, id: u16, end: u16) -> u16 {
		(id..end).find(|&id| self.is_reachable(id)).unwrap_or(end)
	}

	/// Finds the back edges of every loop. The back edge of a `for` loop
	/// belongs to its preheader and is left out.
	fn find_latches(&mut self, graph: &Graph) -> Result<(), UnstructurableControlFlow> {
		self.latches.iter_mut().for_each(Vec::clear);
		self.latches.resize_with(graph.len(), Vec::new);

		for id in graph.block_ids() {
			for target in graph.successors(id) {
				if graph.is_back_edge(id, target) {
					self.latches[usize::from(target)].push(id);
				}
			}
		}

		for id in graph.block_ids() {
			if let Some(body) = graph.block(id).warp.loop_body() {
				let latches = &mut self.latches[usize::from(body)];

				if let Some(position) = (0..latches.len()).max_by_key(|&index| latches[index]) {
					latches.swap_remove(position);
				}
			}
		}

		let Some(dominators) = &self.dominators else {
			return Ok(());
		};

		for header in graph.block_ids() {
			for &latch in &self.latches[usize::from(header)] {
				if dominators.is_reachable(latch) && !dominators.dominates(header, latch) {
					return Err(Self::error(&[header, latch]));
				}
			}
		}

		Ok(())
	}

	fn latch_of(&self, id: u16) -> Option<u16> {
		if self.headers.contains(id.into()) {
			return None;
		}

		self.latches[usize::from(id)].iter().copied().max()
	}

	fn visit(&mut self, id: u16) -> Result<(), UnstructurableControlFlow> {
		if self.visited.grow_insert(id.into()) {
			Err(Self::error(&[id]))
		} else {
			Ok(())
		}
	}

	/// Leaves the region through a jump, returning where the walk resumes.
	fn add_jump(
		&self,
		list: &mut Vec<Statement>,
		id: u16,
		target: u16,
		context: Context,
	) -> Result<u16, UnstructurableControlFlow> {
		let next = id + 1;

		if Some(target) == context.follow || Some(target) == context.header {
			return if self.is_dead(next, context.end) {
				Ok(context.end)
			} else {
				Err(Self::error(&[id, target]))
			};
		}

		if Some(target) == context.exit {
			list.push(Statement::Break);

			return Ok(next);
		}

		if target >= next && target <= context.end && self.is_dead(next, target) {
			Ok(target)
		} else {
			Err(Self::error(&[id, target]))
		}
	}

	fn sequence(
		&mut self,
		graph: &mut Graph,
		start: u16,
		context: Context,
	) -> Result<Sequence, UnstructurableControlFlow> {
		let mut list = Vec::new();
		let mut id = start;

		while id < context.end {
			if !self.is_reachable(id) {
				id += 1;

				continue;
			}

			if let Some(latch) = self.latch_of(id) {
				id = self.add_loop(graph, &mut list, id, latch, context)?;

				continue;
			}

			self.visit(id)?;

			let block = graph.block_mut(id);
			let warp = core::mem::replace(&mut block.warp, Warp::End);

			list.append(&mut block.statements);

			tracing::trace!(id, warp = warp.name(), "structuring block");

			id = match warp {
				Warp::End => id + 1,
				Warp::Jump(target) => self.add_jump(&mut list, id, target, context)?,
				Warp::Branch(branch) => self.add_branch(graph, &mut list, id, *branch, context)?,
				Warp::NumericFor(data) => self.add_numeric_for(graph, &mut list, id, *data, context)?,
				Warp::GenericFor(data) => self.add_generic_for(graph, &mut list, id, *data, context)?,
			};
		}

		Ok(Sequence::from(list))
	}

	/// Code nothing reaches is kept after the last statement.
	fn append_dead_code(
		&self,
		graph: &mut Graph,
		list: &mut Vec<Statement>,
	) -> Result<(), UnstructurableControlFlow> {
		let mut missed = Vec::new();

		for id in graph.block_ids() {
			if self.visited.contains(id.into()) {
				continue;
			}

			if self.is_reachable(id) {
				missed.push(id);
			} else {
				list.append(&mut graph.block_mut(id).statements);
			}
		}

		if missed.is_empty() {
			Ok(())
		} else {
			Err(UnstructurableControlFlow { blocks: missed })
		}
	}

	/// Structures a whole function body.
	///
	/// # Errors
	///
	/// Returns an error naming the blocks of the first region that matches no
	/// structured statement.
	pub fn run(&mut self, mut graph: Graph) -> Result<Sequence, UnstructurableControlFlow> {
		let Ok(end) = u16::try_from(graph.len()) else {
			return Err(Self::error(&[]));
		};

		// Elimination empties the blocks holding the later tests of short
		// circuit conditions, so more of them fold here than before it.
		let folded = graph.fold_conditions();

		self.dominators = (end != 0).then(|| Dominators::new(&graph.successor_lists(), 0));
		self.headers.clear();
		self.visited.clear();
		self.find_latches(&graph)?;

		let context = Context {
			end,
			follow: None,
			header: None,
			exit: None,
		};

		let mut sequence = self.sequence(&mut graph, 0, context)?;

		self.append_dead_code(&mut graph, &mut sequence.list)?;

		tracing::debug!(
			blocks = end,
			folded,
			statements = sequence.list.len(),
			"structured function"
		);

		Ok(sequence)
	}
}

impl Default for Structurer {
	fn default() -> Self {
		Self::new()
	}
}

fn single(statement: Statement) -> Sequence {
	Sequence::from(vec![statement])
}
