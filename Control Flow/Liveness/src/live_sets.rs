use alloc::vec::Vec;
use control_flow_graph::Graph;
use lua_tree::{slot::SlotRef, statement::SlotHandler};
use set::Set;

struct UseCollector<'set> {
	uses: &'set mut Set,
	defs: &'set mut Set,
}

impl SlotHandler for UseCollector<'_> {
	fn read(&mut self, slot: &mut SlotRef) {
		let index = usize::from(slot.index);

		if !self.defs.contains(index) {
			self.uses.grow_insert(index);
		}
	}

	fn write(&mut self, slot: &mut SlotRef) {
		self.defs.grow_insert(slot.index.into());
	}
}

/// The registers live on entry to each block.
pub struct LiveSets {
	uses: Vec<Set>,
	defs: Vec<Set>,
	live_in: Vec<Set>,
	buffer: Vec<usize>,
}

impl LiveSets {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			uses: Vec::new(),
			defs: Vec::new(),
			live_in: Vec::new(),
			buffer: Vec::new(),
		}
	}

	#[must_use]
	pub fn live_in(&self, id: u16) -> &Set {
		&self.live_in[usize::from(id)]
	}

	fn reset(&mut self, len: usize) {
		for sets in [&mut self.uses, &mut self.defs, &mut self.live_in] {
			sets.iter_mut().for_each(Set::clear);
			sets.resize_with(len, Set::new);
		}
	}

	fn find_local_sets(&mut self, graph: &mut Graph) {
		// Loop variables are written on entry to the body.
		for id in graph.block_ids() {
			let block = graph.block_mut(id);

			if let Some(body) = block.warp.loop_body() {
				let variables = block.warp.loop_variables_mut();
				let defs = &mut self.defs[usize::from(body)];

				for variable in variables.iter() {
					defs.grow_insert(variable.index.into());
				}
			}
		}

		for id in graph.block_ids() {
			let block = graph.block_mut(id);
			let mut collector = UseCollector {
				uses: &mut self.uses[usize::from(id)],
				defs: &mut self.defs[usize::from(id)],
			};

			for statement in &mut block.statements {
				statement.for_each_slot(&mut collector);
			}

			block.warp.for_each_read(&mut collector);
		}
	}

	pub fn run(&mut self, graph: &mut Graph) {
		self.reset(graph.len());
		self.find_local_sets(graph);

		let mut changed = true;

		while changed {
			changed = false;

			for id in graph.block_ids().rev() {
				let index = usize::from(id);

				self.buffer.clear();
				self.buffer.extend(self.uses[index].ascending());

				for successor in graph.successors(id) {
					let live = self.live_in[usize::from(successor)].ascending();

					self.buffer
						.extend(live.filter(|&slot| !self.defs[index].contains(slot)));
				}

				for &slot in &self.buffer {
					changed |= !self.live_in[index].grow_insert(slot);
				}
			}
		}
	}
}

impl Default for LiveSets {
	fn default() -> Self {
		Self::new()
	}
}
