use alloc::{vec, vec::Vec};
use set::Set;

const UNDEFINED: u16 = u16::MAX;

/// Lists the nodes reachable from `entry` in reverse post order.
#[must_use]
pub fn reverse_post_order(successors: &[Vec<u16>], entry: u16) -> Vec<u16> {
	let mut seen = Set::new();
	let mut stack = vec![(entry, false)];
	let mut order = Vec::with_capacity(successors.len());

	while let Some((id, post)) = stack.pop() {
		if post {
			order.push(id);
		} else if !seen.grow_insert(id.into()) {
			stack.push((id, true));

			// Pushed in reverse so the first successor is visited first.
			for &successor in successors[usize::from(id)].iter().rev() {
				if !seen.contains(successor.into()) {
					stack.push((successor, false));
				}
			}
		}
	}

	order.reverse();
	order
}

/// Immediate dominators, computed with the iterative scheme of Cooper,
/// Harvey and Kennedy.
pub struct Dominators {
	immediate: Vec<u16>,
	numbers: Vec<u16>,
	order: Vec<u16>,
}

impl Dominators {
	#[must_use]
	pub fn new(successors: &[Vec<u16>], entry: u16) -> Self {
		let order = reverse_post_order(successors, entry);
		let mut numbers = vec![UNDEFINED; successors.len()];
		let mut predecessors = vec![Vec::new(); successors.len()];

		for (number, &id) in order.iter().enumerate() {
			numbers[usize::from(id)] = number as u16;
		}

		for &id in &order {
			for &successor in &successors[usize::from(id)] {
				predecessors[usize::from(successor)].push(id);
			}
		}

		let mut immediate = vec![UNDEFINED; successors.len()];
		let mut changed = true;

		immediate[usize::from(entry)] = entry;

		while changed {
			changed = false;

			for &id in order.iter().skip(1) {
				let mut candidate = UNDEFINED;

				for &predecessor in &predecessors[usize::from(id)] {
					if immediate[usize::from(predecessor)] == UNDEFINED {
						continue;
					}

					candidate = if candidate == UNDEFINED {
						predecessor
					} else {
						Self::intersect(&immediate, &numbers, predecessor, candidate)
					};
				}

				if immediate[usize::from(id)] != candidate {
					immediate[usize::from(id)] = candidate;
					changed = true;
				}
			}
		}

		Self {
			immediate,
			numbers,
			order,
		}
	}

	fn intersect(immediate: &[u16], numbers: &[u16], mut lhs: u16, mut rhs: u16) -> u16 {
		while lhs != rhs {
			while numbers[usize::from(lhs)] > numbers[usize::from(rhs)] {
				lhs = immediate[usize::from(lhs)];
			}

			while numbers[usize::from(rhs)] > numbers[usize::from(lhs)] {
				rhs = immediate[usize::from(rhs)];
			}
		}

		lhs
	}

	/// The reachable nodes in reverse post order.
	#[must_use]
	pub fn order(&self) -> &[u16] {
		&self.order
	}

	#[must_use]
	pub fn is_reachable(&self, id: u16) -> bool {
		self.numbers
			.get(usize::from(id))
			.is_some_and(|&number| number != UNDEFINED)
	}

	/// The immediate dominator of `id`, or `None` for the entry and for
	/// unreachable nodes.
	#[must_use]
	pub fn immediate(&self, id: u16) -> Option<u16> {
		let parent = *self.immediate.get(usize::from(id))?;

		(parent != UNDEFINED && parent != id).then_some(parent)
	}

	#[must_use]
	pub fn dominates(&self, dominator: u16, mut id: u16) -> bool {
		if !self.is_reachable(id) {
			return false;
		}

		loop {
			if id == dominator {
				return true;
			}

			match self.immediate(id) {
				Some(parent) => id = parent,
				None => return false,
			}
		}
	}
}
