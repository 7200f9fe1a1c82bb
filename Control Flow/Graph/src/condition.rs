use alloc::boxed::Box;
use lua_tree::expression::{BinaryOperator, Expression};

use crate::{Branch, Graph, Warp};

impl Graph {
	/// Whether `inner` is an empty test that only `outer` reaches.
	fn is_chained(&self, outer: u16, inner: u16) -> bool {
		let block = self.block(inner);

		inner != outer
			&& block.is_empty()
			&& !block.has_loop_hint
			&& matches!(block.warp, Warp::Branch(_))
			&& self.predecessors(inner).eq(core::iter::once(outer))
	}

	fn try_fold_condition(&mut self, id: u16) -> bool {
		let Warp::Branch(outer) = &self.block(id).warp else {
			return false;
		};

		let (inner, shared, shared_is_taken) = if self.is_chained(id, outer.fallthrough) {
			(outer.fallthrough, outer.taken, true)
		} else if self.is_chained(id, outer.taken) {
			(outer.taken, outer.fallthrough, false)
		} else {
			return false;
		};

		let Warp::Branch(last) = &self.block(inner).warp else {
			return false;
		};

		if (shared != last.taken && shared != last.fallthrough) || last.taken == last.fallthrough {
			return false;
		}

		let Warp::Branch(outer) = core::mem::replace(&mut self.block_mut(id).warp, Warp::End) else {
			return false;
		};

		let Warp::Branch(last) = core::mem::replace(&mut self.block_mut(inner).warp, Warp::End) else {
			return false;
		};

		// `first` holds exactly when the outer test goes to `shared`.
		let first = if shared_is_taken {
			outer.condition
		} else {
			outer.condition.negate()
		};

		let Branch {
			condition,
			taken,
			fallthrough,
		} = *last;

		let condition = if shared == taken {
			Expression::binary(BinaryOperator::Or, first, condition)
		} else {
			Expression::binary(BinaryOperator::And, first.negate(), condition)
		};

		self.block_mut(id).warp = Warp::Branch(Box::new(Branch {
			condition,
			taken,
			fallthrough,
		}));

		self.block_mut(inner).is_unreachable = true;

		true
	}

	/// Joins the tests of a short circuit condition into the first of them,
	/// leaving the emptied test blocks unreachable. Returns the number of
	/// tests folded.
	pub fn fold_conditions(&mut self) -> usize {
		let mut folded = 0;
		let mut changed = true;

		while changed {
			changed = false;

			for id in self.block_ids().rev() {
				if self.try_fold_condition(id) {
					self.compute_predecessors();

					folded += 1;
					changed = true;
				}
			}
		}

		folded
	}

	/// Turns every branch whose targets coincide into a jump.
	pub fn fold_identical_branches(&mut self) -> usize {
		let mut folded = 0;

		for block in &mut self.blocks {
			if let Warp::Branch(branch) = &block.warp
				&& branch.taken == branch.fallthrough
			{
				block.warp = Warp::Jump(branch.taken);
				folded += 1;
			}
		}

		if folded != 0 {
			self.compute_predecessors();
		}

		folded
	}
}
