use alloc::{boxed::Box, vec, vec::Vec};
use lua_tree::{
	expression::{BinaryOperator, Expression, UnaryOperator},
	slot::{SlotRef, SlotTable},
	statement::{Assign, Statement},
};
use set::Set;

use crate::{Graph, Warp, dominator::Dominators};

/// The origin of the value a register holds when the region is entered.
const INCOMING: u16 = u16::MAX;

const MAX_VISITS: usize = 64;

/// The register tested by `condition` and whether it jumps when truthy.
fn find_test(condition: &Expression) -> Option<(SlotRef, bool)> {
	match condition {
		Expression::Slot(slot) => Some((*slot, true)),
		Expression::Unary(unary) if unary.operator == UnaryOperator::Not => {
			unary.source.as_slot().map(|slot| (slot, false))
		}
		_ => None,
	}
}

fn reads_web(expression: &Expression, web: u32) -> bool {
	expression.any(|expression| matches!(expression, Expression::Slot(slot) if slot.web == web))
}

fn as_slot_assignment(statement: &Statement) -> Option<(SlotRef, &Expression)> {
	let Statement::Assign(assign) = statement else {
		return None;
	};

	match (assign.destinations.as_slice(), assign.sources.as_slice()) {
		([Expression::Slot(slot)], [source]) => Some((*slot, source)),
		_ => None,
	}
}

fn test_condition(slot: SlotRef, jumps_if_truthy: bool) -> Expression {
	let condition = Expression::Slot(slot);

	if jumps_if_truthy {
		condition
	} else {
		Expression::unary(UnaryOperator::Not, condition)
	}
}

/// One assignment of the folded register, told apart from equal looking
/// ones by the block holding it.
#[derive(Clone, PartialEq)]
struct Leaf {
	origin: u16,
	value: Expression,
}

/// What the folded register holds when the region is left.
#[derive(Clone, PartialEq)]
enum Value {
	Leaf(Leaf),
	Condition(Expression),
	Or(Box<Value>, Box<Value>),
	And(Box<Value>, Box<Value>),
}

impl Value {
	fn or(lhs: Self, rhs: Self) -> Self {
		Self::Or(Box::new(lhs), Box::new(rhs))
	}

	fn and(lhs: Self, rhs: Self) -> Self {
		Self::And(Box::new(lhs), Box::new(rhs))
	}

	/// `leaf` was tested for truth, leading to `truthy` or `falsy`.
	fn test(leaf: &Leaf, truthy: Self, falsy: Self) -> Option<Self> {
		let own = Self::Leaf(leaf.clone());

		if truthy == own {
			Some(Self::or(own, falsy))
		} else if falsy == own {
			Some(Self::and(own, truthy))
		} else {
			None
		}
	}

	fn select(condition: &Expression, then: &Self, otherwise: &Self) -> Option<Self> {
		let condition = || Self::Condition(condition.clone());

		if let Self::Or(lhs, rhs) = then
			&& **rhs == *otherwise
		{
			return Some(Self::or(Self::and(condition(), (**lhs).clone()), otherwise.clone()));
		}

		if let Self::And(lhs, rhs) = otherwise
			&& **rhs == *then
		{
			return Some(Self::and(Self::or(condition(), (**lhs).clone()), then.clone()));
		}

		None
	}

	/// `then` when `condition` holds and `otherwise` when it does not, as
	/// `c and p or q` or as `(c or p) and q`.
	fn choose(condition: &Expression, then: &Self, otherwise: &Self) -> Option<Self> {
		Self::select(condition, then, otherwise)
			.or_else(|| Self::select(&condition.clone().negate(), otherwise, then))
	}

	fn collect_origins(&self, origins: &mut Vec<u16>) {
		match self {
			Self::Leaf(leaf) => origins.push(leaf.origin),
			Self::Condition(_) => {}
			Self::Or(lhs, rhs) | Self::And(lhs, rhs) => {
				lhs.collect_origins(origins);
				rhs.collect_origins(origins);
			}
		}
	}

	/// Whether some assignment would be evaluated twice.
	fn has_repeats(&self) -> bool {
		let mut origins = Vec::new();

		self.collect_origins(&mut origins);
		origins.sort_unstable();

		origins.windows(2).any(|pair| pair[0] == pair[1])
	}

	fn into_expression(self) -> Expression {
		match self {
			Self::Leaf(leaf) => leaf.value,
			Self::Condition(condition) => condition,
			Self::Or(lhs, rhs) => {
				Expression::binary(BinaryOperator::Or, lhs.into_expression(), rhs.into_expression())
			}
			Self::And(lhs, rhs) => {
				Expression::binary(BinaryOperator::And, lhs.into_expression(), rhs.into_expression())
			}
		}
	}
}

/// The blocks between a branch and its join that only assign one register
/// and test it.
struct Region<'graph> {
	graph: &'graph Graph,
	web: u32,
	start: u16,
	join: u16,
	blocks: Set,
	destination: Option<SlotRef>,
	visits: usize,
}

impl Region<'_> {
	fn explore(&mut self, id: u16, current: &Leaf) -> Option<Value> {
		if id == self.join {
			return Some(Value::Leaf(current.clone()));
		}

		self.visits += 1;

		let graph = self.graph;
		let block = graph.block(id);

		if id <= self.start
			|| id > self.join
			|| self.visits > MAX_VISITS
			|| block.has_loop_hint
			|| block.close.is_some()
		{
			return None;
		}

		let assigned;
		let current = match block.statements.as_slice() {
			[] => current,
			[statement] => {
				let (slot, value) = as_slot_assignment(statement)?;

				if slot.web != self.web || reads_web(value, self.web) {
					return None;
				}

				if self.destination.is_none() {
					self.destination = Some(slot);
				}

				assigned = Leaf {
					origin: id,
					value: value.clone(),
				};

				&assigned
			}
			_ => return None,
		};

		self.blocks.grow_insert(id.into());

		match &block.warp {
			Warp::Jump(target) if *target > id => self.explore(*target, current),
			Warp::Branch(branch) if branch.taken > id && branch.fallthrough > id => {
				let taken = self.explore(branch.taken, current)?;
				let fallthrough = self.explore(branch.fallthrough, current)?;

				self.combine(&branch.condition, current, taken, fallthrough)
			}
			_ => None,
		}
	}

	fn combine(
		&self,
		condition: &Expression,
		current: &Leaf,
		taken: Value,
		fallthrough: Value,
	) -> Option<Value> {
		match find_test(condition) {
			Some((slot, true)) if slot.web == self.web => Value::test(current, taken, fallthrough),
			Some((slot, false)) if slot.web == self.web => Value::test(current, fallthrough, taken),
			_ if reads_web(condition, self.web) => None,
			_ => Value::choose(condition, &taken, &fallthrough),
		}
	}

	/// Whether control enters the region only through its start and nothing
	/// else runs between the start and the join.
	fn is_closed(&self) -> bool {
		let is_inside = |id: u16| id == self.start || self.blocks.contains(id.into());

		(self.start + 1..self.join).all(|id| {
			let mut predecessors = self.graph.predecessors(id);

			if self.blocks.contains(id.into()) {
				predecessors.all(|predecessor| is_inside(predecessor))
			} else {
				predecessors.next().is_none()
			}
		})
	}
}

impl Graph {
	/// Post dominators, with the function exit numbered `len()`.
	#[must_use]
	pub fn post_dominators(&self) -> Dominators {
		let exit = u16::try_from(self.len()).unwrap_or(u16::MAX);
		let mut reversed = vec![Vec::new(); self.len() + 1];

		for id in self.block_ids() {
			let mut has_successors = false;

			for successor in self.successors(id) {
				reversed[usize::from(successor)].push(id);
				has_successors = true;
			}

			if !has_successors {
				reversed[usize::from(exit)].push(id);
			}
		}

		Dominators::new(&reversed, exit)
	}

	/// The block all paths from `id` meet at again, if not the exit.
	fn find_join(&self, post_dominators: &Dominators, id: u16) -> Option<u16> {
		post_dominators
			.immediate(id)
			.filter(|&join| usize::from(join) < self.len() && join > id)
	}

	/// Moves the `x = d` of a test and copy pair into the test block, so the
	/// register being assigned is tested in place of its source.
	fn try_merge_copy(&mut self, slots: &SlotTable, id: u16) -> bool {
		let Warp::Branch(branch) = &self.block(id).warp else {
			return false;
		};

		let Some((source, jumps_if_truthy)) = find_test(&branch.condition) else {
			return false;
		};

		let copy_id = branch.taken;
		let copy = self.block(copy_id);
		let Some((destination, value)) = copy.statements.first().and_then(as_slot_assignment) else {
			return false;
		};

		let Warp::Jump(target) = copy.warp else {
			return false;
		};

		let is_copy = copy.statements.len() == 1
			&& copy_id > id
			&& target > copy_id
			&& !copy.has_loop_hint
			&& copy.close.is_none()
			&& self.predecessors(copy_id).eq(core::iter::once(id))
			&& destination.web != source.web
			&& value.as_slot().is_some_and(|slot| slot.web == source.web);

		// The other path has to overwrite the register before reading it.
		let is_overwritten = branch.fallthrough > id
			&& self
				.block(branch.fallthrough)
				.statements
				.first()
				.and_then(as_slot_assignment)
				.is_some_and(|(slot, value)| {
					slot.web == destination.web && !reads_web(value, destination.web)
				});

		if !is_copy || !is_overwritten {
			return false;
		}

		let Some(statement) = self.block_mut(copy_id).statements.pop() else {
			return false;
		};

		let copy = self.block_mut(copy_id);

		copy.warp = Warp::End;
		copy.is_unreachable = true;

		let block = self.block_mut(id);

		if let Warp::Branch(branch) = &mut block.warp {
			branch.condition = test_condition(destination, jumps_if_truthy);
			branch.taken = target;
		}

		block.statements.push(statement);

		Self::merge_source(&mut block.statements, slots, source);

		true
	}

	/// Turns `d = v; x = d` into `x = v` when nothing else reads `d`.
	fn merge_source(statements: &mut Vec<Statement>, slots: &SlotTable, source: SlotRef) {
		let Some(index) = statements.len().checked_sub(2) else {
			return;
		};

		let is_scratch = slots.get(source).is_some_and(|web| {
			web.definitions == 1 && web.reads == 2 && (web.name.is_none() || web.is_generated)
		});

		let defines_source = as_slot_assignment(&statements[index])
			.is_some_and(|(slot, value)| slot.web == source.web && !value.is_multiple());

		if !is_scratch || !defines_source {
			return;
		}

		let Statement::Assign(definition) = statements.remove(index) else {
			return;
		};

		let Assign { mut sources, .. } = *definition;

		if let (Some(Statement::Assign(copy)), Some(value)) = (statements.last_mut(), sources.pop()) {
			copy.sources = vec![value];
		}
	}

	/// The registers a value region starting at `id` may compute, each with
	/// whether the last statement of `id` gives its first value. A register
	/// tested by the branch comes first.
	fn find_targets(&self, id: u16, join: u16, condition: &Expression) -> Vec<(SlotRef, bool)> {
		let block = self.block(id);
		let mut targets = Vec::new();

		if let Some((slot, _)) = find_test(condition) {
			let is_defined = block
				.statements
				.last()
				.and_then(as_slot_assignment)
				.is_some_and(|(destination, value)| {
					destination.web == slot.web && !reads_web(value, slot.web)
				});

			targets.push((slot, is_defined));
		}

		let assigned = (id + 1..join)
			.filter(|&inner| self.predecessors(inner).next().is_some())
			.find_map(|inner| match self.block(inner).statements.as_slice() {
				[statement] => as_slot_assignment(statement).map(|(slot, _)| slot),
				_ => None,
			});

		if let Some(slot) = assigned
			&& targets.iter().all(|(target, _)| target.web != slot.web)
		{
			targets.push((slot, false));
		}

		targets
	}

	/// Explores the region of `id` computing `slot`, returning its value and
	/// the blocks it covers.
	fn find_value(
		&self,
		id: u16,
		join: u16,
		slot: SlotRef,
		is_defined: bool,
	) -> Option<(Value, SlotRef, Set)> {
		let block = self.block(id);
		let Warp::Branch(branch) = &block.warp else {
			return None;
		};

		let current = match block.statements.last().and_then(as_slot_assignment) {
			Some((_, value)) if is_defined => Leaf {
				origin: id,
				value: value.clone(),
			},
			_ => Leaf {
				origin: INCOMING,
				value: Expression::Slot(slot),
			},
		};

		let mut region = Region {
			graph: self,
			web: slot.web,
			start: id,
			join,
			blocks: Set::new(),
			destination: None,
			visits: 0,
		};

		let taken = region.explore(branch.taken, &current)?;
		let fallthrough = region.explore(branch.fallthrough, &current)?;
		let value = region.combine(&branch.condition, &current, taken, fallthrough)?;

		if value.has_repeats() || !region.is_closed() {
			return None;
		}

		// A region only reading the value it was entered with assigns nothing.
		let destination = region.destination.or(is_defined.then_some(slot))?;

		Some((value, destination, region.blocks))
	}

	fn try_fold_value(&mut self, post_dominators: &Dominators, id: u16) -> bool {
		let block = self.block(id);
		let Warp::Branch(branch) = &block.warp else {
			return false;
		};

		let is_dead = id != 0 && self.predecessors(id).next().is_none();

		if is_dead || block.has_loop_hint || block.close.is_some() {
			return false;
		}

		let Some(join) = self.find_join(post_dominators, id) else {
			return false;
		};

		let found = self
			.find_targets(id, join, &branch.condition)
			.into_iter()
			.find_map(|(slot, is_defined)| {
				self.find_value(id, join, slot, is_defined)
					.map(|found| (found, is_defined))
			});

		let Some(((value, destination, blocks), is_defined)) = found else {
			return false;
		};

		for inner in id + 1..join {
			if blocks.contains(inner.into()) {
				let block = self.block_mut(inner);

				block.statements.clear();
				block.warp = Warp::End;
				block.is_unreachable = true;
			}
		}

		let block = self.block_mut(id);

		if is_defined {
			block.statements.pop();
		}

		block.statements.push(Statement::single(
			Expression::Slot(destination),
			value.into_expression(),
		));
		block.warp = Warp::Jump(join);

		true
	}

	/// Folds the value forms of `and` and `or` whose operands each get their
	/// own block into a single assignment. Returns the number of regions
	/// folded.
	pub fn fold_values(&mut self, slots: &SlotTable) -> usize {
		let mut merged = false;

		for id in self.block_ids() {
			merged |= self.try_merge_copy(slots, id);
		}

		if merged {
			self.compute_predecessors();
		}

		let mut folded = 0;
		let mut post_dominators = self.post_dominators();

		for id in self.block_ids() {
			if self.try_fold_value(&post_dominators, id) {
				self.compute_predecessors();

				post_dominators = self.post_dominators();
				folded += 1;
			}
		}

		folded
	}
}
