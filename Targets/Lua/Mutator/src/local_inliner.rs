use alloc::vec::Vec;
use lua_tree::{
	expression::{BinaryOperator, Expression},
	function::Function,
	slot::{SlotRef, SlotTable},
	statement::{Sequence, Statement},
};

use crate::Uses;

/// The expressions of a statement evaluated exactly once, before anything
/// else the statement does.
fn for_each_eager<H: FnMut(&mut Expression)>(statement: &mut Statement, handler: &mut H) {
	match statement {
		Statement::Assign(assign) => assign.sources.iter_mut().for_each(handler),
		Statement::Local(local) => local.values.iter_mut().for_each(handler),
		Statement::Call(call) => handler(call),
		Statement::Return(data) => data.values.iter_mut().for_each(handler),
		Statement::If(data) => handler(&mut data.condition),
		Statement::NumericFor(data) => {
			handler(&mut data.start);
			handler(&mut data.limit);
			handler(&mut data.step);
		}
		Statement::GenericFor(data) => data.iterators.iter_mut().for_each(handler),
		_ => {}
	}
}

fn reads_web(expression: &Expression, web: u32) -> bool {
	expression.any(|expression| matches!(expression, Expression::Slot(slot) if slot.web == web))
}

/// Whether `web` is only read when a short circuit operator gets that far.
fn is_read_lazily(expression: &Expression, web: u32) -> bool {
	expression.any(|expression| match expression {
		Expression::Binary(binary) => {
			matches!(binary.operator, BinaryOperator::And | BinaryOperator::Or)
				&& reads_web(&binary.rhs, web)
		}
		_ => false,
	})
}

/// Puts the value of a generated local read once by the next statement in
/// place of that read.
pub struct LocalInliner {
	inlined: usize,
}

impl LocalInliner {
	#[must_use]
	pub const fn new() -> Self {
		Self { inlined: 0 }
	}

	/// The local declared by `statement` with a single value, if its name
	/// was made up.
	fn find_candidate(statement: &Statement, slots: &SlotTable) -> Option<SlotRef> {
		let Statement::Local(local) = statement else {
			return None;
		};

		let ([name], [value]) = (local.names.as_slice(), local.values.as_slice()) else {
			return None;
		};

		let is_generated = slots.get(*name).is_some_and(|web| web.is_generated);

		(is_generated && !value.is_multiple()).then_some(*name)
	}

	fn can_inline(list: &mut [Statement], name: SlotRef, children: &[Function<Sequence>]) -> bool {
		let Some((reader, rest)) = list.split_first_mut() else {
			return false;
		};

		let mut uses = Uses::new(name.web, children);

		reader.for_each_slot(&mut uses);
		rest.iter_mut()
			.for_each(|statement| statement.for_each_slot(&mut uses));

		if uses.reads != 1 || uses.writes != 0 {
			return false;
		}

		let mut eager = Uses::new(name.web, children);
		let mut is_lazy = false;

		for_each_eager(reader, &mut |expression| {
			eager.add_expression(expression);
			is_lazy |= is_read_lazily(expression, name.web);
		});

		eager.reads == 1 && !is_lazy
	}

	fn substitute(statement: &mut Statement, web: u32, value: &mut Option<Expression>) {
		for_each_eager(statement, &mut |expression| {
			expression.for_each_mut(&mut |expression| {
				if matches!(expression, Expression::Slot(slot) if slot.web == web)
					&& let Some(value) = value.take()
				{
					*expression = value;
				}
			});
		});
	}

	fn inline_at(
		&mut self,
		list: &mut Vec<Statement>,
		index: usize,
		slots: &SlotTable,
		children: &[Function<Sequence>],
	) -> bool {
		let Some(name) = Self::find_candidate(&list[index], slots) else {
			return false;
		};

		if !Self::can_inline(&mut list[index + 1..], name, children) {
			return false;
		}

		let Statement::Local(local) = list.remove(index) else {
			return false;
		};

		let mut value = local.values.into_iter().next();

		Self::substitute(&mut list[index], name.web, &mut value);

		self.inlined += 1;

		true
	}

	fn run_sequence(
		&mut self,
		sequence: &mut Sequence,
		slots: &SlotTable,
		children: &[Function<Sequence>],
	) {
		let mut index = 0;

		while index + 1 < sequence.list.len() {
			if !self.inline_at(&mut sequence.list, index, slots, children) {
				index += 1;
			}
		}
	}

	/// Returns the number of locals inlined.
	pub fn run(
		&mut self,
		body: &mut Sequence,
		slots: &SlotTable,
		children: &[Function<Sequence>],
	) -> usize {
		self.inlined = 0;

		body.for_each_sequence_post_mut(&mut |sequence| self.run_sequence(sequence, slots, children));

		tracing::trace!(inlined = self.inlined, "inlined locals");

		self.inlined
	}
}

impl Default for LocalInliner {
	fn default() -> Self {
		Self::new()
	}
}
