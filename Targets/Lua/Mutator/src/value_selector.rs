use alloc::{boxed::Box, vec, vec::Vec};
use lua_tree::{
	expression::{BinaryOperator, Expression, UnaryOperator},
	statement::{Assign, If, LocalDeclaration, Sequence, Statement},
};

/// The destination and value of a sequence holding one plain assignment.
fn single_assignment(sequence: &Sequence) -> Option<(&Expression, &Expression)> {
	let [Statement::Assign(assign)] = sequence.list.as_slice() else {
		return None;
	};

	match (assign.destinations.as_slice(), assign.sources.as_slice()) {
		([destination @ Expression::Slot(_)], [source]) => Some((destination, source)),
		_ => None,
	}
}

fn is_same(lhs: &Expression, rhs: &Expression) -> bool {
	match (lhs, rhs) {
		(Expression::Slot(lhs), Expression::Slot(rhs)) => lhs.web == rhs.web,
		_ => lhs == rhs,
	}
}

fn find_operator(data: &If) -> Option<BinaryOperator> {
	if !data.else_ifs.is_empty() {
		return None;
	}

	let (destination, value) = single_assignment(&data.then)?;
	let (other, _) = single_assignment(data.otherwise.as_ref()?)?;

	if !is_same(destination, other) {
		return None;
	}

	match &data.condition {
		Expression::Unary(unary)
			if unary.operator == UnaryOperator::Not && is_same(&unary.source, value) =>
		{
			Some(BinaryOperator::And)
		}
		condition if is_same(condition, value) => Some(BinaryOperator::Or),
		_ => None,
	}
}

/// The web and operator of `if not x then x = y end`, which keeps `x` unless
/// it is falsy, or of `if x then x = y end`.
fn find_guard(data: &If) -> Option<(u32, BinaryOperator)> {
	if !data.else_ifs.is_empty() || data.otherwise.is_some() {
		return None;
	}

	let (Expression::Slot(destination), value) = single_assignment(&data.then)? else {
		return None;
	};

	if value.any(|expression| matches!(expression, Expression::Slot(slot) if slot.web == destination.web)) {
		return None;
	}

	let (tested, operator) = match &data.condition {
		Expression::Unary(unary) if unary.operator == UnaryOperator::Not => {
			(&unary.source, BinaryOperator::Or)
		}
		condition => (condition, BinaryOperator::And),
	};

	match tested {
		Expression::Slot(slot) if slot.web == destination.web => Some((destination.web, operator)),
		_ => None,
	}
}

/// The only value given to `web` by an assignment or a declaration.
fn guarded_value(statement: &mut Statement, web: u32) -> Option<&mut Expression> {
	match statement {
		Statement::Assign(assign) => {
			let Assign {
				destinations,
				sources,
			} = assign.as_mut();

			match (destinations.as_slice(), sources.as_mut_slice()) {
				([Expression::Slot(slot)], [source]) if slot.web == web => Some(source),
				_ => None,
			}
		}
		Statement::Local(local) => {
			let LocalDeclaration { names, values } = local.as_mut();

			match (names.as_slice(), values.as_mut_slice()) {
				([name], [value]) if name.web == web => Some(value),
				_ => None,
			}
		}
		_ => None,
	}
}

fn take_assignment(sequence: Option<Sequence>) -> Option<Box<Assign>> {
	match sequence?.list.pop()? {
		Statement::Assign(assign) => Some(assign),
		_ => None,
	}
}

/// Turns `if a then x = a else x = b end` into `x = a or b`, and the test
/// of `not a` into `x = a and b`. A value followed by
/// `if not x then x = b end` becomes `x = a or b` the same way.
pub struct ValueSelector {
	selected: usize,
}

impl ValueSelector {
	#[must_use]
	pub const fn new() -> Self {
		Self { selected: 0 }
	}

	fn select(statement: &mut Statement) -> Option<Statement> {
		let Statement::If(data) = statement else {
			return None;
		};

		let operator = find_operator(data)?;
		let If {
			then, otherwise, ..
		} = data.as_mut();

		let first = take_assignment(Some(core::mem::take(then)))?;
		let second = take_assignment(otherwise.take())?;

		let Assign {
			destinations,
			sources: first,
		} = *first;

		let lhs = first.into_iter().next()?;
		let rhs = second.sources.into_iter().next()?;

		Some(Statement::assign(
			destinations,
			vec![Expression::binary(operator, lhs, rhs)],
		))
	}

	/// Moves the value into a `local` without values declaring only the
	/// destination right before it.
	fn merge_declaration(list: &mut Vec<Statement>, index: usize) -> bool {
		let Some(Statement::Local(local)) = index.checked_sub(1).map(|index| &list[index]) else {
			return false;
		};

		let Statement::Assign(assign) = &list[index] else {
			return false;
		};

		let is_declaration = match (local.names.as_slice(), assign.destinations.as_slice()) {
			([name], [Expression::Slot(slot)]) => local.values.is_empty() && name.web == slot.web,
			_ => false,
		};

		if !is_declaration {
			return false;
		}

		let Statement::Assign(assign) = list.remove(index) else {
			return false;
		};

		if let Statement::Local(local) = &mut list[index - 1] {
			let LocalDeclaration { values, .. } = local.as_mut();

			*values = assign.sources;
		}

		true
	}

	/// Folds the guard at `index` into the value given right before it.
	fn merge_guard(list: &mut Vec<Statement>, index: usize) -> bool {
		let Some(Statement::If(data)) = list.get(index) else {
			return false;
		};

		let Some((web, operator)) = find_guard(data) else {
			return false;
		};

		let Some(previous) = index.checked_sub(1) else {
			return false;
		};

		if guarded_value(&mut list[previous], web).is_none() {
			return false;
		}

		let Statement::If(data) = list.remove(index) else {
			return false;
		};

		let If { then, .. } = *data;
		let Some(rhs) = take_assignment(Some(then)).and_then(|assign| assign.sources.into_iter().next())
		else {
			return false;
		};

		let Some(value) = guarded_value(&mut list[previous], web) else {
			return false;
		};

		let lhs = core::mem::replace(value, Expression::NIL);

		*value = Expression::binary(operator, lhs, rhs);

		true
	}

	fn run_sequence(&mut self, sequence: &mut Sequence) {
		let mut index = 0;

		while index < sequence.list.len() {
			if Self::merge_guard(&mut sequence.list, index) {
				self.selected += 1;

				continue;
			}

			let statement = &mut sequence.list[index];

			if let Some(selected) = Self::select(statement) {
				*statement = selected;
				self.selected += 1;

				if Self::merge_declaration(&mut sequence.list, index) {
					continue;
				}
			}

			index += 1;
		}
	}

	pub fn run(&mut self, body: &mut Sequence) {
		self.selected = 0;

		body.for_each_sequence_post_mut(&mut |sequence| self.run_sequence(sequence));

		tracing::trace!(selected = self.selected, "selected values");
	}
}

impl Default for ValueSelector {
	fn default() -> Self {
		Self::new()
	}
}
