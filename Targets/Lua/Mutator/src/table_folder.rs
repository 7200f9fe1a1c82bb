use alloc::vec::Vec;
use lua_tree::{
	expression::{Expression, TableConstructor, TableEntry},
	function::Function,
	slot::SlotRef,
	statement::{Sequence, Statement},
};

use crate::Uses;

/// The variable and constructor of a statement making a fresh table.
fn find_constructor(statement: &mut Statement) -> Option<(SlotRef, &mut TableConstructor)> {
	let (name, value) = match statement {
		Statement::Local(local) => match (local.names.as_slice(), local.values.as_mut_slice()) {
			([name], [value]) => (*name, value),
			_ => return None,
		},
		Statement::Assign(assign) => {
			match (assign.destinations.as_slice(), assign.sources.as_mut_slice()) {
				([Expression::Slot(name)], [value]) => (*name, value),
				_ => return None,
			}
		}
		_ => return None,
	};

	match value {
		Expression::Table(table) => Some((name, table)),
		_ => None,
	}
}

/// Moves the stores into a fresh table that directly follow its creation
/// into the constructor.
pub struct TableFolder {
	folded: usize,
}

impl TableFolder {
	#[must_use]
	pub const fn new() -> Self {
		Self { folded: 0 }
	}

	fn is_unused(expression: &mut Expression, web: u32, children: &[Function<Sequence>]) -> bool {
		let mut uses = Uses::new(web, children);

		uses.add_expression(expression);

		uses.total() == 0
	}

	/// Takes the entry a store adds, if it stores a new key into `table`
	/// without otherwise touching it.
	fn take_entry(
		statement: &mut Statement,
		table: SlotRef,
		constructor: &TableConstructor,
		children: &[Function<Sequence>],
	) -> Option<TableEntry> {
		let Statement::Assign(assign) = statement else {
			return None;
		};

		let ([Expression::Index(index)], [value]) =
			(assign.destinations.as_mut_slice(), assign.sources.as_mut_slice())
		else {
			return None;
		};

		let is_store = index.table.as_slot().is_some_and(|slot| slot.web == table.web)
			&& !value.is_multiple()
			&& !constructor.entries.iter().any(|entry| entry.key == index.key)
			&& Self::is_unused(&mut index.key, table.web, children)
			&& Self::is_unused(value, table.web, children);

		is_store.then(|| TableEntry {
			key: core::mem::replace(&mut index.key, Expression::NIL),
			value: core::mem::replace(value, Expression::NIL),
		})
	}

	/// Takes the multiple value a `SetList` appends to `table`, if it
	/// continues the array part of `constructor`.
	fn take_tail(
		statement: &mut Statement,
		table: SlotRef,
		constructor: &TableConstructor,
		children: &[Function<Sequence>],
	) -> Option<Expression> {
		let Statement::SetList(set_list) = statement else {
			return None;
		};

		let is_tail = set_list.table.as_slot().is_some_and(|slot| slot.web == table.web)
			&& set_list.start == constructor.next_index()
			&& Self::is_unused(&mut set_list.values, table.web, children);

		is_tail.then(|| core::mem::replace(&mut set_list.values, Expression::NIL))
	}

	fn fold_at(&mut self, list: &mut Vec<Statement>, index: usize, children: &[Function<Sequence>]) {
		let (head, tail) = list.split_at_mut(index + 1);
		let Some((table, constructor)) = find_constructor(&mut head[index]) else {
			return;
		};

		let mut absorbed = 0;

		for statement in tail.iter_mut() {
			if constructor.tail.is_some() {
				break;
			}

			if let Some(tail) = Self::take_tail(statement, table, constructor, children) {
				constructor.tail = Some(tail);
			} else if let Some(entry) = Self::take_entry(statement, table, constructor, children) {
				constructor.entries.push(entry);
			} else {
				break;
			}

			absorbed += 1;
		}

		list.drain(index + 1..index + 1 + absorbed);

		self.folded += absorbed;
	}

	fn run_sequence(&mut self, sequence: &mut Sequence, children: &[Function<Sequence>]) {
		let mut index = 0;

		while index < sequence.list.len() {
			self.fold_at(&mut sequence.list, index, children);

			index += 1;
		}
	}

	/// Returns the number of stores folded.
	pub fn run(&mut self, body: &mut Sequence, children: &[Function<Sequence>]) -> usize {
		self.folded = 0;

		body.for_each_sequence_post_mut(&mut |sequence| self.run_sequence(sequence, children));

		tracing::trace!(folded = self.folded, "folded table stores");

		self.folded
	}
}

impl Default for TableFolder {
	fn default() -> Self {
		Self::new()
	}
}
