use alloc::{boxed::Box, vec, vec::Vec};
use lua_tree::{
	expression::{Expression, FunctionLiteral},
	function::Function,
	slot::{SlotKind, SlotRef, SlotTable},
	statement::{
		Assign, LocalDeclaration, LocalFunction, Sequence, SlotHandler, Statement,
		read_expression,
	},
};
use set::Set;

/// Collects the webs a piece of code touches, counting closures that
/// capture them.
struct References<'function> {
	children: &'function [Function<Sequence>],
	webs: Set,
}

impl<'function> References<'function> {
	fn new(children: &'function [Function<Sequence>]) -> Self {
		Self {
			children,
			webs: Set::new(),
		}
	}

	fn take(&mut self) -> Set {
		core::mem::replace(&mut self.webs, Set::new())
	}
}

impl SlotHandler for References<'_> {
	fn read(&mut self, slot: &mut SlotRef) {
		if slot.is_resolved() {
			self.webs.grow_insert(slot.web as usize);
		}
	}

	fn write(&mut self, slot: &mut SlotRef) {
		self.read(slot);
	}

	fn closure(&mut self, function: FunctionLiteral) {
		let Some(child) = self.children.get(usize::from(function.child)) else {
			return;
		};

		for link in child.upvalues.iter().filter_map(|upvalue| upvalue.link) {
			self.webs.grow_insert(link as usize);
		}
	}
}

/// The webs bound by parameters, loops and existing declarations.
struct Bound {
	webs: Set,
}

impl Bound {
	fn add(&mut self, slot: SlotRef) {
		if slot.is_resolved() {
			self.webs.grow_insert(slot.web as usize);
		}
	}

	fn add_statement(&mut self, statement: &Statement) {
		match statement {
			Statement::NumericFor(data) => self.add(data.variable),
			Statement::GenericFor(data) => data.variables.iter().for_each(|&slot| self.add(slot)),
			Statement::Local(local) => local.names.iter().for_each(|&slot| self.add(slot)),
			Statement::LocalFunction(local) => self.add(local.name),
			_ => {}
		}
	}
}

fn is_loop(statement: &Statement) -> bool {
	matches!(
		statement,
		Statement::While(_)
			| Statement::RepeatUntil(_)
			| Statement::NumericFor(_)
			| Statement::GenericFor(_)
	)
}

/// Where one web gets declared within a sequence.
enum Placement {
	Here(usize),
	Nested(usize, usize),
}

/// Inserts a declaration for every local variable at the innermost point
/// that still encloses all of its uses.
pub struct DefinitionMarker {
	declared: usize,
}

impl DefinitionMarker {
	#[must_use]
	pub const fn new() -> Self {
		Self { declared: 0 }
	}

	fn find_pending(function: &mut Function<Sequence>) -> Vec<u32> {
		let mut bound = Bound { webs: Set::new() };

		for &parameter in &function.parameters {
			bound.add(parameter);
		}

		function
			.body
			.for_each_statement_mut(&mut |statement| bound.add_statement(statement));

		function
			.slots
			.webs
			.iter()
			.enumerate()
			.filter(|(index, web)| web.kind != SlotKind::Temporary && !bound.webs.contains(*index))
			.filter_map(|(index, _)| u32::try_from(index).ok())
			.collect()
	}

	/// The webs referenced by the statement outside of its nested sequences.
	fn direct_references(statement: &mut Statement, references: &mut References) -> Set {
		statement.for_each_expression_mut(&mut |expression| {
			read_expression(expression, references);
		});

		match statement {
			Statement::NumericFor(data) => references.write(&mut data.variable),
			Statement::GenericFor(data) => data
				.variables
				.iter_mut()
				.for_each(|variable| references.write(variable)),
			Statement::Local(local) => local
				.names
				.iter_mut()
				.for_each(|name| references.write(name)),
			Statement::LocalFunction(local) => {
				references.write(&mut local.name);
				references.closure(local.function);
			}
			_ => {}
		}

		references.take()
	}

	fn nested_references(statement: &mut Statement, references: &mut References) -> Vec<Set> {
		let mut nested = Vec::new();

		statement.for_each_sequence_mut(&mut |sequence| {
			sequence.for_each_slot(references);
			nested.push(references.take());
		});

		nested
	}

	/// Whether the first statement of `sequence` touching `web` overwrites
	/// it without reading it.
	fn starts_with_write(sequence: &mut Sequence, web: u32, children: &[Function<Sequence>]) -> bool {
		let key = web as usize;
		let mut references = References::new(children);

		for statement in &mut sequence.list {
			statement.for_each_slot(&mut references);

			if !references.take().contains(key) {
				continue;
			}

			let Statement::Assign(assign) = statement else {
				return false;
			};

			let Assign {
				destinations,
				sources,
			} = assign.as_mut();

			let writes = destinations
				.iter()
				.any(|destination| destination.as_slot().is_some_and(|slot| slot.web == web));

			sources
				.iter_mut()
				.for_each(|source| read_expression(source, &mut references));

			for destination in destinations {
				if let Expression::Index(index) = destination {
					read_expression(&mut index.table, &mut references);
					read_expression(&mut index.key, &mut references);
				}
			}

			return writes && !references.webs.contains(key);
		}

		false
	}

	fn is_written_first(
		statement: &mut Statement,
		nested: usize,
		web: u32,
		children: &[Function<Sequence>],
	) -> bool {
		let mut position = 0;
		let mut result = false;

		statement.for_each_sequence_mut(&mut |sequence| {
			if position == nested {
				result = Self::starts_with_write(sequence, web, children);
			}

			position += 1;
		});

		result
	}

	fn find_placement(
		list: &mut [Statement],
		deep: &[Set],
		web: u32,
		children: &[Function<Sequence>],
	) -> Option<Placement> {
		let key = web as usize;
		let mut users = deep.iter().enumerate().filter(|(_, set)| set.contains(key));
		let (first, _) = users.next()?;

		if users.next().is_some() {
			return Some(Placement::Here(first));
		}

		let statement = &mut list[first];
		let mut references = References::new(children);

		if Self::direct_references(statement, &mut references).contains(key) {
			return Some(Placement::Here(first));
		}

		let nested = Self::nested_references(statement, &mut references);
		let mut holders = nested.iter().enumerate().filter(|(_, set)| set.contains(key));

		let placement = match (holders.next(), holders.next()) {
			(Some((position, _)), None) => {
				// A value carried between iterations must outlive the loop.
				if is_loop(statement) && !Self::is_written_first(statement, position, web, children) {
					Placement::Here(first)
				} else {
					Placement::Nested(first, position)
				}
			}
			_ => Placement::Here(first),
		};

		Some(placement)
	}

	fn place(
		&mut self,
		sequence: &mut Sequence,
		pending: &[u32],
		slots: &SlotTable,
		children: &[Function<Sequence>],
	) {
		if pending.is_empty() {
			return;
		}

		let mut references = References::new(children);
		let deep: Vec<Set> = sequence
			.list
			.iter_mut()
			.map(|statement| {
				statement.for_each_slot(&mut references);
				references.take()
			})
			.collect();

		let mut here: Vec<(usize, u32)> = Vec::new();
		let mut nested: Vec<(usize, usize, u32)> = Vec::new();

		for &web in pending {
			match Self::find_placement(&mut sequence.list, &deep, web, children) {
				Some(Placement::Here(index)) => here.push((index, web)),
				Some(Placement::Nested(index, position)) => nested.push((index, position, web)),
				None => {}
			}
		}

		nested.sort_unstable();

		for group in nested.chunk_by(|lhs, rhs| lhs.0 == rhs.0 && lhs.1 == rhs.1) {
			let (index, position, _) = group[0];
			let webs: Vec<u32> = group.iter().map(|&(_, _, web)| web).collect();
			let mut current = 0;

			sequence.list[index].for_each_sequence_mut(&mut |sequence| {
				if current == position {
					self.place(sequence, &webs, slots, children);
				}

				current += 1;
			});
		}

		here.sort_unstable();

		for group in here.chunk_by(|lhs, rhs| lhs.0 == rhs.0).rev() {
			let index = group[0].0;
			let mut webs: Vec<u32> = group.iter().map(|&(_, web)| web).collect();

			webs.sort_by_key(|&web| (slots.webs[web as usize].slot, web));

			self.declare(&mut sequence.list, index, &webs, slots, children);
		}
	}

	/// Turns an assignment into the declaration when it defines exactly
	/// the declared variables from values that do not read them.
	fn try_convert(
		statement: &mut Statement,
		webs: &[u32],
		children: &[Function<Sequence>],
	) -> Option<Vec<u32>> {
		let Statement::Assign(assign) = statement else {
			return None;
		};

		let Assign {
			destinations,
			sources,
		} = assign.as_mut();

		let mut names = Vec::with_capacity(destinations.len());

		for destination in destinations.iter() {
			let slot = destination.as_slot()?;

			if !webs.contains(&slot.web) || names.iter().any(|name: &SlotRef| name.web == slot.web) {
				return None;
			}

			names.push(slot);
		}

		let mut references = References::new(children);

		sources
			.iter_mut()
			.for_each(|source| read_expression(source, &mut references));

		let captured = names
			.iter()
			.any(|name| references.webs.contains(name.web as usize));

		let converted = match sources.as_slice() {
			[Expression::Function(function)] if names.len() == 1 && captured => {
				Statement::LocalFunction(LocalFunction {
					name: names[0],
					function: *function,
				})
			}
			_ if captured => return None,
			_ => Statement::Local(Box::new(LocalDeclaration {
				names: names.clone(),
				values: core::mem::take(sources),
			})),
		};

		*statement = converted;

		Some(names.iter().map(|name| name.web).collect())
	}

	fn declare(
		&mut self,
		list: &mut Vec<Statement>,
		index: usize,
		webs: &[u32],
		slots: &SlotTable,
		children: &[Function<Sequence>],
	) {
		let converted = Self::try_convert(&mut list[index], webs, children).unwrap_or_default();
		let names: Vec<SlotRef> = webs
			.iter()
			.filter(|web| !converted.contains(web))
			.map(|&web| SlotRef {
				index: slots.webs[web as usize].slot,
				web,
				variable: None,
			})
			.collect();

		self.declared += webs.len();

		if !names.is_empty() {
			let declaration = LocalDeclaration {
				names,
				values: vec![],
			};

			list.insert(index, Statement::Local(Box::new(declaration)));
		}
	}

	/// Declares the locals of `function`, not looking into its children.
	pub fn run(&mut self, function: &mut Function<Sequence>) {
		let pending = Self::find_pending(function);
		let Function {
			body,
			slots,
			children,
			..
		} = function;

		self.declared = 0;
		self.place(body, &pending, slots, children);

		tracing::debug!(
			depth = function.depth,
			declared = self.declared,
			"placed local declarations"
		);
	}
}

impl Default for DefinitionMarker {
	fn default() -> Self {
		Self::new()
	}
}
