use alloc::{format, string::ToString, sync::Arc, vec::Vec};
use control_flow_graph::{Block, Graph, Warp};
use lua_tree::{
	expression::{Constant, Expression},
	function::Function,
	slot::{SlotKind, SlotRef, SlotTable},
	statement::{SlotHandler, Statement},
};
use set::Set;

use crate::error::EliminationError;

struct ReadCounter {
	web: u32,
	reads: u32,
}

impl SlotHandler for ReadCounter {
	fn read(&mut self, slot: &mut SlotRef) {
		if slot.web == self.web {
			self.reads += 1;
		}
	}

	fn write(&mut self, _slot: &mut SlotRef) {}
}

struct WriteCollector {
	slots: Set,
}

impl SlotHandler for WriteCollector {
	fn read(&mut self, _slot: &mut SlotRef) {}

	fn write(&mut self, slot: &mut SlotRef) {
		self.slots.grow_insert(slot.index.into());
	}
}

/// How a definition of temporaries can be folded away.
enum Shape {
	Single,
	Nil,
	Multiple,
	Other,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Reader {
	Statement(usize),
	Warp,
}

/// Counts the reads of `web` from statement `start` on and finds the first.
fn find_reader(block: &mut Block, start: usize, web: u32) -> (u32, Option<Reader>) {
	let mut counter = ReadCounter { web, reads: 0 };
	let mut reader = None;

	for (index, statement) in block.statements.iter_mut().enumerate().skip(start) {
		let before = counter.reads;

		statement.for_each_slot(&mut counter);

		if reader.is_none() && counter.reads != before {
			reader = Some(Reader::Statement(index));
		}
	}

	let before = counter.reads;

	block.warp.for_each_read(&mut counter);

	if reader.is_none() && counter.reads != before {
		reader = Some(Reader::Warp);
	}

	(counter.reads, reader)
}

/// Whether evaluating `source` after `statement` instead of before it can
/// change what either of them observes.
fn is_hazard(source: &Expression, statement: &mut Statement) -> bool {
	let mut writes = WriteCollector { slots: Set::new() };

	statement.for_each_slot(&mut writes);

	let overwrites = writes
		.slots
		.ascending()
		.any(|slot| u16::try_from(slot).is_ok_and(|slot| source.reads_slot(slot)));

	if overwrites {
		return true;
	}

	let mut calls = false;
	let mut reads_state = false;

	statement.for_each_expression_mut(&mut |expression| {
		calls |= expression.has_calls();
		reads_state |= expression.reads_state();
	});

	let writes_state = match statement {
		Statement::Assign(assign) => assign
			.destinations
			.iter()
			.any(|destination| destination.as_slot().is_none()),
		Statement::Local(_) | Statement::LocalFunction(_) => false,
		_ => true,
	};

	(source.reads_state() && (calls || writes_state)) || (source.has_calls() && reads_state)
}

fn substitute(expression: &mut Expression, web: u32, value: &mut Option<Expression>) {
	expression.for_each_mut(&mut |expression| {
		if matches!(expression, Expression::Slot(slot) if slot.web == web) {
			if let Some(value) = value.take() {
				*expression = value;
			}
		}
	});
}

/// Replaces the trailing `webs` of `list` with the multiple value `value`.
fn splice(list: &mut Vec<Expression>, webs: &[u32], value: &mut Option<Expression>) -> bool {
	if value.is_none() || list.len() < webs.len() {
		return false;
	}

	let start = list.len() - webs.len();
	let is_tail = list[start..]
		.iter()
		.zip(webs)
		.all(|(expression, &web)| expression.as_slot().is_some_and(|slot| slot.web == web));

	if is_tail {
		list.truncate(start);
		list.extend(value.take());
	}

	is_tail
}

fn splice_statement(statement: &mut Statement, webs: &[u32], value: &mut Option<Expression>) -> bool {
	let done = match statement {
		Statement::Assign(assign) => splice(&mut assign.sources, webs, value),
		Statement::Local(local) => splice(&mut local.values, webs, value),
		Statement::Return(ret) => splice(&mut ret.values, webs, value),
		_ => false,
	};

	if done {
		return true;
	}

	let mut done = false;

	statement.for_each_expression_mut(&mut |expression| {
		expression.for_each_mut(&mut |expression| {
			done |= match expression {
				Expression::Call(call) => splice(&mut call.arguments, webs, value),
				Expression::Method(method) => splice(&mut method.arguments, webs, value),
				_ => false,
			};
		});
	});

	done
}

/// Keeps a temporary as a named local when its value cannot be moved.
fn promote(slots: &mut SlotTable, slot: SlotRef) {
	let Some(web) = slots.webs.get_mut(slot.web as usize) else {
		return;
	};

	let index = web.slot;

	web.kind = SlotKind::Local;

	if web.name.is_none() {
		web.name = Some(Arc::from(format!("slot{index}_{}", slot.web)));
		web.is_generated = true;
	}
}

/// Folds every single use temporary into the expression that reads it.
pub struct TemporaryEliminator {
	recover: bool,
	inlined: usize,
}

impl TemporaryEliminator {
	/// With `recover` set, a failure leaves an error marker in the failing
	/// block and stops the pass instead of returning the error.
	#[must_use]
	pub const fn new(recover: bool) -> Self {
		Self {
			recover,
			inlined: 0,
		}
	}

	fn check_hazards(
		block: &mut Block,
		id: u16,
		index: usize,
		reader: Reader,
		slot: SlotRef,
	) -> Result<(), EliminationError> {
		let (head, tail) = block.statements.split_at_mut(index + 1);
		let Statement::Assign(assign) = &head[index] else {
			return Ok(());
		};

		let end = match reader {
			Reader::Statement(position) => position - index - 1,
			Reader::Warp => tail.len(),
		};

		for source in &assign.sources {
			for (offset, statement) in tail[..end].iter_mut().enumerate() {
				if is_hazard(source, statement) {
					return Err(EliminationError::Hazard {
						block: id,
						slot: slot.index,
						statement: index + 1 + offset,
					});
				}
			}
		}

		Ok(())
	}

	fn find_single_reader(
		block: &mut Block,
		id: u16,
		index: usize,
		slot: SlotRef,
	) -> Result<Reader, EliminationError> {
		match find_reader(block, index + 1, slot.web) {
			(1, Some(reader)) => Ok(reader),
			(reads, _) => Err(EliminationError::ReadCount {
				block: id,
				slot: slot.index,
				reads,
			}),
		}
	}

	fn substitute_at(block: &mut Block, reader: Reader, web: u32, value: &mut Option<Expression>) {
		match reader {
			Reader::Statement(position) => block.statements[position]
				.for_each_expression_mut(&mut |expression| substitute(expression, web, value)),
			Reader::Warp => block
				.warp
				.for_each_expression_mut(&mut |expression| substitute(expression, web, value)),
		}
	}

	fn inline_single(
		&mut self,
		block: &mut Block,
		id: u16,
		index: usize,
		slot: SlotRef,
	) -> Result<(), EliminationError> {
		let reader = Self::find_single_reader(block, id, index, slot)?;

		Self::check_hazards(block, id, index, reader, slot)?;

		let Statement::Assign(assign) = block.statements.remove(index) else {
			return Ok(());
		};

		let mut value = assign.sources.into_iter().next();
		let reader = match reader {
			Reader::Statement(position) => Reader::Statement(position - 1),
			Reader::Warp => Reader::Warp,
		};

		Self::substitute_at(block, reader, slot.web, &mut value);

		self.inlined += 1;

		Ok(())
	}

	/// Inlines the temporaries cleared by a multiple register `nil` load.
	fn inline_nil(
		&mut self,
		block: &mut Block,
		id: u16,
		index: usize,
		temporaries: &[SlotRef],
	) -> Result<(), EliminationError> {
		for &slot in temporaries {
			let reader = Self::find_single_reader(block, id, index, slot)?;

			Self::substitute_at(block, reader, slot.web, &mut Some(Expression::NIL));

			self.inlined += 1;
		}

		if let Statement::Assign(assign) = &mut block.statements[index] {
			assign.destinations.retain(|destination| {
				destination
					.as_slot()
					.is_none_or(|slot| !temporaries.contains(&slot))
			});

			if assign.destinations.is_empty() {
				block.statements.remove(index);
			}
		}

		Ok(())
	}

	/// Moves a multiple result producer into the list its results end, which
	/// is either a statement or the iterators of a generic `for`.
	fn inline_multiple(
		&mut self,
		block: &mut Block,
		slots: &mut SlotTable,
		id: u16,
		index: usize,
		temporaries: &[SlotRef],
	) -> Result<(), EliminationError> {
		let mut shared = None;

		for &slot in temporaries {
			let reader = Self::find_single_reader(block, id, index, slot)?;
			let has_list = reader != Reader::Warp || matches!(block.warp, Warp::GenericFor(_));

			if shared.is_some_and(|shared| shared != reader) || !has_list {
				temporaries.iter().for_each(|&slot| promote(slots, slot));

				return Ok(());
			}

			shared = Some(reader);
		}

		let Some(reader) = shared else {
			return Ok(());
		};

		Self::check_hazards(block, id, index, reader, temporaries[0])?;

		let webs: Vec<u32> = temporaries.iter().map(|slot| slot.web).collect();
		let mut value = match &mut block.statements[index] {
			Statement::Assign(assign) => assign.sources.pop(),
			_ => None,
		};

		let is_spliced = match (reader, &mut block.warp) {
			(Reader::Statement(position), _) => {
				splice_statement(&mut block.statements[position], &webs, &mut value)
			}
			(Reader::Warp, Warp::GenericFor(data)) => splice(&mut data.iterators, &webs, &mut value),
			(Reader::Warp, _) => false,
		};

		if is_spliced {
			block.statements.remove(index);

			self.inlined += temporaries.len();
		} else {
			if let (Statement::Assign(assign), Some(value)) = (&mut block.statements[index], value) {
				assign.sources.push(value);
			}

			temporaries.iter().for_each(|&slot| promote(slots, slot));
		}

		Ok(())
	}

	fn eliminate_block(
		&mut self,
		block: &mut Block,
		slots: &mut SlotTable,
		id: u16,
	) -> Result<(), EliminationError> {
		let mut index = block.statements.len();

		// Walking backwards inlines the last producer first, which keeps
		// every earlier producer adjacent to its reader.
		while index > 0 {
			index -= 1;

			let Statement::Assign(assign) = &block.statements[index] else {
				continue;
			};

			let temporaries: Vec<SlotRef> = assign
				.destinations
				.iter()
				.filter_map(Expression::as_slot)
				.filter(|&slot| slots.kind(slot) == SlotKind::Temporary)
				.collect();

			if temporaries.is_empty() {
				continue;
			}

			let shape = match assign.sources.as_slice() {
				[_] if assign.destinations.len() == 1 => Shape::Single,
				[Expression::Constant(Constant::Nil)] => Shape::Nil,
				[source] if temporaries.len() == assign.destinations.len() && source.is_multiple() => {
					Shape::Multiple
				}
				_ => Shape::Other,
			};

			match shape {
				Shape::Single => self.inline_single(block, id, index, temporaries[0])?,
				Shape::Nil => self.inline_nil(block, id, index, &temporaries)?,
				Shape::Multiple => self.inline_multiple(block, slots, id, index, &temporaries)?,
				Shape::Other => temporaries.iter().for_each(|&slot| promote(slots, slot)),
			}
		}

		Ok(())
	}

	fn run_function(&mut self, function: &mut Function<Graph>) -> Result<(), EliminationError> {
		let Function {
			body, slots, depth, ..
		} = function;

		for id in body.block_ids() {
			if let Err(error) = self.eliminate_block(body.block_mut(id), slots, id) {
				if self.recover {
					tracing::warn!(%error, depth = *depth, "kept temporaries");

					body.block_mut(id)
						.statements
						.insert(0, Statement::Error(error.to_string()));
				}

				return Err(error);
			}
		}

		Ok(())
	}

	/// Runs over `function` and its children.
	///
	/// # Errors
	///
	/// Returns an error if a temporary is not read exactly once or cannot
	/// be moved to its reader, unless recovering.
	pub fn run(&mut self, function: &mut Function<Graph>) -> Result<(), EliminationError> {
		self.inlined = 0;

		let result = function.try_for_each_mut(&mut |function| self.run_function(function));

		tracing::debug!(inlined = self.inlined, "eliminated temporaries");

		match result {
			Err(_) if self.recover => Ok(()),
			result => result,
		}
	}
}

impl Default for TemporaryEliminator {
	fn default() -> Self {
		Self::new(false)
	}
}
