use alloc::{boxed::Box, string::String, vec::Vec};

use crate::{
	expression::{Expression, FunctionLiteral},
	slot::SlotRef,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
	pub list: Vec<Statement>,
}

impl Sequence {
	#[must_use]
	pub const fn new() -> Self {
		Self { list: Vec::new() }
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	/// Whether control never leaves the end of the sequence normally.
	#[must_use]
	pub fn is_terminated(&self) -> bool {
		matches!(
			self.list.last(),
			Some(Statement::Return(_) | Statement::Break)
		)
	}
}

impl From<Vec<Statement>> for Sequence {
	fn from(list: Vec<Statement>) -> Self {
		Self { list }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
	pub destinations: Vec<Expression>,
	pub sources: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDeclaration {
	pub names: Vec<SlotRef>,
	pub values: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFunction {
	pub name: SlotRef,
	pub function: FunctionLiteral,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Return {
	pub values: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
	pub condition: Expression,
	pub code: Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
	pub condition: Expression,
	pub then: Sequence,
	pub else_ifs: Vec<ElseIf>,
	pub otherwise: Option<Sequence>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
	pub condition: Expression,
	pub code: Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatUntil {
	pub code: Sequence,
	pub condition: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericFor {
	pub variable: SlotRef,
	pub start: Expression,
	pub limit: Expression,
	pub step: Expression,
	pub code: Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericFor {
	pub variables: Vec<SlotRef>,
	pub iterators: Vec<Expression>,
	pub code: Sequence,
}

/// Stores a multiple value expression into consecutive array indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SetList {
	pub table: Expression,
	pub start: i64,
	pub values: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
	Assign(Box<Assign>),
	Local(Box<LocalDeclaration>),
	LocalFunction(LocalFunction),
	Call(Expression),
	Return(Box<Return>),
	Break,
	If(Box<If>),
	While(Box<While>),
	RepeatUntil(Box<RepeatUntil>),
	NumericFor(Box<NumericFor>),
	GenericFor(Box<GenericFor>),
	SetList(Box<SetList>),
	Do(Box<Sequence>),
	Error(String),
}

impl Statement {
	#[must_use]
	pub fn assign(destinations: Vec<Expression>, sources: Vec<Expression>) -> Self {
		Self::Assign(Box::new(Assign {
			destinations,
			sources,
		}))
	}

	#[must_use]
	pub fn single(destination: Expression, source: Expression) -> Self {
		Self::assign(alloc::vec![destination], alloc::vec![source])
	}

	#[must_use]
	pub fn returns(values: Vec<Expression>) -> Self {
		Self::Return(Box::new(Return { values }))
	}

	/// Calls the handler on every register the statement touches. Reads of a
	/// statement are reported before its writes.
	pub fn for_each_slot<H: SlotHandler>(&mut self, handler: &mut H) {
		match self {
			Self::Assign(assign) => {
				let Assign {
					destinations,
					sources,
				} = assign.as_mut();

				for source in sources {
					read_expression(source, handler);
				}

				for destination in destinations.iter_mut() {
					if let Expression::Index(index) = destination {
						read_expression(&mut index.table, handler);
						read_expression(&mut index.key, handler);
					}
				}

				for destination in destinations {
					if let Expression::Slot(slot) = destination {
						handler.write(slot);
					}
				}
			}
			Self::Local(local) => {
				let LocalDeclaration { names, values } = local.as_mut();

				for value in values {
					read_expression(value, handler);
				}

				names.iter_mut().for_each(|name| handler.write(name));
			}
			Self::LocalFunction(local) => {
				handler.write(&mut local.name);
				handler.closure(local.function);
			}
			Self::Call(call) => read_expression(call, handler),
			Self::Return(ret) => {
				for value in &mut ret.values {
					read_expression(value, handler);
				}
			}
			Self::SetList(set_list) => {
				read_expression(&mut set_list.table, handler);
				read_expression(&mut set_list.values, handler);
			}
			Self::If(data) => {
				let If {
					condition,
					then,
					else_ifs,
					otherwise,
				} = data.as_mut();

				read_expression(condition, handler);
				then.for_each_slot(handler);

				for else_if in else_ifs {
					read_expression(&mut else_if.condition, handler);
					else_if.code.for_each_slot(handler);
				}

				if let Some(otherwise) = otherwise {
					otherwise.for_each_slot(handler);
				}
			}
			Self::While(data) => {
				read_expression(&mut data.condition, handler);
				data.code.for_each_slot(handler);
			}
			Self::RepeatUntil(data) => {
				data.code.for_each_slot(handler);
				read_expression(&mut data.condition, handler);
			}
			Self::NumericFor(data) => {
				read_expression(&mut data.start, handler);
				read_expression(&mut data.limit, handler);
				read_expression(&mut data.step, handler);
				handler.write(&mut data.variable);
				data.code.for_each_slot(handler);
			}
			Self::GenericFor(data) => {
				for iterator in &mut data.iterators {
					read_expression(iterator, handler);
				}

				data.variables
					.iter_mut()
					.for_each(|variable| handler.write(variable));

				data.code.for_each_slot(handler);
			}
			Self::Do(sequence) => sequence.for_each_slot(handler),
			Self::Break | Self::Error(_) => {}
		}
	}

	/// Calls `handler` on every expression the statement holds directly,
	/// not looking into nested sequences.
	pub fn for_each_expression_mut<H: FnMut(&mut Expression)>(&mut self, handler: &mut H) {
		match self {
			Self::Assign(assign) => {
				assign.sources.iter_mut().for_each(&mut *handler);
				assign.destinations.iter_mut().for_each(handler);
			}
			Self::Local(local) => local.values.iter_mut().for_each(handler),
			Self::Call(call) => handler(call),
			Self::Return(ret) => ret.values.iter_mut().for_each(handler),
			Self::If(data) => {
				handler(&mut data.condition);
				data.else_ifs
					.iter_mut()
					.for_each(|else_if| handler(&mut else_if.condition));
			}
			Self::While(data) => handler(&mut data.condition),
			Self::RepeatUntil(data) => handler(&mut data.condition),
			Self::NumericFor(data) => {
				handler(&mut data.start);
				handler(&mut data.limit);
				handler(&mut data.step);
			}
			Self::GenericFor(data) => data.iterators.iter_mut().for_each(handler),
			Self::SetList(set_list) => {
				handler(&mut set_list.table);
				handler(&mut set_list.values);
			}
			Self::LocalFunction(_) | Self::Break | Self::Do(_) | Self::Error(_) => {}
		}
	}

	/// Calls `handler` on every nested sequence of the statement.
	pub fn for_each_sequence_mut<H: FnMut(&mut Sequence)>(&mut self, handler: &mut H) {
		match self {
			Self::If(data) => {
				handler(&mut data.then);

				for else_if in &mut data.else_ifs {
					handler(&mut else_if.code);
				}

				if let Some(otherwise) = &mut data.otherwise {
					handler(otherwise);
				}
			}
			Self::While(data) => handler(&mut data.code),
			Self::RepeatUntil(data) => handler(&mut data.code),
			Self::NumericFor(data) => handler(&mut data.code),
			Self::GenericFor(data) => handler(&mut data.code),
			Self::Do(sequence) => handler(sequence),
			_ => {}
		}
	}
}

impl Sequence {
	pub fn for_each_slot<H: SlotHandler>(&mut self, handler: &mut H) {
		self.list
			.iter_mut()
			.for_each(|statement| statement.for_each_slot(handler));
	}

	/// Visits every statement of this sequence and of all nested ones,
	/// innermost sequences first.
	pub fn for_each_statement_mut<H: FnMut(&mut Statement)>(&mut self, handler: &mut H) {
		for statement in &mut self.list {
			statement.for_each_sequence_mut(&mut |sequence| {
				sequence.for_each_statement_mut(handler);
			});

			handler(statement);
		}
	}

	/// Rewrites every nested sequence before this one.
	pub fn for_each_sequence_post_mut<H: FnMut(&mut Self)>(&mut self, handler: &mut H) {
		for statement in &mut self.list {
			statement.for_each_sequence_mut(&mut |sequence| {
				sequence.for_each_sequence_post_mut(handler);
			});
		}

		handler(self);
	}
}

/// Receives the register accesses of a statement.
pub trait SlotHandler {
	fn read(&mut self, slot: &mut SlotRef);

	fn write(&mut self, slot: &mut SlotRef);

	fn closure(&mut self, _function: FunctionLiteral) {}
}

/// Reports every register read and closure within an expression.
pub fn read_expression<H: SlotHandler>(expression: &mut Expression, handler: &mut H) {
	expression.for_each_mut(&mut |expression| match expression {
		Expression::Slot(slot) => handler.read(slot),
		Expression::Function(function) => handler.closure(*function),
		_ => {}
	});
}
