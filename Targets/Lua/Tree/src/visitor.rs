use core::ops::ControlFlow;

use crate::{
	expression::{
		Binary, Call, Expression, Index, Method, TableConstructor, TableEntry, Unary,
	},
	statement::{
		Assign, ElseIf, GenericFor, If, LocalDeclaration, NumericFor, RepeatUntil, Return,
		Sequence, SetList, Statement, While,
	},
};

pub trait Visitor {
	type Output;

	fn visit_expression(&mut self, expression: &Expression) -> ControlFlow<Self::Output>;

	fn visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Output>;
}

impl Index {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { table, key } = self;

		table.accept(visitor)?;
		key.accept(visitor)
	}
}

impl Call {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			function,
			arguments,
			multiple: _,
		} = self;

		function.accept(visitor)?;
		arguments
			.iter()
			.try_for_each(|argument| argument.accept(visitor))
	}
}

impl Method {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			object,
			name: _,
			arguments,
			multiple: _,
		} = self;

		object.accept(visitor)?;
		arguments
			.iter()
			.try_for_each(|argument| argument.accept(visitor))
	}
}

impl Binary {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			operator: _,
			lhs,
			rhs,
		} = self;

		lhs.accept(visitor)?;
		rhs.accept(visitor)
	}
}

impl Unary {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			operator: _,
			source,
		} = self;

		source.accept(visitor)
	}
}

impl TableConstructor {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { entries, tail } = self;

		entries.iter().try_for_each(|TableEntry { key, value }| {
			key.accept(visitor)?;
			value.accept(visitor)
		})?;

		tail.iter().try_for_each(|tail| tail.accept(visitor))
	}
}

impl Expression {
	pub fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		visitor.visit_expression(self)?;

		match self {
			Self::Constant(_)
			| Self::Slot(_)
			| Self::Upvalue(_)
			| Self::Global(_)
			| Self::Function(_)
			| Self::Vararg { .. } => ControlFlow::Continue(()),
			Self::Index(index) => index.accept(visitor),
			Self::Call(call) => call.accept(visitor),
			Self::Method(method) => method.accept(visitor),
			Self::Binary(binary) => binary.accept(visitor),
			Self::Unary(unary) => unary.accept(visitor),
			Self::Table(table) => table.accept(visitor),
		}
	}
}

impl Assign {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			destinations,
			sources,
		} = self;

		destinations
			.iter()
			.try_for_each(|destination| destination.accept(visitor))?;

		sources.iter().try_for_each(|source| source.accept(visitor))
	}
}

impl LocalDeclaration {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { names: _, values } = self;

		values.iter().try_for_each(|value| value.accept(visitor))
	}
}

impl Return {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { values } = self;

		values.iter().try_for_each(|value| value.accept(visitor))
	}
}

impl ElseIf {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { condition, code } = self;

		condition.accept(visitor)?;
		code.accept(visitor)
	}
}

impl If {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			condition,
			then,
			else_ifs,
			otherwise,
		} = self;

		condition.accept(visitor)?;
		then.accept(visitor)?;
		else_ifs
			.iter()
			.try_for_each(|else_if| else_if.accept(visitor))?;

		otherwise
			.iter()
			.try_for_each(|otherwise| otherwise.accept(visitor))
	}
}

impl While {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { condition, code } = self;

		condition.accept(visitor)?;
		code.accept(visitor)
	}
}

impl RepeatUntil {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { code, condition } = self;

		code.accept(visitor)?;
		condition.accept(visitor)
	}
}

impl NumericFor {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			variable: _,
			start,
			limit,
			step,
			code,
		} = self;

		start.accept(visitor)?;
		limit.accept(visitor)?;
		step.accept(visitor)?;
		code.accept(visitor)
	}
}

impl GenericFor {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			variables: _,
			iterators,
			code,
		} = self;

		iterators
			.iter()
			.try_for_each(|iterator| iterator.accept(visitor))?;

		code.accept(visitor)
	}
}

impl SetList {
	fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self {
			table,
			start: _,
			values,
		} = self;

		table.accept(visitor)?;
		values.accept(visitor)
	}
}

impl Statement {
	pub fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		visitor.visit_statement(self)?;

		match self {
			Self::Assign(assign) => assign.accept(visitor),
			Self::Local(local) => local.accept(visitor),
			Self::Call(call) => call.accept(visitor),
			Self::Return(ret) => ret.accept(visitor),
			Self::If(data) => data.accept(visitor),
			Self::While(data) => data.accept(visitor),
			Self::RepeatUntil(data) => data.accept(visitor),
			Self::NumericFor(data) => data.accept(visitor),
			Self::GenericFor(data) => data.accept(visitor),
			Self::SetList(set_list) => set_list.accept(visitor),
			Self::Do(sequence) => sequence.accept(visitor),
			Self::LocalFunction(_) | Self::Break | Self::Error(_) => ControlFlow::Continue(()),
		}
	}
}

impl Sequence {
	pub fn accept<T: Visitor>(&self, visitor: &mut T) -> ControlFlow<T::Output> {
		let Self { list } = self;

		list.iter().try_for_each(|statement| statement.accept(visitor))
	}
}
