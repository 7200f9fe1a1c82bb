use alloc::{boxed::Box, sync::Arc, vec::Vec};

use crate::slot::SlotRef;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
	Nil,
	Boolean(bool),
	Integer(i32),
	Number(f64),
	String(Arc<[u8]>),
	Signed(i64),
	Unsigned(u64),
	Complex(f64, f64),
}

impl Constant {
	#[must_use]
	pub const fn is_falsy(&self) -> bool {
		matches!(self, Self::Nil | Self::Boolean(false))
	}
}

const KEYWORDS: [&[u8]; 22] = [
	b"and", b"break", b"do", b"else", b"elseif", b"end", b"false", b"for", b"function", b"goto",
	b"if", b"in", b"local", b"nil", b"not", b"or", b"repeat", b"return", b"then", b"true",
	b"until", b"while",
];

/// Whether `name` can be written as a bare name, as in `a.name` or `{ name = 1 }`.
#[must_use]
pub fn is_identifier(name: &[u8]) -> bool {
	let Some((&first, rest)) = name.split_first() else {
		return false;
	};

	(first.is_ascii_alphabetic() || first == b'_')
		&& rest.iter().all(|&byte| byte.is_ascii_alphanumeric() || byte == b'_')
		&& !KEYWORDS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
	Or,
	And,

	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	Ne,

	Concat,

	Add,
	Sub,

	Mul,
	Div,
	Mod,

	Pow,
}

impl BinaryOperator {
	#[must_use]
	pub const fn symbol(self) -> &'static str {
		match self {
			Self::Or => "or",
			Self::And => "and",
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Gt => ">",
			Self::Ge => ">=",
			Self::Eq => "==",
			Self::Ne => "~=",
			Self::Concat => "..",
			Self::Add => "+",
			Self::Sub => "-",
			Self::Mul => "*",
			Self::Div => "/",
			Self::Mod => "%",
			Self::Pow => "^",
		}
	}

	#[must_use]
	pub const fn precedence(self) -> u8 {
		match self {
			Self::Or => 1,
			Self::And => 2,
			Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne => 3,
			Self::Concat => 4,
			Self::Add | Self::Sub => 5,
			Self::Mul | Self::Div | Self::Mod => 6,
			Self::Pow => 8,
		}
	}

	#[must_use]
	pub const fn is_right_associative(self) -> bool {
		matches!(self, Self::Concat | Self::Pow)
	}

	/// Whether regrouping a chain of this operator keeps its value.
	#[must_use]
	pub const fn is_associative(self) -> bool {
		matches!(self, Self::Or | Self::And | Self::Concat)
	}

	#[must_use]
	pub const fn is_comparison(self) -> bool {
		matches!(
			self,
			Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
		)
	}

	/// The comparison that holds exactly when this one does not.
	#[must_use]
	pub const fn negated(self) -> Option<Self> {
		match self {
			Self::Lt => Some(Self::Ge),
			Self::Ge => Some(Self::Lt),
			Self::Le => Some(Self::Gt),
			Self::Gt => Some(Self::Le),
			Self::Eq => Some(Self::Ne),
			Self::Ne => Some(Self::Eq),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
	Not,
	Negate,
	Length,
}

impl UnaryOperator {
	pub const PRECEDENCE: u8 = 7;

	#[must_use]
	pub const fn symbol(self) -> &'static str {
		match self {
			Self::Not => "not ",
			Self::Negate => "-",
			Self::Length => "#",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
	pub operator: BinaryOperator,
	pub lhs: Expression,
	pub rhs: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
	pub operator: UnaryOperator,
	pub source: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
	pub table: Expression,
	pub key: Expression,
}

/// A call. `multiple` is set when every result is kept, so the call expands
/// when it ends a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
	pub function: Expression,
	pub arguments: Vec<Expression>,
	pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
	pub object: Expression,
	pub name: Arc<[u8]>,
	pub arguments: Vec<Expression>,
	pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
	pub key: Expression,
	pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableConstructor {
	pub entries: Vec<TableEntry>,
	/// A multiple value expression filling the array part from `next_index`.
	pub tail: Option<Expression>,
}

impl TableConstructor {
	/// The array index the next positional entry would take.
	#[must_use]
	pub fn next_index(&self) -> i64 {
		let mut next = 1;

		for entry in &self.entries {
			if let Expression::Constant(Constant::Integer(index)) = entry.key {
				if i64::from(index) == next {
					next += 1;
				}
			}
		}

		next
	}
}

/// A function literal; `child` indexes the children of the enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionLiteral {
	pub child: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
	Constant(Constant),
	Slot(SlotRef),
	Upvalue(u16),
	Global(Arc<[u8]>),
	Index(Box<Index>),
	Call(Box<Call>),
	Method(Box<Method>),
	Binary(Box<Binary>),
	Unary(Box<Unary>),
	Table(Box<TableConstructor>),
	Function(FunctionLiteral),
	Vararg { multiple: bool },
}

impl Expression {
	pub const NIL: Self = Self::Constant(Constant::Nil);

	#[must_use]
	pub fn binary(operator: BinaryOperator, lhs: Self, rhs: Self) -> Self {
		Self::Binary(Box::new(Binary { operator, lhs, rhs }))
	}

	#[must_use]
	pub fn unary(operator: UnaryOperator, source: Self) -> Self {
		Self::Unary(Box::new(Unary { operator, source }))
	}

	#[must_use]
	pub fn index(table: Self, key: Self) -> Self {
		Self::Index(Box::new(Index { table, key }))
	}

	#[must_use]
	pub fn string(bytes: &[u8]) -> Self {
		Self::Constant(Constant::String(Arc::from(bytes)))
	}

	#[must_use]
	pub const fn as_slot(&self) -> Option<SlotRef> {
		if let Self::Slot(slot) = *self {
			Some(slot)
		} else {
			None
		}
	}

	/// Whether the expression produces a variable number of values.
	#[must_use]
	pub fn is_multiple(&self) -> bool {
		match self {
			Self::Call(call) => call.multiple,
			Self::Method(method) => method.multiple,
			Self::Vararg { multiple } => *multiple,
			_ => false,
		}
	}

	pub fn set_multiple(&mut self, value: bool) {
		match self {
			Self::Call(call) => call.multiple = value,
			Self::Method(method) => method.multiple = value,
			Self::Vararg { multiple } => *multiple = value,
			_ => {}
		}
	}

	/// Negates a condition, folding comparisons and double negation. Only
	/// the truth of the result is kept, so `and` and `or` swap through
	/// De Morgan's laws.
	#[must_use]
	pub fn negate(self) -> Self {
		match self {
			Self::Unary(unary) if unary.operator == UnaryOperator::Not => unary.source,
			Self::Binary(binary) => {
				let Binary { operator, lhs, rhs } = *binary;

				match operator {
					BinaryOperator::And => Self::binary(BinaryOperator::Or, lhs.negate(), rhs.negate()),
					BinaryOperator::Or => Self::binary(BinaryOperator::And, lhs.negate(), rhs.negate()),
					operator => match operator.negated() {
						Some(operator) => Self::binary(operator, lhs, rhs),
						None => Self::unary(UnaryOperator::Not, Self::binary(operator, lhs, rhs)),
					},
				}
			}
			Self::Constant(Constant::Boolean(value)) => Self::Constant(Constant::Boolean(!value)),
			Self::Constant(Constant::Nil) => Self::Constant(Constant::Boolean(true)),
			other => Self::unary(UnaryOperator::Not, other),
		}
	}

	/// Calls `handler` on this expression and every nested one, parents first.
	pub fn for_each<H: FnMut(&Self)>(&self, handler: &mut H) {
		handler(self);

		match self {
			Self::Constant(_)
			| Self::Slot(_)
			| Self::Upvalue(_)
			| Self::Global(_)
			| Self::Function(_)
			| Self::Vararg { .. } => {}
			Self::Index(index) => {
				index.table.for_each(handler);
				index.key.for_each(handler);
			}
			Self::Call(call) => {
				call.function.for_each(handler);
				call.arguments.iter().for_each(|argument| argument.for_each(handler));
			}
			Self::Method(method) => {
				method.object.for_each(handler);
				method.arguments.iter().for_each(|argument| argument.for_each(handler));
			}
			Self::Binary(binary) => {
				binary.lhs.for_each(handler);
				binary.rhs.for_each(handler);
			}
			Self::Unary(unary) => unary.source.for_each(handler),
			Self::Table(table) => {
				for entry in &table.entries {
					entry.key.for_each(handler);
					entry.value.for_each(handler);
				}

				if let Some(tail) = &table.tail {
					tail.for_each(handler);
				}
			}
		}
	}

	/// Calls `handler` on every nested expression and then on this one, so
	/// rewrites see already rewritten children.
	pub fn for_each_mut<H: FnMut(&mut Self)>(&mut self, handler: &mut H) {
		match self {
			Self::Constant(_)
			| Self::Slot(_)
			| Self::Upvalue(_)
			| Self::Global(_)
			| Self::Function(_)
			| Self::Vararg { .. } => {}
			Self::Index(index) => {
				index.table.for_each_mut(handler);
				index.key.for_each_mut(handler);
			}
			Self::Call(call) => {
				call.function.for_each_mut(handler);
				call.arguments
					.iter_mut()
					.for_each(|argument| argument.for_each_mut(handler));
			}
			Self::Method(method) => {
				method.object.for_each_mut(handler);
				method
					.arguments
					.iter_mut()
					.for_each(|argument| argument.for_each_mut(handler));
			}
			Self::Binary(binary) => {
				binary.lhs.for_each_mut(handler);
				binary.rhs.for_each_mut(handler);
			}
			Self::Unary(unary) => unary.source.for_each_mut(handler),
			Self::Table(table) => {
				for entry in &mut table.entries {
					entry.key.for_each_mut(handler);
					entry.value.for_each_mut(handler);
				}

				if let Some(tail) = &mut table.tail {
					tail.for_each_mut(handler);
				}
			}
		}

		handler(self);
	}

	#[must_use]
	pub fn any<P: FnMut(&Self) -> bool>(&self, mut predicate: P) -> bool {
		let mut found = false;

		self.for_each(&mut |expression| found = found || predicate(expression));

		found
	}

	/// Whether evaluating the expression may run arbitrary code.
	#[must_use]
	pub fn has_calls(&self) -> bool {
		self.any(|expression| matches!(expression, Self::Call(_) | Self::Method(_)))
	}

	/// Whether the value depends on state other statements can change:
	/// globals, table fields, upvalues, or calls.
	#[must_use]
	pub fn reads_state(&self) -> bool {
		self.any(|expression| {
			matches!(
				expression,
				Self::Call(_) | Self::Method(_) | Self::Global(_) | Self::Index(_) | Self::Upvalue(_)
			)
		})
	}

	#[must_use]
	pub fn reads_slot(&self, index: u16) -> bool {
		self.any(|expression| matches!(expression, Self::Slot(slot) if slot.index == index))
	}

	#[must_use]
	pub fn node_count(&self) -> usize {
		let mut count = 0;

		self.for_each(&mut |_| count += 1);

		count
	}
}
