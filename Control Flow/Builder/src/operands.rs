use alloc::{boxed::Box, sync::Arc, vec::Vec};
use lua_tree::{
	expression::{Constant, Expression, FunctionLiteral, TableConstructor, TableEntry},
	slot::SlotRef,
};
use luajit_reader::{
	constant::{self, Number, TableValue},
	prototype::{Prototype, VariableName},
};

use crate::error::BuildError;

/// Turns raw operands of one prototype into tree nodes.
pub struct Operands<'data> {
	prototype: &'data Prototype,
	named: Vec<Option<u16>>,
	two_slot_frame: bool,
}

impl<'data> Operands<'data> {
	/// Also returns the names of the debug variables that carry one.
	pub fn new(prototype: &'data Prototype, two_slot_frame: bool) -> (Self, Vec<Arc<str>>) {
		let mut names = Vec::new();
		let named = prototype
			.debug
			.iter()
			.flat_map(|debug| &debug.variables)
			.map(|variable| match &variable.name {
				VariableName::Named(name) => {
					let index = u16::try_from(names.len()).ok();

					names.push(Arc::clone(name));

					index
				}
				VariableName::Internal(_) => None,
			})
			.collect();

		let operands = Self {
			prototype,
			named,
			two_slot_frame,
		};

		(operands, names)
	}

	/// Slots between a call base and its first argument.
	pub const fn frame_offset(&self) -> u16 {
		if self.two_slot_frame { 2 } else { 1 }
	}

	fn variable(&self, slot: u16, position: usize) -> Option<u16> {
		let debug = self.prototype.debug.as_ref()?;
		let position = u32::try_from(position).ok()?;
		let index = debug.variable_index_at(slot, position)?;

		self.named.get(index).copied().flatten()
	}

	pub fn parameter(&self, slot: u16) -> SlotRef {
		SlotRef::new(slot).with_variable(self.variable(slot, 0))
	}

	/// A register read by the instruction at `pc`.
	pub fn read(&self, slot: u16, pc: usize) -> Expression {
		Expression::Slot(SlotRef::new(slot).with_variable(self.variable(slot, pc + 1)))
	}

	/// A register written by the instruction at `pc`; a new variable is
	/// visible from the following instruction on.
	pub fn write(&self, slot: u16, pc: usize) -> SlotRef {
		SlotRef::new(slot).with_variable(self.variable(slot, pc + 2))
	}

	pub fn reads(&self, slots: core::ops::Range<u16>, pc: usize) -> Vec<Expression> {
		slots.map(|slot| self.read(slot, pc)).collect()
	}

	pub fn writes(&self, slots: core::ops::Range<u16>, pc: usize) -> Vec<Expression> {
		slots
			.map(|slot| Expression::Slot(self.write(slot, pc)))
			.collect()
	}

	pub fn string(&self, index: u16, pc: usize) -> Result<Expression, BuildError> {
		let string = self
			.prototype
			.string(index)
			.ok_or(BuildError::BadOperand { pc })?;

		Ok(Expression::Constant(Constant::String(Arc::clone(string))))
	}

	pub fn name(&self, index: u16, pc: usize) -> Result<Arc<[u8]>, BuildError> {
		self.prototype
			.string(index)
			.map(Arc::clone)
			.ok_or(BuildError::BadOperand { pc })
	}

	pub fn number(&self, index: u16, pc: usize) -> Result<Expression, BuildError> {
		let number = self
			.prototype
			.number(index)
			.ok_or(BuildError::BadOperand { pc })?;

		let constant = match number {
			Number::Integer(integer) => Constant::Integer(integer),
			Number::Float(float) => Constant::Number(float),
		};

		Ok(Expression::Constant(constant))
	}

	pub fn raw_number(&self, index: u16, pc: usize) -> Result<Number, BuildError> {
		self.prototype
			.number(index)
			.ok_or(BuildError::BadOperand { pc })
	}

	pub fn primitive(index: u16, pc: usize) -> Result<Expression, BuildError> {
		let constant = match index {
			0 => Constant::Nil,
			1 => Constant::Boolean(false),
			2 => Constant::Boolean(true),
			_ => return Err(BuildError::BadOperand { pc }),
		};

		Ok(Expression::Constant(constant))
	}

	pub fn cdata(&self, index: u16, pc: usize) -> Result<Expression, BuildError> {
		let constant = match self.prototype.constant(index) {
			Some(&constant::Constant::Signed(value)) => Constant::Signed(value),
			Some(&constant::Constant::Unsigned(value)) => Constant::Unsigned(value),
			Some(&constant::Constant::Complex(real, imaginary)) => {
				Constant::Complex(real, imaginary)
			}
			_ => return Err(BuildError::BadOperand { pc }),
		};

		Ok(Expression::Constant(constant))
	}

	pub fn function(&self, index: u16, pc: usize) -> Result<Expression, BuildError> {
		let (child, _) = self
			.prototype
			.child(index)
			.ok_or(BuildError::BadOperand { pc })?;

		Ok(Expression::Function(FunctionLiteral { child }))
	}

	fn template_value(value: &TableValue) -> Expression {
		let constant = match value {
			TableValue::Nil => Constant::Nil,
			TableValue::False => Constant::Boolean(false),
			TableValue::True => Constant::Boolean(true),
			&TableValue::Integer(integer) => Constant::Integer(integer),
			&TableValue::Number(number) => Constant::Number(number),
			TableValue::String(string) => Constant::String(Arc::clone(string)),
		};

		Expression::Constant(constant)
	}

	/// Expands a template table into a constructor. Nil values only reserve
	/// room and are left out.
	pub fn template(&self, index: u16, pc: usize) -> Result<Expression, BuildError> {
		let Some(constant::Constant::Table(table)) = self.prototype.constant(index) else {
			return Err(BuildError::BadOperand { pc });
		};

		let array = table
			.array
			.iter()
			.enumerate()
			.filter(|(_, value)| **value != TableValue::Nil)
			.map(|(index, value)| TableEntry {
				key: Expression::Constant(Constant::Integer(index as i32)),
				value: Self::template_value(value),
			});

		let hash = table
			.hash
			.iter()
			.filter(|(_, value)| *value != TableValue::Nil)
			.map(|(key, value)| TableEntry {
				key: Self::template_value(key),
				value: Self::template_value(value),
			});

		let entries = array.chain(hash).collect();

		Ok(Expression::Table(Box::new(TableConstructor {
			entries,
			tail: None,
		})))
	}
}
