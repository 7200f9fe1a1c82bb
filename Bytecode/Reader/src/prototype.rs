use alloc::{sync::Arc, vec::Vec};

use crate::{
	constant::{Constant, Number},
	instruction::Instruction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrototypeFlags(pub u8);

impl PrototypeFlags {
	pub const HAS_CHILD: u8 = 0x01;
	pub const VARIADIC: u8 = 0x02;
	pub const FFI: u8 = 0x04;
	pub const NO_JIT: u8 = 0x08;
	pub const INTERPRETED_LOOP: u8 = 0x10;

	#[must_use]
	pub const fn is_variadic(self) -> bool {
		self.0 & Self::VARIADIC != 0
	}

	#[must_use]
	pub const fn has_child(self) -> bool {
		self.0 & Self::HAS_CHILD != 0
	}
}

/// Where a closure finds one of its upvalues when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvalueSource {
	/// A slot of the enclosing function's frame.
	Local(u16),
	/// An upvalue of the enclosing function.
	Upvalue(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upvalue {
	pub source: UpvalueSource,
	pub immutable: bool,
}

impl Upvalue {
	pub const LOCAL: u16 = 0x8000;
	pub const IMMUTABLE: u16 = 0x4000;

	#[must_use]
	pub const fn from_raw(raw: u16) -> Self {
		let index = raw & !(Self::LOCAL | Self::IMMUTABLE);
		let source = if raw & Self::LOCAL != 0 {
			UpvalueSource::Local(index)
		} else {
			UpvalueSource::Upvalue(index)
		};

		Self {
			source,
			immutable: raw & Self::IMMUTABLE != 0,
		}
	}
}

/// Names the compiler gives to hidden loop control variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalName {
	ForIndex,
	ForStop,
	ForStep,
	ForGenerator,
	ForState,
	ForControl,
}

impl InternalName {
	#[must_use]
	pub const fn from_tag(tag: u8) -> Option<Self> {
		match tag {
			1 => Some(Self::ForIndex),
			2 => Some(Self::ForStop),
			3 => Some(Self::ForStep),
			4 => Some(Self::ForGenerator),
			5 => Some(Self::ForState),
			6 => Some(Self::ForControl),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableName {
	Named(Arc<str>),
	Internal(InternalName),
}

/// A debug record for one local variable. Positions count the implicit
/// function header, so instruction `n` of [`Prototype::instructions`] is
/// position `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
	pub name: VariableName,
	pub start: u32,
	pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugInfo {
	pub first_line: u32,
	pub line_count: u32,
	pub lines: Vec<u32>,
	pub upvalue_names: Vec<Arc<str>>,
	pub variables: Vec<Variable>,
}

impl DebugInfo {
	/// Finds the variable held in `slot` at `position`, following the
	/// nesting rule of the variable records.
	#[must_use]
	pub fn variable_at(&self, slot: u16, position: u32) -> Option<&Variable> {
		self.variables.get(self.variable_index_at(slot, position)?)
	}

	#[must_use]
	pub fn variable_index_at(&self, slot: u16, position: u32) -> Option<usize> {
		let mut slot = slot;

		for (index, variable) in self.variables.iter().enumerate() {
			if variable.start > position {
				break;
			}

			if position < variable.end {
				if slot == 0 {
					return Some(index);
				}

				slot -= 1;
			}
		}

		None
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
	pub flags: PrototypeFlags,
	pub parameters: u8,
	pub frame_size: u8,
	pub instructions: Vec<Instruction>,
	pub upvalues: Vec<Upvalue>,
	/// Indexed the way instructions refer to them, so `constants[0]` is the
	/// last constant written in the dump.
	pub constants: Vec<Constant>,
	pub numbers: Vec<Number>,
	pub children: Vec<Prototype>,
	pub debug: Option<DebugInfo>,
}

impl Prototype {
	#[must_use]
	pub fn constant(&self, index: u16) -> Option<&Constant> {
		self.constants.get(usize::from(index))
	}

	#[must_use]
	pub fn number(&self, index: u16) -> Option<Number> {
		self.numbers.get(usize::from(index)).copied()
	}

	#[must_use]
	pub fn string(&self, index: u16) -> Option<&Arc<[u8]>> {
		match self.constant(index)? {
			Constant::String(string) => Some(string),
			_ => None,
		}
	}

	#[must_use]
	pub fn child(&self, index: u16) -> Option<(u16, &Self)> {
		match self.constant(index)? {
			&Constant::Child(child) => Some((child, self.children.get(usize::from(child))?)),
			_ => None,
		}
	}

	#[must_use]
	pub fn line(&self, pc: usize) -> Option<u32> {
		let debug = self.debug.as_ref()?;

		debug.lines.get(pc).copied()
	}

	/// Walks this prototype and every nested one, parents first.
	pub fn for_each<H: FnMut(&Self, usize)>(&self, mut handler: H) {
		let mut stack = alloc::vec![(self, 0)];

		while let Some((prototype, depth)) = stack.pop() {
			handler(prototype, depth);

			stack.extend(prototype.children.iter().rev().map(|child| (child, depth + 1)));
		}
	}
}
