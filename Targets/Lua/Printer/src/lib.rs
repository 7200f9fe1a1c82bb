mod expression;
mod print;
mod statement;

use std::io::{Result, Write};

use lua_tree::{
	expression::FunctionLiteral,
	function::Function,
	slot::SlotRef,
	statement::Sequence,
};

use self::print::Print;

/// Writes a structured function as Lua source.
pub struct LuaPrinter<'tree> {
	functions: Vec<&'tree Function<Sequence>>,
	depth: u16,
	separate: bool,
}

impl<'tree> LuaPrinter<'tree> {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			functions: Vec::new(),
			depth: 0,
			separate: false,
		}
	}

	pub(crate) fn tab(&self, out: &mut dyn Write) -> Result<()> {
		(0..self.depth).try_for_each(|_| write!(out, "\t"))
	}

	/// Starts a statement, separating it from the one before when it opens
	/// with a parenthesis that would otherwise continue it as a call.
	pub(crate) fn begin(&mut self, out: &mut dyn Write) -> Result<()> {
		self.tab(out)?;

		if std::mem::take(&mut self.separate) {
			write!(out, ";")?;
		}

		Ok(())
	}

	pub(crate) const fn set_separate(&mut self, separate: bool) {
		self.separate = separate;
	}

	pub const fn indent(&mut self) {
		self.depth = self.depth.wrapping_add(1);
	}

	pub const fn outdent(&mut self) {
		self.depth = self.depth.wrapping_sub(1);
	}

	pub(crate) fn enter(&mut self, function: &'tree Function<Sequence>) {
		self.functions.push(function);
	}

	pub(crate) fn leave(&mut self) {
		self.functions.pop();
	}

	pub(crate) fn child(&self, literal: FunctionLiteral) -> Option<&'tree Function<Sequence>> {
		let current = *self.functions.last()?;

		current.children.get(usize::from(literal.child))
	}

	pub(crate) fn slot_name(&self, slot: SlotRef) -> Option<&'tree str> {
		let current = *self.functions.last()?;

		current.slots.get(slot)?.name.as_deref()
	}

	pub(crate) fn upvalue_name(&self, index: u16) -> Option<&'tree str> {
		let current = *self.functions.last()?;

		current.upvalues.get(usize::from(index))?.name.as_deref()
	}

	/// # Errors
	///
	/// Returns any IO errors that the `out` produces during the process.
	pub fn print(&mut self, function: &'tree Function<Sequence>, out: &mut dyn Write) -> Result<()> {
		self.functions.clear();
		self.depth = 0;
		self.separate = false;

		self.enter(function);

		function.body.print(self, out)?;

		self.leave();

		Ok(())
	}
}

impl Default for LuaPrinter<'_> {
	fn default() -> Self {
		Self::new()
	}
}
