#![no_std]

extern crate alloc;

mod error;
mod structured;
mod warped;

use alloc::string::String;
use control_flow_graph::Graph;
use lua_tree::{function::Function, statement::Sequence};

pub use self::error::{InvariantViolation, Mode};

/// Checks the invariants a function tree must hold between passes.
pub struct Validator {
	checked: usize,
}

impl Validator {
	#[must_use]
	pub const fn new() -> Self {
		Self { checked: 0 }
	}

	fn check_all<B, C>(&mut self, function: &Function<B>, mode: Mode, check: &C) -> Result<(), InvariantViolation>
	where
		C: Fn(&Function<B>) -> Result<(), String>,
	{
		check(function).map_err(|detail| InvariantViolation {
			mode,
			line: function.line,
			detail,
		})?;

		self.checked += 1;

		function
			.children
			.iter()
			.try_for_each(|child| self.check_all(child, mode, check))
	}

	/// Checks the edges and register bounds of a function still in graph form.
	///
	/// # Errors
	///
	/// Returns an error naming the first function that breaks an invariant.
	pub fn run_warped(&mut self, function: &Function<Graph>) -> Result<(), InvariantViolation> {
		self.checked = 0;
		self.check_all(function, Mode::Warped, &warped::check_function)?;

		tracing::debug!(functions = self.checked, "validated warped tree");

		Ok(())
	}

	/// Checks that every variable of a structured function is declared before
	/// it is used and that every `break` is inside a loop.
	///
	/// # Errors
	///
	/// Returns an error naming the first function that breaks an invariant.
	pub fn run_structured(&mut self, function: &Function<Sequence>) -> Result<(), InvariantViolation> {
		self.checked = 0;
		self.check_all(function, Mode::Structured, &structured::check_function)?;

		tracing::debug!(functions = self.checked, "validated structured tree");

		Ok(())
	}
}

impl Default for Validator {
	fn default() -> Self {
		Self::new()
	}
}
