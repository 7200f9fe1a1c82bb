use alloc::{boxed::Box, vec::Vec};
use lua_tree::{
	expression::Expression,
	slot::SlotRef,
	statement::{SlotHandler, read_expression},
};

/// A conditional transfer, going to `taken` when `condition` holds.
pub struct Branch {
	pub condition: Expression,
	pub taken: u16,
	pub fallthrough: u16,
}

pub struct NumericLoop {
	pub variable: SlotRef,
	pub start: Expression,
	pub limit: Expression,
	pub step: Expression,
	pub body: u16,
	pub exit: u16,
}

pub struct GenericLoop {
	pub variables: Vec<SlotRef>,
	pub iterators: Vec<Expression>,
	pub body: u16,
	pub exit: u16,
}

/// How control leaves a block.
pub enum Warp {
	/// Falls off the function, always after a return statement.
	End,
	Jump(u16),
	Branch(Box<Branch>),
	NumericFor(Box<NumericLoop>),
	GenericFor(Box<GenericLoop>),
}

impl Warp {
	#[must_use]
	pub fn branch(condition: Expression, taken: u16, fallthrough: u16) -> Self {
		Self::Branch(Box::new(Branch {
			condition,
			taken,
			fallthrough,
		}))
	}

	/// The successors of the block, the natural fallthrough or loop body first.
	pub fn targets(&self) -> impl Iterator<Item = u16> + use<> {
		let (first, second) = match self {
			Self::End => (None, None),
			Self::Jump(target) => (Some(*target), None),
			Self::Branch(branch) => (Some(branch.fallthrough), Some(branch.taken)),
			Self::NumericFor(data) => (Some(data.body), Some(data.exit)),
			Self::GenericFor(data) => (Some(data.body), Some(data.exit)),
		};

		first.into_iter().chain(second)
	}

	pub fn for_each_expression<H: FnMut(&Expression)>(&self, handler: &mut H) {
		match self {
			Self::End | Self::Jump(_) => {}
			Self::Branch(branch) => handler(&branch.condition),
			Self::NumericFor(data) => {
				handler(&data.start);
				handler(&data.limit);
				handler(&data.step);
			}
			Self::GenericFor(data) => data.iterators.iter().for_each(handler),
		}
	}

	/// Calls `handler` on every expression the warp evaluates.
	pub fn for_each_expression_mut<H: FnMut(&mut Expression)>(&mut self, handler: &mut H) {
		match self {
			Self::End | Self::Jump(_) => {}
			Self::Branch(branch) => handler(&mut branch.condition),
			Self::NumericFor(data) => {
				handler(&mut data.start);
				handler(&mut data.limit);
				handler(&mut data.step);
			}
			Self::GenericFor(data) => data.iterators.iter_mut().for_each(handler),
		}
	}

	/// Reports the registers the warp reads when leaving its block. Loop
	/// variables are not included as they are written on entry to the body.
	pub fn for_each_read<H: SlotHandler>(&mut self, handler: &mut H) {
		self.for_each_expression_mut(&mut |expression| read_expression(expression, handler));
	}

	/// The variables a loop warp defines at the start of each iteration.
	#[must_use]
	pub fn loop_variables(&self) -> &[SlotRef] {
		match self {
			Self::NumericFor(data) => core::slice::from_ref(&data.variable),
			Self::GenericFor(data) => &data.variables,
			_ => &[],
		}
	}

	pub fn loop_variables_mut(&mut self) -> &mut [SlotRef] {
		match self {
			Self::NumericFor(data) => core::slice::from_mut(&mut data.variable),
			Self::GenericFor(data) => &mut data.variables,
			_ => &mut [],
		}
	}

	#[must_use]
	pub const fn loop_body(&self) -> Option<u16> {
		match self {
			Self::NumericFor(data) => Some(data.body),
			Self::GenericFor(data) => Some(data.body),
			_ => None,
		}
	}

	#[must_use]
	pub const fn name(&self) -> &'static str {
		match self {
			Self::End => "end",
			Self::Jump(_) => "jump",
			Self::Branch(_) => "branch",
			Self::NumericFor(_) => "numeric for",
			Self::GenericFor(_) => "generic for",
		}
	}
}
