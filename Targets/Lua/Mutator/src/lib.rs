#![no_std]

extern crate alloc;

mod branch_flattener;
mod concat_nester;
mod declaration_merger;
mod local_inliner;
mod method_finder;
mod table_folder;
mod value_selector;

use control_flow_graph::Graph;
use lua_tree::{
	expression::{Expression, FunctionLiteral},
	function::Function,
	slot::SlotRef,
	statement::{Sequence, SlotHandler, Statement, read_expression},
};

pub use self::{
	branch_flattener::BranchFlattener, concat_nester::ConcatNester,
	declaration_merger::DeclarationMerger, local_inliner::LocalInliner,
	method_finder::MethodFinder, table_folder::TableFolder, value_selector::ValueSelector,
};

/// Counts the accesses of one web, a closure capturing it counting as
/// both a read and a write.
pub(crate) struct Uses<'function> {
	pub web: u32,
	pub reads: usize,
	pub writes: usize,
	pub children: &'function [Function<Sequence>],
}

impl<'function> Uses<'function> {
	pub const fn new(web: u32, children: &'function [Function<Sequence>]) -> Self {
		Self {
			web,
			reads: 0,
			writes: 0,
			children,
		}
	}

	pub const fn total(&self) -> usize {
		self.reads + self.writes
	}

	pub fn add_expression(&mut self, expression: &mut Expression) {
		read_expression(expression, self);
	}
}

impl SlotHandler for Uses<'_> {
	fn read(&mut self, slot: &mut SlotRef) {
		if slot.web == self.web {
			self.reads += 1;
		}
	}

	fn write(&mut self, slot: &mut SlotRef) {
		if slot.web == self.web {
			self.writes += 1;
		}
	}

	fn closure(&mut self, function: FunctionLiteral) {
		let Some(child) = self.children.get(usize::from(function.child)) else {
			return;
		};

		if child.upvalues.iter().any(|upvalue| upvalue.link == Some(self.web)) {
			self.reads += 1;
			self.writes += 1;
		}
	}
}

/// Simplifies the warped shape of `function` and its children before
/// structuring.
pub fn pre_pass(function: &mut Function<Graph>) {
	let mut identical = 0;
	let mut conditions = 0;

	function.for_each_mut(&mut |function| {
		identical += function.body.fold_identical_branches();
		conditions += function.body.fold_conditions();
	});

	tracing::debug!(identical, conditions, "folded branches");
}

/// Folds the `and` and `or` value expressions of `function` and its
/// children once elimination has emptied the blocks of their tests.
pub fn value_pass(function: &mut Function<Graph>) {
	let mut conditions = 0;
	let mut values = 0;

	function.for_each_mut(&mut |function| {
		let Function { body, slots, .. } = function;

		conditions += body.fold_conditions();
		values += body.fold_values(slots);
	});

	tracing::debug!(conditions, values, "folded values");
}

fn remove_trailing_return(body: &mut Sequence) {
	if let Some(Statement::Return(data)) = body.list.last()
		&& data.values.is_empty()
	{
		body.list.pop();
	}
}

fn run_primary(function: &mut Function<Sequence>) {
	let Function {
		body,
		slots,
		children,
		..
	} = function;

	ValueSelector::new().run(body);
	MethodFinder::new().run(body, slots);

	let mut table_folder = TableFolder::new();
	let mut local_inliner = LocalInliner::new();

	// Folding a table can leave its local read once, and inlining a local
	// can put a table right after the declaration of another.
	loop {
		let folded = table_folder.run(body, children);
		let inlined = local_inliner.run(body, slots, children);

		if folded + inlined == 0 {
			break;
		}
	}

	ConcatNester::new().run(body);
	BranchFlattener::new().run(body);
	DeclarationMerger::new().run(body);

	remove_trailing_return(body);
}

/// Rewrites the structured idioms of `function` and its children into
/// their source form.
pub fn primary_pass(function: &mut Function<Sequence>) {
	function.for_each_mut(&mut run_primary);
}
