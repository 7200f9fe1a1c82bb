use alloc::{format, string::String};
use control_flow_graph::Graph;
use core::ops::ControlFlow;
use lua_tree::{
	expression::Expression,
	function::{Function, UpvalueSource},
	slot::SlotRef,
	statement::Statement,
	visitor::Visitor,
};

/// Finds the first register outside of the frame.
struct SlotBounds {
	frame_size: u16,
}

impl SlotBounds {
	fn check(&self, slot: SlotRef) -> ControlFlow<u16> {
		if slot.index < self.frame_size {
			ControlFlow::Continue(())
		} else {
			ControlFlow::Break(slot.index)
		}
	}
}

impl Visitor for SlotBounds {
	type Output = u16;

	fn visit_expression(&mut self, expression: &Expression) -> ControlFlow<Self::Output> {
		match expression {
			Expression::Slot(slot) => self.check(*slot),
			_ => ControlFlow::Continue(()),
		}
	}

	fn visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Output> {
		match statement {
			Statement::Local(local) => local.names.iter().try_for_each(|&name| self.check(name)),
			Statement::LocalFunction(local) => self.check(local.name),
			Statement::NumericFor(data) => self.check(data.variable),
			Statement::GenericFor(data) => data
				.variables
				.iter()
				.try_for_each(|&variable| self.check(variable)),
			_ => ControlFlow::Continue(()),
		}
	}
}

fn check_edges(graph: &Graph, id: u16) -> Result<(), String> {
	let len = graph.len();

	if let Some(target) = graph.successors(id).find(|&target| usize::from(target) >= len) {
		return Err(format!("block {id} leads to missing block {target}"));
	}

	if let Some(predecessor) = graph
		.predecessors(id)
		.find(|&predecessor| !graph.successors(predecessor).any(|target| target == id))
	{
		return Err(format!("block {id} lists {predecessor} as a predecessor"));
	}

	Ok(())
}

fn check_slots(graph: &Graph, id: u16, bounds: &mut SlotBounds) -> Result<(), String> {
	let block = graph.block(id);
	let mut found = block
		.statements
		.iter()
		.try_for_each(|statement| statement.accept(bounds));

	block.warp.for_each_expression(&mut |expression| {
		if found.is_continue() {
			found = expression.accept(bounds);
		}
	});

	if found.is_continue() {
		found = block
			.warp
			.loop_variables()
			.iter()
			.try_for_each(|&variable| bounds.check(variable));
	}

	match found {
		ControlFlow::Continue(()) => Ok(()),
		ControlFlow::Break(slot) => Err(format!(
			"block {id} uses slot {slot} of a frame of {}",
			bounds.frame_size
		)),
	}
}

/// Checks the edges and register bounds of one function, not its children.
pub fn check_function(function: &Function<Graph>) -> Result<(), String> {
	let Function {
		parameters,
		frame_size,
		body,
		children,
		..
	} = function;

	if parameters.len() > usize::from(*frame_size) {
		return Err(format!(
			"{} parameters do not fit a frame of {frame_size}",
			parameters.len()
		));
	}

	let mut bounds = SlotBounds {
		frame_size: *frame_size,
	};

	for id in body.block_ids() {
		check_edges(body, id)?;
		check_slots(body, id, &mut bounds)?;
	}

	for (index, child) in children.iter().enumerate() {
		let captured = child.upvalues.iter().find_map(|upvalue| match upvalue.source {
			UpvalueSource::Local(slot) if slot >= *frame_size => Some(slot),
			_ => None,
		});

		if let Some(slot) = captured {
			return Err(format!("child {index} captures slot {slot} outside of the frame"));
		}
	}

	Ok(())
}
