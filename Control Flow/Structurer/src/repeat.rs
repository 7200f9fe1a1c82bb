use alloc::{boxed::Box, vec::Vec};
use control_flow_graph::{Branch, GenericLoop, Graph, NumericLoop, Warp};
use lua_tree::{
	expression::{Constant, Expression},
	statement::{GenericFor, NumericFor, RepeatUntil, Statement, While},
};

use crate::{Context, Structurer, UnstructurableControlFlow};

/// The shape of a loop entered at its header and left past its latch.
enum Shape {
	While,
	Repeat,
	Forever,
}

/// Whether `warp` is a conditional jump between `inner` and `exit`.
fn is_exit_branch(warp: &Warp, inner: u16, exit: u16) -> bool {
	let Warp::Branch(branch) = warp else {
		return false;
	};

	(branch.taken == exit && branch.fallthrough == inner)
		|| (branch.taken == inner && branch.fallthrough == exit)
}

impl Structurer {
	// `while` tests at the header and places `LOOP` right after the test,
	// `repeat` starts with `LOOP` and tests at the latch.
	fn find_shape(&self, graph: &Graph, header: u16, latch: u16, exit: u16) -> Shape {
		let entry = graph.block(header);
		let tests_header = entry.statements.is_empty()
			&& header != latch
			&& is_exit_branch(&entry.warp, self.next_live(header + 1, exit), exit);

		let tests_latch = is_exit_branch(&graph.block(latch).warp, header, exit);

		if entry.has_loop_hint {
			if tests_latch {
				Shape::Repeat
			} else {
				Shape::Forever
			}
		} else if tests_header {
			Shape::While
		} else if tests_latch {
			Shape::Repeat
		} else {
			Shape::Forever
		}
	}

	/// The condition under which a loop test leaves for `exit`.
	fn exit_condition(warp: Warp, exit: u16) -> Expression {
		match warp {
			Warp::Branch(branch) => {
				let Branch {
					condition, taken, ..
				} = *branch;

				if taken == exit {
					condition
				} else {
					condition.negate()
				}
			}
			_ => Expression::Constant(Constant::Boolean(false)),
		}
	}

	fn take_warp(graph: &mut Graph, id: u16) -> Warp {
		core::mem::replace(&mut graph.block_mut(id).warp, Warp::End)
	}

	/// Structures the loop with header `header` and outermost back edge from
	/// `latch`, returning where the walk resumes.
	pub(crate) fn add_loop(
		&mut self,
		graph: &mut Graph,
		list: &mut Vec<Statement>,
		header: u16,
		latch: u16,
		context: Context,
	) -> Result<u16, UnstructurableControlFlow> {
		if latch >= context.end {
			return Err(Self::error(&[header, latch]));
		}

		let exit = self.next_live(latch + 1, context.end);

		self.headers.grow_insert(header.into());

		let inner = Context::looping(exit, header, exit);
		let statement = match self.find_shape(graph, header, latch, exit) {
			Shape::While => {
				self.visit(header)?;

				let condition = Self::exit_condition(Self::take_warp(graph, header), exit).negate();
				let code = self.sequence(graph, self.next_live(header + 1, exit), inner)?;

				Statement::While(Box::new(While { condition, code }))
			}
			Shape::Repeat => {
				let condition = Self::exit_condition(Self::take_warp(graph, latch), exit);
				let code = self.sequence(graph, header, inner)?;

				Statement::RepeatUntil(Box::new(RepeatUntil { code, condition }))
			}
			Shape::Forever => {
				let code = self.sequence(graph, header, inner)?;

				Statement::While(Box::new(While {
					condition: Expression::Constant(Constant::Boolean(true)),
					code,
				}))
			}
		};

		tracing::trace!(header, latch, "structured loop");

		list.push(statement);

		Ok(exit)
	}

	fn check_for(
		id: u16,
		body: u16,
		exit: u16,
		context: Context,
	) -> Result<(), UnstructurableControlFlow> {
		if body == id + 1 && exit > body && exit <= context.end {
			Ok(())
		} else {
			Err(Self::error(&[id, body, exit]))
		}
	}

	pub(crate) fn add_numeric_for(
		&mut self,
		graph: &mut Graph,
		list: &mut Vec<Statement>,
		id: u16,
		data: NumericLoop,
		context: Context,
	) -> Result<u16, UnstructurableControlFlow> {
		let NumericLoop {
			variable,
			start,
			limit,
			step,
			body,
			exit,
		} = data;

		Self::check_for(id, body, exit, context)?;

		let code = self.sequence(graph, body, Context::looping(exit, body, exit))?;

		list.push(Statement::NumericFor(Box::new(NumericFor {
			variable,
			start,
			limit,
			step,
			code,
		})));

		Ok(exit)
	}

	pub(crate) fn add_generic_for(
		&mut self,
		graph: &mut Graph,
		list: &mut Vec<Statement>,
		id: u16,
		data: GenericLoop,
		context: Context,
	) -> Result<u16, UnstructurableControlFlow> {
		let GenericLoop {
			variables,
			iterators,
			body,
			exit,
		} = data;

		Self::check_for(id, body, exit, context)?;

		let code = self.sequence(graph, body, Context::looping(exit, body, exit))?;

		list.push(Statement::GenericFor(Box::new(GenericFor {
			variables,
			iterators,
			code,
		})));

		Ok(exit)
	}
}
