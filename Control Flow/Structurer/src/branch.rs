use alloc::{boxed::Box, vec::Vec};
use control_flow_graph::{Branch, Graph, Warp};
use lua_tree::statement::{If, Statement};

use crate::{Context, Structurer, UnstructurableControlFlow, single};

impl Structurer {
	/// The block closing the then arm jumps over the else arm, if any.
	fn find_else_end(graph: &Graph, last: u16, taken: u16, context: Context) -> Option<u16> {
		let Warp::Jump(end) = graph.block(last).warp else {
			return None;
		};

		let is_inside = end <= context.end || Some(end) == context.follow;

		(end > taken && is_inside && Some(end) != context.exit).then_some(end)
	}

	/// Structures a two way branch ending block `id`, returning where the
	/// walk resumes.
	pub(crate) fn add_branch(
		&mut self,
		graph: &mut Graph,
		list: &mut Vec<Statement>,
		id: u16,
		branch: Branch,
		context: Context,
	) -> Result<u16, UnstructurableControlFlow> {
		let next = self.next_live(id + 1, context.end);
		let Branch {
			condition,
			taken,
			fallthrough,
		} = branch;

		// From here on `taken` skips the code at `next`.
		let (condition, taken) = if fallthrough == next {
			(condition, taken)
		} else if taken == next {
			(condition.negate(), fallthrough)
		} else {
			return Err(Self::error(&[id, taken, fallthrough]));
		};

		if taken == next {
			return Ok(next);
		}

		if Some(taken) == context.exit {
			list.push(Statement::If(Box::new(If {
				condition,
				then: single(Statement::Break),
				else_ifs: Vec::new(),
				otherwise: None,
			})));

			return Ok(next);
		}

		// Skipping the rest of the region keeps it under the negated test.
		if Some(taken) == context.follow || Some(taken) == context.header {
			let then = self.sequence(graph, next, context)?;

			list.push(Statement::If(Box::new(If {
				condition: condition.negate(),
				then,
				else_ifs: Vec::new(),
				otherwise: None,
			})));

			return Ok(context.end);
		}

		// Landing on the end of the region without it being the follow means
		// entering the else arm of an enclosing branch.
		if taken < next || taken >= context.end {
			return Err(Self::error(&[id, taken]));
		}

		let else_end = Self::find_else_end(graph, taken - 1, taken, context);
		let join = else_end.unwrap_or(taken);
		let follow = Some(join);

		let then = self.sequence(graph, next, context.nested(taken, follow))?;
		let otherwise = match else_end {
			Some(end) => Some(self.sequence(graph, taken, context.nested(end.min(context.end), follow))?),
			None => None,
		};

		list.push(Statement::If(Box::new(If {
			condition: condition.negate(),
			then,
			else_ifs: Vec::new(),
			otherwise,
		})));

		Ok(join.min(context.end))
	}
}
