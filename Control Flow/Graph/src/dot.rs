use core::fmt::{Display, Formatter, Result};

use crate::{Graph, Warp};

#[derive(PartialEq, Eq, Clone, Copy)]
enum Vertex {
	Unreachable,
	Empty,
	Statements,
	Condition,
	Loop,
}

impl Vertex {
	fn from_block(block: &crate::Block) -> Self {
		if block.is_unreachable {
			return Self::Unreachable;
		}

		match block.warp {
			Warp::Branch(_) => Self::Condition,
			Warp::NumericFor(_) | Warp::GenericFor(_) => Self::Loop,
			Warp::End | Warp::Jump(_) if block.statements.is_empty() => Self::Empty,
			Warp::End | Warp::Jump(_) => Self::Statements,
		}
	}

	const fn group(self) -> &'static str {
		match self {
			Self::Unreachable => "A",
			Self::Empty => "B",
			Self::Statements => "C",
			Self::Condition => "D",
			Self::Loop => "E",
		}
	}

	const fn color(self) -> &'static str {
		match self {
			Self::Unreachable => "#BBBBBB",
			Self::Condition | Self::Loop => "#EF8784",
			Self::Empty => "#C2C5FA",
			Self::Statements => "#FBE78E",
		}
	}
}

impl Display for Vertex {
	fn fmt(&self, f: &mut Formatter) -> Result {
		writeln!(
			f,
			"\tnode [fillcolor = \"{}\", group = {}];",
			self.color(),
			self.group()
		)
	}
}

pub struct Dot<'inner> {
	inner: &'inner Graph,
}

impl<'inner> Dot<'inner> {
	#[must_use]
	pub const fn new(inner: &'inner Graph) -> Self {
		Self { inner }
	}

	fn fmt_nodes(&self, f: &mut Formatter) -> Result {
		writeln!(f, "\tnode [shape = box, style = filled, ordering = out];")?;

		let mut last_vertex = Vertex::Statements;

		last_vertex.fmt(f)?;

		self.inner.block_ids().try_for_each(|id| {
			let block = self.inner.block(id);
			let vertex = Vertex::from_block(block);

			if vertex != last_vertex {
				last_vertex = vertex;

				last_vertex.fmt(f)?;
			}

			write!(f, "\tN{id} [xlabel = {id}, label = \"pc {}\\l", block.start)?;

			if block.has_loop_hint {
				write!(f, "loop\\l")?;
			}

			write!(f, "{} statement(s)\\l", block.statements.len())?;

			if let Some(close) = block.close {
				write!(f, "close {close}\\l")?;
			}

			writeln!(f, "{}\\l\"];", block.warp.name())
		})
	}

	fn fmt_edges(&self, f: &mut Formatter) -> Result {
		writeln!(f, "\tedge [color = \"#444477\"];")?;

		self.inner.block_ids().try_for_each(|id| {
			self.inner.successors(id).try_for_each(|successor| {
				let style = if self.inner.is_back_edge(id, successor) {
					" [style = dashed]"
				} else {
					""
				};

				writeln!(f, "\tN{id} -> N{successor}{style};")
			})
		})
	}
}

impl Display for Dot<'_> {
	fn fmt(&self, f: &mut Formatter) -> Result {
		writeln!(f, "digraph {{")?;

		self.fmt_nodes(f)?;
		self.fmt_edges(f)?;

		writeln!(f, "}}")
	}
}
