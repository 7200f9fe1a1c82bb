use control_flow_graph::Graph;
use lua_tree::{
	function::{Function, UpvalueSource},
	slot::SlotKind,
};

/// Gives every upvalue the name of the variable it captures and resolves
/// captured registers to plain locals.
pub struct UpvalueEliminator {
	renamed: usize,
}

impl UpvalueEliminator {
	#[must_use]
	pub const fn new() -> Self {
		Self { renamed: 0 }
	}

	fn name_children(&mut self, function: &mut Function<Graph>) {
		let Function {
			upvalues,
			slots,
			children,
			..
		} = function;

		for upvalue in children.iter_mut().flat_map(|child| child.upvalues.iter_mut()) {
			let name = match upvalue.source {
				UpvalueSource::Local(_) => upvalue
					.link
					.and_then(|web| slots.webs.get(usize::try_from(web).ok()?))
					.and_then(|web| web.name.clone()),
				UpvalueSource::Upvalue(index) => upvalues
					.get(usize::from(index))
					.and_then(|parent| parent.name.clone()),
			};

			if name.is_some() {
				upvalue.name = name;
				self.renamed += 1;
			}
		}
	}

	/// Runs over `function` and its children, parents first so names flow
	/// down through every level of nesting.
	pub fn run(&mut self, function: &mut Function<Graph>) {
		self.renamed = 0;

		function.for_each_mut(&mut |function| {
			self.name_children(function);

			function
				.slots
				.webs
				.iter_mut()
				.filter(|web| web.kind == SlotKind::UpvalueLink)
				.for_each(|web| web.kind = SlotKind::Local);
		});

		tracing::debug!(renamed = self.renamed, "named upvalues");
	}
}

impl Default for UpvalueEliminator {
	fn default() -> Self {
		Self::new()
	}
}
