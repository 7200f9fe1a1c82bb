use alloc::vec::Vec;
use lua_tree::statement::{Sequence, Statement};

fn is_bare(statement: &Statement) -> bool {
	matches!(statement, Statement::Local(local) if local.values.is_empty())
}

/// Joins runs of `local` declarations without values into one.
pub struct DeclarationMerger {
	merged: usize,
}

impl DeclarationMerger {
	#[must_use]
	pub const fn new() -> Self {
		Self { merged: 0 }
	}

	fn run_sequence(&mut self, sequence: &mut Sequence) {
		let mut list: Vec<Statement> = Vec::with_capacity(sequence.list.len());

		for statement in sequence.list.drain(..) {
			if let (Some(Statement::Local(last)), Statement::Local(local)) = (list.last_mut(), &statement)
				&& last.values.is_empty()
				&& local.values.is_empty()
			{
				last.names.extend_from_slice(&local.names);

				self.merged += 1;

				continue;
			}

			list.push(statement);
		}

		sequence.list = list;
	}

	pub fn run(&mut self, body: &mut Sequence) {
		self.merged = 0;

		body.for_each_sequence_post_mut(&mut |sequence| {
			if sequence.list.iter().filter(|statement| is_bare(statement)).count() > 1 {
				self.run_sequence(sequence);
			}
		});

		tracing::trace!(merged = self.merged, "merged declarations");
	}
}

impl Default for DeclarationMerger {
	fn default() -> Self {
		Self::new()
	}
}
