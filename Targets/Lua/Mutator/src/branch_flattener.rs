use alloc::vec::Vec;
use lua_tree::statement::{ElseIf, If, Sequence, Statement};

fn declares(sequence: &Sequence) -> bool {
	sequence
		.list
		.iter()
		.any(|statement| matches!(statement, Statement::Local(_) | Statement::LocalFunction(_)))
}

/// Lifts the `else` arm of an `if` whose `then` arm never falls through, and
/// joins `else if` chains into `elseif`.
pub struct BranchFlattener {
	lifted: usize,
	joined: usize,
}

impl BranchFlattener {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			lifted: 0,
			joined: 0,
		}
	}

	/// Takes the `else` arm when its code can follow the `if` instead.
	fn take_lifted(data: &mut If) -> Option<Sequence> {
		let can_lift = data.else_ifs.is_empty()
			&& data.then.is_terminated()
			&& data.otherwise.as_ref().is_some_and(|otherwise| !declares(otherwise));

		if can_lift { data.otherwise.take() } else { None }
	}

	fn join_else_if(&mut self, data: &mut If) {
		while let Some(otherwise) = &data.otherwise
			&& let [Statement::If(_)] = otherwise.list.as_slice()
		{
			let inner = data
				.otherwise
				.take()
				.and_then(|mut otherwise| otherwise.list.pop());

			let Some(Statement::If(inner)) = inner else {
				return;
			};

			let If {
				condition,
				then,
				else_ifs,
				otherwise,
			} = *inner;

			data.else_ifs.push(ElseIf {
				condition,
				code: then,
			});

			data.else_ifs.extend(else_ifs);
			data.otherwise = otherwise;

			self.joined += 1;
		}
	}

	fn run_sequence(&mut self, sequence: &mut Sequence) {
		let mut list = Vec::with_capacity(sequence.list.len());

		for mut statement in sequence.list.drain(..) {
			let lifted = match &mut statement {
				Statement::If(data) => {
					let lifted = Self::take_lifted(data);

					self.join_else_if(data);

					lifted
				}
				_ => None,
			};

			list.push(statement);

			if let Some(lifted) = lifted {
				list.extend(lifted.list);

				self.lifted += 1;
			}
		}

		sequence.list = list;
	}

	pub fn run(&mut self, body: &mut Sequence) {
		self.lifted = 0;
		self.joined = 0;

		body.for_each_sequence_post_mut(&mut |sequence| self.run_sequence(sequence));

		tracing::trace!(lifted = self.lifted, joined = self.joined, "flattened branches");
	}
}

impl Default for BranchFlattener {
	fn default() -> Self {
		Self::new()
	}
}
