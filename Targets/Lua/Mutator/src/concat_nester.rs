use lua_tree::{
	expression::{Binary, BinaryOperator, Expression},
	statement::Sequence,
};

fn is_concat(expression: &Expression) -> bool {
	matches!(expression, Expression::Binary(binary) if binary.operator == BinaryOperator::Concat)
}

/// Regroups `(a .. b) .. c` as `a .. (b .. c)`, which prints as one chain.
pub struct ConcatNester {
	rotated: usize,
}

impl ConcatNester {
	#[must_use]
	pub const fn new() -> Self {
		Self { rotated: 0 }
	}

	fn nest(&mut self, expression: &mut Expression) {
		loop {
			let Expression::Binary(outer) = expression else {
				return;
			};

			if outer.operator != BinaryOperator::Concat || !is_concat(&outer.lhs) {
				return;
			}

			let Expression::Binary(inner) = core::mem::replace(&mut outer.lhs, Expression::NIL)
			else {
				return;
			};

			let Binary { lhs, rhs, .. } = *inner;
			let last = core::mem::replace(&mut outer.rhs, Expression::NIL);
			let mut tail = Expression::binary(BinaryOperator::Concat, rhs, last);

			self.nest(&mut tail);

			outer.lhs = lhs;
			outer.rhs = tail;

			self.rotated += 1;
		}
	}

	pub fn run(&mut self, body: &mut Sequence) {
		self.rotated = 0;

		body.for_each_statement_mut(&mut |statement| {
			statement.for_each_expression_mut(&mut |expression| {
				expression.for_each_mut(&mut |expression| self.nest(expression));
			});
		});

		tracing::trace!(rotated = self.rotated, "nested concatenations");
	}
}

impl Default for ConcatNester {
	fn default() -> Self {
		Self::new()
	}
}
