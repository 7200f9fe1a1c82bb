use alloc::{boxed::Box, sync::Arc};
use lua_tree::{
	expression::{Constant, Expression, Method, is_identifier},
	slot::SlotTable,
	statement::Sequence,
};

/// Turns `o.f(o, ...)` into `o:f(...)` when `o` is a variable.
pub struct MethodFinder {
	found: usize,
}

impl MethodFinder {
	#[must_use]
	pub const fn new() -> Self {
		Self { found: 0 }
	}

	fn is_object(expression: &Expression, slots: &SlotTable) -> bool {
		match expression {
			Expression::Slot(slot) => slots.is_local(*slot),
			Expression::Upvalue(_) => true,
			_ => false,
		}
	}

	fn is_same(lhs: &Expression, rhs: &Expression) -> bool {
		match (lhs, rhs) {
			(Expression::Slot(lhs), Expression::Slot(rhs)) => lhs.web == rhs.web,
			(Expression::Upvalue(lhs), Expression::Upvalue(rhs)) => lhs == rhs,
			_ => false,
		}
	}

	fn find_name(expression: &Expression, slots: &SlotTable) -> Option<Arc<[u8]>> {
		let Expression::Call(call) = expression else {
			return None;
		};

		let Expression::Index(index) = &call.function else {
			return None;
		};

		let Expression::Constant(Constant::String(name)) = &index.key else {
			return None;
		};

		let is_method = is_identifier(name)
			&& Self::is_object(&index.table, slots)
			&& call
				.arguments
				.first()
				.is_some_and(|first| Self::is_same(first, &index.table));

		is_method.then(|| Arc::clone(name))
	}

	fn try_rewrite(expression: &mut Expression, slots: &SlotTable) -> bool {
		let Some(name) = Self::find_name(expression, slots) else {
			return false;
		};

		let Expression::Call(call) = core::mem::replace(expression, Expression::NIL) else {
			return false;
		};

		let mut arguments = call.arguments;
		let object = arguments.remove(0);

		*expression = Expression::Method(Box::new(Method {
			object,
			name,
			arguments,
			multiple: call.multiple,
		}));

		true
	}

	pub fn run(&mut self, body: &mut Sequence, slots: &SlotTable) {
		self.found = 0;

		body.for_each_statement_mut(&mut |statement| {
			statement.for_each_expression_mut(&mut |expression| {
				expression.for_each_mut(&mut |expression| {
					if Self::try_rewrite(expression, slots) {
						self.found += 1;
					}
				});
			});
		});

		tracing::trace!(found = self.found, "found method calls");
	}
}

impl Default for MethodFinder {
	fn default() -> Self {
		Self::new()
	}
}
