use std::sync::Arc;

use lua_printer::LuaPrinter;
use lua_tree::{
	expression::{
		BinaryOperator, Call, Constant, Expression, FunctionLiteral, TableConstructor, TableEntry,
		UnaryOperator,
	},
	function::Function,
	slot::{SlotRef, SlotTable, Web},
	statement::{Sequence, Statement},
};
use pretty_assertions::assert_eq;

fn function(statements: Vec<Statement>) -> Function<Sequence> {
	Function {
		parameters: Vec::new(),
		is_variadic: true,
		frame_size: 0,
		depth: 0,
		line: 0,
		upvalues: Vec::new(),
		variables: Vec::new(),
		slots: SlotTable::new(),
		body: Sequence::from(statements),
		children: Vec::new(),
	}
}

fn print(function: &Function<Sequence>) -> String {
	let mut out = Vec::new();

	LuaPrinter::new()
		.print(function, &mut out)
		.expect("writing to a vector should not fail");

	String::from_utf8(out).expect("source should be UTF-8")
}

fn global(name: &str) -> Expression {
	Expression::Global(Arc::from(name.as_bytes()))
}

fn binary(operator: BinaryOperator, lhs: Expression, rhs: Expression) -> Expression {
	Expression::binary(operator, lhs, rhs)
}

fn call(function: Expression, arguments: Vec<Expression>) -> Expression {
	Expression::Call(Box::new(Call {
		function,
		arguments,
		multiple: false,
	}))
}

/// Prints `x = <expression>`, without the trailing newline.
fn print_value(expression: Expression) -> String {
	let source = print(&function(vec![Statement::single(global("x"), expression)]));

	source
		.strip_prefix("x = ")
		.and_then(|source| source.strip_suffix('\n'))
		.expect("assignment should print on one line")
		.to_owned()
}

#[test]
fn left_associative_operators() {
	let (a, b, c) = (global("a"), global("b"), global("c"));

	assert_eq!(
		print_value(binary(
			BinaryOperator::Sub,
			a.clone(),
			binary(BinaryOperator::Sub, b.clone(), c.clone())
		)),
		"a - (b - c)"
	);
	assert_eq!(
		print_value(binary(
			BinaryOperator::Sub,
			binary(BinaryOperator::Sub, a.clone(), b.clone()),
			c.clone()
		)),
		"a - b - c"
	);
	assert_eq!(
		print_value(binary(
			BinaryOperator::Mul,
			binary(BinaryOperator::Add, a, b),
			c
		)),
		"(a + b) * c"
	);
}

#[test]
fn right_associative_operators() {
	let (a, b, c) = (global("a"), global("b"), global("c"));

	assert_eq!(
		print_value(binary(
			BinaryOperator::Concat,
			a.clone(),
			binary(BinaryOperator::Concat, b.clone(), c.clone())
		)),
		"a .. b .. c"
	);
	assert_eq!(
		print_value(binary(
			BinaryOperator::Concat,
			binary(BinaryOperator::Concat, a.clone(), b.clone()),
			c.clone()
		)),
		"(a .. b) .. c"
	);
	assert_eq!(
		print_value(binary(
			BinaryOperator::Pow,
			a.clone(),
			binary(BinaryOperator::Pow, b.clone(), c.clone())
		)),
		"a ^ b ^ c"
	);
	assert_eq!(
		print_value(binary(
			BinaryOperator::Pow,
			binary(BinaryOperator::Pow, a, b),
			c
		)),
		"(a ^ b) ^ c"
	);
}

#[test]
fn unary_operators() {
	let (a, b) = (global("a"), global("b"));
	let negate = |expression| Expression::unary(UnaryOperator::Negate, expression);

	assert_eq!(
		print_value(negate(binary(BinaryOperator::Pow, a.clone(), b.clone()))),
		"-a ^ b"
	);
	assert_eq!(
		print_value(binary(BinaryOperator::Pow, negate(a.clone()), b.clone())),
		"(-a) ^ b"
	);
	assert_eq!(print_value(negate(negate(a.clone()))), "- -a");
	assert_eq!(
		print_value(negate(Expression::Constant(Constant::Integer(-1)))),
		"- -1"
	);
	assert_eq!(
		print_value(Expression::unary(
			UnaryOperator::Not,
			binary(BinaryOperator::Eq, a.clone(), b)
		)),
		"not (a == b)"
	);
	assert_eq!(
		print_value(Expression::unary(UnaryOperator::Length, a)),
		"#a"
	);
}

#[test]
fn strings_are_escaped() {
	assert_eq!(
		print_value(Expression::string(b"a\"b\\\n\x01\xFF")),
		"\"a\\\"b\\\\\\n\\001\\255\""
	);
	assert_eq!(
		print_value(Expression::string(b"\t\r\x07\x08\x0B\x0C")),
		"\"\\t\\r\\a\\b\\v\\f\""
	);
	assert_eq!(print_value(Expression::string("héllo".as_bytes())), "\"héllo\"");
}

#[test]
fn numbers_have_source_forms() {
	let number = |value| print_value(Expression::Constant(Constant::Number(value)));

	assert_eq!(number(0.5), "0.5");
	assert_eq!(number(3.0), "3");
	assert_eq!(number(1e20), "1e20");
	assert_eq!(number(f64::NAN), "(0 / 0)");
	assert_eq!(number(f64::INFINITY), "math.huge");
	assert_eq!(number(f64::NEG_INFINITY), "-math.huge");
	assert_eq!(
		print_value(Expression::Constant(Constant::Signed(-2))),
		"-2LL"
	);
	assert_eq!(
		print_value(Expression::Constant(Constant::Unsigned(7))),
		"7ULL"
	);
}

#[test]
fn table_constructor_entries() {
	let entry = |key, value| TableEntry { key, value };
	let table = TableConstructor {
		entries: vec![
			entry(Expression::Constant(Constant::Integer(1)), Expression::string(b"a")),
			entry(Expression::Constant(Constant::Integer(2)), Expression::string(b"b")),
			entry(Expression::string(b"key"), Expression::Constant(Constant::Integer(3))),
			entry(
				Expression::Constant(Constant::Integer(10)),
				Expression::Constant(Constant::Boolean(true)),
			),
		],
		tail: None,
	};

	assert_eq!(
		print_value(Expression::Table(Box::new(table))),
		"{ \"a\", \"b\", key = 3, [10] = true }"
	);
	assert_eq!(
		print_value(Expression::Table(Box::default())),
		"{}"
	);
}

#[test]
fn globals_that_are_not_names() {
	assert_eq!(print_value(global("not valid")), "_G[\"not valid\"]");
	assert_eq!(print_value(global("end")), "_G[\"end\"]");
	assert_eq!(
		print_value(Expression::index(global("t"), Expression::string(b"then"))),
		"t[\"then\"]"
	);
	assert_eq!(
		print_value(Expression::index(global("t"), Expression::string(b"field"))),
		"t.field"
	);
}

#[test]
fn method_declaration_hides_self() {
	let self_slot = SlotRef {
		index: 0,
		web: 0,
		variable: Some(0),
	};

	let mut method = function(vec![Statement::returns(vec![Expression::Slot(self_slot)])]);

	method.is_variadic = false;
	method.depth = 1;
	method.parameters = vec![self_slot];
	method.slots.webs.push(Web {
		name: Some(Arc::from("self")),
		..Web::new(0)
	});

	let destination = Expression::index(global("t"), Expression::string(b"m"));
	let mut main = function(vec![Statement::single(
		destination,
		Expression::Function(FunctionLiteral { child: 0 }),
	)]);

	main.children.push(method);

	assert_eq!(print(&main), "function t:m()\n\treturn self\nend\n");
}

#[test]
fn parenthesized_statement_is_separated() {
	let main = function(vec![
		Statement::Call(call(global("f"), Vec::new())),
		Statement::Call(call(
			binary(BinaryOperator::Or, global("a"), global("b")),
			Vec::new(),
		)),
	]);

	assert_eq!(print(&main), "f()\n;(a or b)()\n");
}

#[test]
fn early_return_is_wrapped() {
	let main = function(vec![
		Statement::returns(vec![Expression::Constant(Constant::Integer(1))]),
		Statement::Call(call(global("f"), Vec::new())),
	]);

	assert_eq!(print(&main), "do return 1 end\nf()\n");
}

#[test]
fn truncated_call_is_wrapped_at_list_end() {
	let main = function(vec![Statement::returns(vec![call(global("f"), Vec::new())])]);

	assert_eq!(print(&main), "return (f())\n");
}

#[test]
fn error_marker_is_a_comment() {
	let main = function(vec![Statement::Error(String::from("first\nsecond"))]);

	assert_eq!(
		print(&main),
		"-- Decompilation error: first\n-- second\n"
	);
}
