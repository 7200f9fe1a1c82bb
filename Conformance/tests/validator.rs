use std::sync::Arc;

use control_flow_graph::{Block, Graph, Warp};
use lua_tree::{
	expression::{Constant, Expression},
	function::Function,
	slot::{SlotKind, SlotRef, SlotTable, Web},
	statement::{LocalDeclaration, RepeatUntil, Sequence, Statement, While},
};
use lua_validator::{Mode, Validator};
use pretty_assertions::assert_eq;

fn function<B>(body: B) -> Function<B> {
	Function {
		parameters: Vec::new(),
		is_variadic: true,
		frame_size: 2,
		depth: 0,
		line: 0,
		upvalues: Vec::new(),
		variables: Vec::new(),
		slots: SlotTable::new(),
		body,
		children: Vec::new(),
	}
}

/// A function whose only variable is a local named `x` in web 0.
fn with_x(statements: Vec<Statement>) -> Function<Sequence> {
	let mut function = function(Sequence::from(statements));

	function.slots.webs.push(Web {
		kind: SlotKind::Local,
		name: Some(Arc::from("x")),
		..Web::new(0)
	});

	function
}

fn x() -> SlotRef {
	SlotRef {
		index: 0,
		web: 0,
		variable: None,
	}
}

fn declare_x() -> Statement {
	Statement::Local(Box::new(LocalDeclaration {
		names: vec![x()],
		values: vec![Expression::Constant(Constant::Integer(1))],
	}))
}

fn use_x() -> Statement {
	Statement::returns(vec![Expression::Slot(x())])
}

fn check(function: &Function<Sequence>) -> Result<(), String> {
	Validator::new()
		.run_structured(function)
		.map_err(|error| error.detail)
}

#[test]
fn declared_local_is_valid() {
	assert_eq!(check(&with_x(vec![declare_x(), use_x()])), Ok(()));
}

#[test]
fn use_before_declaration_is_reported() {
	let error = Validator::new()
		.run_structured(&with_x(vec![use_x()]))
		.unwrap_err();

	assert_eq!(error.mode, Mode::Structured);
	assert_eq!(error.detail, "x is used without a declaration");
}

#[test]
fn parameters_are_declared() {
	let mut function = with_x(vec![use_x()]);

	function.parameters.push(x());

	assert_eq!(check(&function), Ok(()));
}

#[test]
fn do_block_ends_its_scope() {
	let function = with_x(vec![
		Statement::Do(Box::new(Sequence::from(vec![declare_x()]))),
		use_x(),
	]);

	assert_eq!(
		check(&function),
		Err(String::from("x is used without a declaration"))
	);
}

#[test]
fn repeat_condition_sees_body_locals() {
	let function = with_x(vec![Statement::RepeatUntil(Box::new(RepeatUntil {
		code: Sequence::from(vec![declare_x()]),
		condition: Expression::Slot(x()),
	}))]);

	assert_eq!(check(&function), Ok(()));
}

#[test]
fn break_needs_a_loop() {
	let outside = with_x(vec![Statement::Break]);
	let inside = with_x(vec![Statement::While(Box::new(While {
		condition: Expression::Constant(Constant::Boolean(true)),
		code: Sequence::from(vec![Statement::Break]),
	}))]);

	assert_eq!(check(&outside), Err(String::from("break outside of a loop")));
	assert_eq!(check(&inside), Ok(()));
}

#[test]
fn warped_slot_outside_of_frame() {
	let mut graph = Graph::new();
	let mut block = Block::new(0);

	block.statements.push(Statement::returns(vec![Expression::Slot(SlotRef::new(4))]));
	graph.add_block(block);
	graph.compute_predecessors();

	let error = Validator::new().run_warped(&function(graph)).unwrap_err();

	assert_eq!(error.mode, Mode::Warped);
	assert_eq!(error.detail, "block 0 uses slot 4 of a frame of 2");
}

#[test]
fn warped_edge_to_missing_block() {
	let mut graph = Graph::new();
	let mut block = Block::new(0);

	block.warp = Warp::Jump(5);
	graph.add_block(block);

	let error = Validator::new().run_warped(&function(graph)).unwrap_err();

	assert_eq!(error.detail, "block 0 leads to missing block 5");
}

#[test]
fn warped_children_are_checked() {
	let mut graph = Graph::new();

	graph.add_block(Block::new(0));

	let mut child_graph = Graph::new();
	let mut block = Block::new(0);

	block.statements.push(Statement::returns(vec![Expression::Slot(SlotRef::new(3))]));
	child_graph.add_block(block);

	let mut child = function(child_graph);

	child.line = 7;

	let mut main = function(graph);

	main.children.push(child);

	let error = Validator::new().run_warped(&main).unwrap_err();

	assert_eq!(error.line, 7);
	assert!(error.to_string().contains("line 7"), "{error}");
}
