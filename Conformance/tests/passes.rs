mod common;

use std::sync::Arc;

use common::programs;
use control_flow_graph::{Block, Dot, Graph, Warp};
use control_flow_liveness::LocalMarker;
use control_flow_structurer::Structurer;
use data_flow_eliminator::{EliminationError, TemporaryEliminator, UpvalueEliminator};
use lua_decompiler::{Decompiler, Options};
use lua_printer::LuaPrinter;
use lua_tree::{
	expression::{BinaryOperator, Call, Expression, UnaryOperator},
	function::Function,
	slot::{SlotKind, SlotRef, SlotTable, Web},
	statement::{If, LocalDeclaration, Sequence, SlotHandler, Statement},
};
use luajit_reader::opcode::Version;
use pretty_assertions::assert_eq;

fn build(data: &[u8]) -> Function<Graph> {
	let decompiler = Decompiler::new(Version::V2_1, Options::default());
	let chunk = decompiler.parse(data).expect("dump should parse");

	decompiler.build(&chunk).expect("dump should build")
}

fn mark(data: &[u8]) -> Function<Graph> {
	let mut function = build(data);
	let mut marker = LocalMarker::new();

	lua_mutator::pre_pass(&mut function);

	function.for_each_mut(&mut |function| marker.run(function));

	function
}

struct Collector {
	slots: Vec<SlotRef>,
}

impl SlotHandler for Collector {
	fn read(&mut self, slot: &mut SlotRef) {
		self.slots.push(*slot);
	}

	fn write(&mut self, slot: &mut SlotRef) {
		self.slots.push(*slot);
	}
}

/// Every register reference of `function` itself, not of its children.
fn collect_slots(function: &mut Function<Graph>) -> Vec<SlotRef> {
	let mut collector = Collector {
		slots: function.parameters.clone(),
	};

	for block in &mut function.body.blocks {
		for statement in &mut block.statements {
			statement.for_each_slot(&mut collector);
		}

		block.warp.for_each_read(&mut collector);

		collector.slots.extend_from_slice(block.warp.loop_variables());
	}

	collector.slots
}

fn sample_programs() -> [Vec<u8>; 5] {
	[
		programs::arithmetic(),
		programs::numeric_for(),
		programs::if_else(),
		programs::while_loop(),
		programs::closure(),
	]
}

fn global(name: &str) -> Expression {
	Expression::Global(Arc::from(name.as_bytes()))
}

fn not(expression: Expression) -> Expression {
	Expression::unary(UnaryOperator::Not, expression)
}

#[test]
fn every_slot_belongs_to_a_web() {
	for data in sample_programs() {
		let mut function = mark(&data);

		function.for_each_mut(&mut |function| {
			let len = function.slots.webs.len();

			for slot in collect_slots(function) {
				assert!(slot.is_resolved(), "slot {} was not resolved", slot.index);
				assert!((slot.web as usize) < len, "web {} is out of range", slot.web);
				assert_eq!(function.slots.webs[slot.web as usize].slot, slot.index);
			}
		});
	}
}

#[test]
fn named_register_is_local_and_scratch_is_temporary() {
	let function = mark(&programs::arithmetic());
	let webs = &function.slots.webs;

	let x = webs
		.iter()
		.find(|web| web.name.as_deref() == Some("x"))
		.expect("x should have a web");

	assert_eq!(x.kind, SlotKind::Local);
	assert!(!x.is_generated);
	assert_eq!(
		webs.iter().filter(|web| web.kind == SlotKind::Temporary).count(),
		1
	);
}

#[test]
fn captured_register_links_its_upvalue() {
	let mut function = mark(&programs::closure());

	let link = function.children[0].upvalues[0]
		.link
		.expect("captured register should be linked");

	assert_eq!(function.slots.webs[link as usize].kind, SlotKind::UpvalueLink);

	UpvalueEliminator::new().run(&mut function);

	assert_eq!(function.slots.webs[link as usize].kind, SlotKind::Local);
	assert_eq!(function.children[0].upvalues[0].name.as_deref(), Some("count"));
}

#[test]
fn no_temporary_survives_elimination() {
	for data in sample_programs() {
		let mut function = mark(&data);

		UpvalueEliminator::new().run(&mut function);
		TemporaryEliminator::new(false)
			.run(&mut function)
			.expect("temporaries should be eliminated");

		function.for_each_mut(&mut |function| {
			for slot in collect_slots(function) {
				assert_ne!(
					function.slots.kind(slot),
					SlotKind::Temporary,
					"temporary in slot {} survived",
					slot.index
				);
			}
		});
	}
}

#[test]
fn elimination_stops_at_hazard() {
	let mut function = mark(&programs::hazard());

	let error = TemporaryEliminator::new(false)
		.run(&mut function)
		.unwrap_err();

	assert_eq!(error.block(), 0);
	assert!(error.to_string().contains("cannot move past statement"));
}

fn call_with(name: &str, arguments: Vec<Expression>) -> Statement {
	Statement::Call(Expression::Call(Box::new(Call {
		function: global(name),
		arguments,
		multiple: false,
	})))
}

fn call_statement(name: &str) -> Statement {
	call_with(name, Vec::new())
}

const SCRATCH: SlotRef = SlotRef {
	index: 0,
	web: 0,
	variable: None,
};

/// One block that loads `a` into a temporary and hands it to `f`.
fn scratch_function(arguments: Vec<Expression>) -> Function<Graph> {
	let mut block = Block::new(0);

	block.statements.push(Statement::single(Expression::Slot(SCRATCH), global("a")));
	block.statements.push(call_with("f", arguments));

	let mut body = Graph::new();

	body.add_block(block);

	let mut slots = SlotTable::new();

	slots.webs.push(Web {
		definitions: 1,
		reads: 1,
		..Web::new(0)
	});

	Function {
		parameters: Vec::new(),
		is_variadic: true,
		frame_size: 1,
		depth: 0,
		line: 0,
		upvalues: Vec::new(),
		variables: Vec::new(),
		slots,
		body,
		children: Vec::new(),
	}
}

#[test]
fn single_read_temporary_is_inlined() {
	let mut function = scratch_function(vec![Expression::Slot(SCRATCH)]);

	TemporaryEliminator::new(false)
		.run(&mut function)
		.expect("temporary should be inlined");

	assert_eq!(
		function.body.block(0).statements,
		vec![call_with("f", vec![global("a")])]
	);
}

#[test]
fn double_read_temporary_is_rejected() {
	let mut function = scratch_function(vec![Expression::Slot(SCRATCH), Expression::Slot(SCRATCH)]);

	let error = TemporaryEliminator::new(false)
		.run(&mut function)
		.unwrap_err();

	assert_eq!(
		error,
		EliminationError::ReadCount {
			block: 0,
			slot: 0,
			reads: 2,
		}
	);
	assert_eq!(function.body.block(0).statements.len(), 2);
}

#[test]
fn short_circuit_tests_are_joined() {
	let mut graph = Graph::new();

	let mut first = Block::new(0);
	let mut second = Block::new(2);
	let mut body = Block::new(4);

	first.warp = Warp::branch(not(global("a")), 3, 1);
	second.warp = Warp::branch(not(global("b")), 3, 2);
	body.statements.push(call_statement("f"));
	body.warp = Warp::Jump(3);

	for block in [first, second, body, Block::new(5)] {
		graph.add_block(block);
	}

	graph.compute_predecessors();

	assert_eq!(graph.fold_conditions(), 1);

	let Warp::Branch(branch) = &graph.block(0).warp else {
		panic!("entry should still branch");
	};

	assert_eq!(
		branch.condition,
		Expression::binary(BinaryOperator::Or, not(global("a")), not(global("b")))
	);
	assert_eq!((branch.taken, branch.fallthrough), (3, 2));
	assert!(graph.block(1).is_unreachable);
	assert_eq!(graph.predecessors(1).count(), 0);
}

#[test]
fn test_with_own_statements_is_not_joined() {
	let mut graph = Graph::new();

	let mut first = Block::new(0);
	let mut second = Block::new(2);

	first.warp = Warp::branch(global("a"), 3, 1);
	second.statements.push(call_statement("g"));
	second.warp = Warp::branch(global("b"), 3, 2);

	for block in [first, second, Block::new(4), Block::new(5)] {
		graph.add_block(block);
	}

	graph.block_mut(2).warp = Warp::Jump(3);
	graph.compute_predecessors();

	assert_eq!(graph.fold_conditions(), 0);
	assert!(!graph.block(1).is_unreachable);
}

#[test]
fn identical_targets_become_a_jump() {
	let mut graph = Graph::new();
	let mut first = Block::new(0);

	first.warp = Warp::branch(global("a"), 1, 1);

	graph.add_block(first);
	graph.add_block(Block::new(2));
	graph.compute_predecessors();

	assert_eq!(graph.fold_identical_branches(), 1);
	assert!(matches!(graph.block(0).warp, Warp::Jump(1)));
}

#[test]
fn negation_follows_de_morgan() {
	let (a, b) = (global("a"), global("b"));

	assert_eq!(
		Expression::binary(BinaryOperator::And, a.clone(), b.clone()).negate(),
		Expression::binary(BinaryOperator::Or, not(a.clone()), not(b.clone()))
	);
	assert_eq!(
		Expression::binary(BinaryOperator::Or, not(a.clone()), b.clone()).negate(),
		Expression::binary(BinaryOperator::And, a.clone(), not(b.clone()))
	);
	assert_eq!(
		Expression::binary(BinaryOperator::Lt, a.clone(), b.clone()).negate(),
		Expression::binary(BinaryOperator::Ge, a.clone(), b.clone())
	);
	assert_eq!(
		Expression::binary(BinaryOperator::Add, a.clone(), b.clone()).negate(),
		not(Expression::binary(BinaryOperator::Add, a.clone(), b))
	);
	assert_eq!(not(a.clone()).negate(), a);
}

#[test]
fn graph_renders_back_edges_dashed() {
	let function = build(&programs::numeric_for());
	let dot = Dot::new(&function.body).to_string();

	assert!(dot.starts_with("digraph {"), "{dot}");
	assert!(dot.contains("numeric for"), "{dot}");
	assert!(dot.contains("[style = dashed]"), "{dot}");
}

#[test]
fn jump_into_enclosing_else_is_unstructurable() {
	let mut graph = Graph::new();

	let mut outer = Block::new(0);
	let mut inner = Block::new(2);
	let mut then = Block::new(4);
	let mut otherwise = Block::new(6);

	outer.warp = Warp::branch(global("a"), 3, 1);
	inner.statements.push(call_statement("f"));
	inner.warp = Warp::branch(global("b"), 2, 3);
	then.statements.push(call_statement("g"));
	then.warp = Warp::Jump(4);
	otherwise.statements.push(call_statement("h"));
	otherwise.warp = Warp::Jump(4);

	for block in [outer, inner, then, otherwise, Block::new(8)] {
		graph.add_block(block);
	}

	graph.compute_predecessors();

	let error = Structurer::new().run(graph).unwrap_err();

	assert_eq!(error.blocks, vec![1, 3]);
}

const X: SlotRef = SlotRef {
	index: 0,
	web: 0,
	variable: Some(0),
};

/// A function whose only register is the named local `x`.
fn with_local_x(statements: Vec<Statement>) -> Function<Sequence> {
	let mut slots = SlotTable::new();

	slots.webs.push(Web {
		kind: SlotKind::Local,
		name: Some(Arc::from("x")),
		definitions: 2,
		reads: 2,
		..Web::new(0)
	});

	Function {
		parameters: Vec::new(),
		is_variadic: true,
		frame_size: 1,
		depth: 0,
		line: 0,
		upvalues: Vec::new(),
		variables: Vec::new(),
		slots,
		body: Sequence::from(statements),
		children: Vec::new(),
	}
}

/// `if <condition> then x = <value> end`
fn guard(condition: Expression, value: Expression) -> Statement {
	Statement::If(Box::new(If {
		condition,
		then: Sequence::from(vec![Statement::single(Expression::Slot(X), value)]),
		else_ifs: Vec::new(),
		otherwise: None,
	}))
}

fn print_primary(mut function: Function<Sequence>) -> String {
	let mut out = Vec::new();

	lua_mutator::primary_pass(&mut function);

	LuaPrinter::new()
		.print(&function, &mut out)
		.expect("writing to a vector should not fail");

	String::from_utf8(out).expect("source should be UTF-8")
}

#[test]
fn guarded_default_becomes_value() {
	let declared = with_local_x(vec![
		Statement::Local(Box::new(LocalDeclaration {
			names: vec![X],
			values: vec![global("a")],
		})),
		guard(not(Expression::Slot(X)), global("b")),
		Statement::returns(vec![Expression::Slot(X)]),
	]);

	assert_eq!(print_primary(declared), "local x = a or b\nreturn x\n");

	let assigned = with_local_x(vec![
		Statement::single(Expression::Slot(X), global("a")),
		guard(Expression::Slot(X), global("b")),
		Statement::returns(vec![Expression::Slot(X)]),
	]);

	assert_eq!(print_primary(assigned), "x = a and b\nreturn x\n");
}

#[test]
fn guard_reading_its_own_value_is_kept() {
	let function = with_local_x(vec![
		Statement::single(Expression::Slot(X), global("a")),
		guard(
			not(Expression::Slot(X)),
			Expression::binary(BinaryOperator::Or, Expression::Slot(X), global("b")),
		),
		Statement::returns(vec![Expression::Slot(X)]),
	]);

	assert_eq!(
		print_primary(function),
		"x = a\nif not x then\n\tx = x or b\nend\nreturn x\n"
	);
}
