use alloc::{format, sync::Arc, vec::Vec};
use control_flow_graph::Graph;
use hashbrown::HashMap;
use lua_tree::{
	expression::FunctionLiteral,
	function::{Function, UpvalueSource},
	slot::{SlotKind, SlotRef, SlotTable, Web},
	statement::SlotHandler,
};
use set::Set;

use crate::{disjoint::Disjoint, live_sets::LiveSets};

#[derive(Clone, Copy, Default)]
struct Node {
	slot: u16,
	reads: u32,
	definitions: u32,
	variable: Option<u16>,
	is_declared: bool,
	is_crossing: bool,
	is_captured: bool,
}

/// Links every register access to the definitions reaching it.
struct WebBuilder {
	nodes: Vec<Node>,
	disjoint: Disjoint,
	entries: HashMap<(u16, u16), u32>,
	current: HashMap<u16, u32>,
	open: Set,
	closures: Vec<u16>,
	block: u16,
}

impl WebBuilder {
	fn new() -> Self {
		Self {
			nodes: Vec::new(),
			disjoint: Disjoint::new(),
			entries: HashMap::new(),
			current: HashMap::new(),
			open: Set::new(),
			closures: Vec::new(),
			block: 0,
		}
	}

	fn clear(&mut self) {
		self.nodes.clear();
		self.disjoint.clear();
		self.entries.clear();
		self.current.clear();
		self.open.clear();
		self.closures.clear();
	}

	fn add_node(&mut self, node: Node) -> u32 {
		self.nodes.push(node);
		self.disjoint.add()
	}

	/// The node standing for the value `slot` holds when `block` begins.
	fn entry(&mut self, block: u16, slot: u16) -> u32 {
		if let Some(&node) = self.entries.get(&(block, slot)) {
			return node;
		}

		let node = self.add_node(Node {
			slot,
			..Node::default()
		});

		self.entries.insert((block, slot), node);

		node
	}

	fn current_definition(&mut self, slot: u16) -> u32 {
		if let Some(&node) = self.current.get(&slot) {
			return node;
		}

		let node = self.entry(self.block, slot);

		self.current.insert(slot, node);

		node
	}

	fn start_block(&mut self, block: u16, open: &Set) {
		self.block = block;
		self.current.clear();
		self.open.clear();
		self.open.extend(open.ascending());
	}

	fn define(&mut self, slot: &mut SlotRef, is_declared: bool) {
		let node = self.add_node(Node {
			slot: slot.index,
			definitions: 1,
			variable: slot.variable,
			is_declared,
			..Node::default()
		});

		slot.web = node;

		self.current.insert(slot.index, node);
	}

	fn capture(&mut self, slot: u16) -> u32 {
		let node = self.current_definition(slot);

		self.nodes[node as usize].is_captured = true;
		self.open.grow_insert(slot.into());

		node
	}

	fn link(&mut self, successor: u16, slot: u16) {
		let definition = self.current_definition(slot);
		let entry = self.entry(successor, slot);

		self.nodes[entry as usize].is_crossing = true;
		self.disjoint.union(definition, entry);
	}
}

impl SlotHandler for WebBuilder {
	fn read(&mut self, slot: &mut SlotRef) {
		let node = self.add_node(Node {
			slot: slot.index,
			reads: 1,
			variable: slot.variable,
			..Node::default()
		});

		let definition = self.current_definition(slot.index);

		self.disjoint.union(node, definition);

		slot.web = node;
	}

	fn write(&mut self, slot: &mut SlotRef) {
		// Writes to a captured register update the shared variable.
		let previous = self
			.open
			.contains(slot.index.into())
			.then(|| self.current_definition(slot.index));

		self.define(slot, false);

		if let Some(previous) = previous {
			self.disjoint.union(slot.web, previous);
		}
	}

	fn closure(&mut self, function: FunctionLiteral) {
		self.closures.push(function.child);
	}
}

struct Remapper<'webs> {
	webs: &'webs [u32],
}

impl SlotHandler for Remapper<'_> {
	fn read(&mut self, slot: &mut SlotRef) {
		slot.web = self.webs[slot.web as usize];
	}

	fn write(&mut self, slot: &mut SlotRef) {
		self.read(slot);
	}
}

struct CaptureFinder<'function, B> {
	children: &'function [Function<B>],
	captures: &'function mut Set,
}

impl<B> SlotHandler for CaptureFinder<'_, B> {
	fn read(&mut self, _slot: &mut SlotRef) {}

	fn write(&mut self, _slot: &mut SlotRef) {}

	fn closure(&mut self, function: FunctionLiteral) {
		for_each_capture(self.children, function.child, |slot| {
			self.captures.grow_insert(slot.into());
		});
	}
}

fn for_each_capture<B, H: FnMut(u16)>(children: &[Function<B>], child: u16, mut handler: H) {
	let Some(child) = children.get(usize::from(child)) else {
		return;
	};

	for upvalue in &child.upvalues {
		if let UpvalueSource::Local(slot) = upvalue.source {
			handler(slot);
		}
	}
}

/// Groups register accesses into variables and classifies each one as a
/// temporary, a local, or a local captured by a closure.
pub struct LocalMarker {
	live_sets: LiveSets,
	webs: WebBuilder,
	open_in: Vec<Set>,
	captures: Vec<Set>,
	node_webs: Vec<u32>,
	links: Vec<(u16, usize, u32)>,
	buffer: Vec<usize>,
}

impl LocalMarker {
	#[must_use]
	pub fn new() -> Self {
		Self {
			live_sets: LiveSets::new(),
			webs: WebBuilder::new(),
			open_in: Vec::new(),
			captures: Vec::new(),
			node_webs: Vec::new(),
			links: Vec::new(),
			buffer: Vec::new(),
		}
	}

	fn open_out(&mut self, graph: &Graph, id: u16) {
		let index = usize::from(id);
		let close = graph.block(id).close.map_or(usize::MAX, usize::from);

		self.buffer.clear();
		self.buffer.extend(self.open_in[index].ascending());
		self.buffer.extend(self.captures[index].ascending());
		self.buffer.retain(|&slot| slot < close);
	}

	/// Finds the registers captured and still open on entry to each block.
	fn find_open_captures(&mut self, graph: &mut Graph, children: &[Function<Graph>]) {
		let len = graph.len();

		for sets in [&mut self.open_in, &mut self.captures] {
			sets.iter_mut().for_each(Set::clear);
			sets.resize_with(len, Set::new);
		}

		for id in graph.block_ids() {
			let mut finder = CaptureFinder {
				children,
				captures: &mut self.captures[usize::from(id)],
			};

			for statement in &mut graph.block_mut(id).statements {
				statement.for_each_slot(&mut finder);
			}
		}

		let mut changed = true;

		while changed {
			changed = false;

			for id in graph.block_ids() {
				self.open_out(graph, id);

				for successor in graph.successors(id) {
					for &slot in &self.buffer {
						changed |= !self.open_in[usize::from(successor)].grow_insert(slot);
					}
				}
			}
		}
	}

	fn scan_block(&mut self, graph: &mut Graph, children: &[Function<Graph>], id: u16) {
		self.webs.start_block(id, &self.open_in[usize::from(id)]);

		// Loop variables are defined before the body runs.
		for preheader in graph.predecessors(id).collect::<Vec<_>>() {
			let warp = &mut graph.block_mut(preheader).warp;

			if warp.loop_body() == Some(id) {
				for variable in warp.loop_variables_mut() {
					self.webs.define(variable, true);
				}
			}
		}

		let block = graph.block_mut(id);

		for statement in &mut block.statements {
			statement.for_each_slot(&mut self.webs);

			for child in core::mem::take(&mut self.webs.closures) {
				let Some(function) = children.get(usize::from(child)) else {
					continue;
				};

				for (index, upvalue) in function.upvalues.iter().enumerate() {
					if let UpvalueSource::Local(slot) = upvalue.source {
						let node = self.webs.capture(slot);

						self.links.push((child, index, node));
					}
				}
			}
		}

		block.warp.for_each_read(&mut self.webs);

		if let Some(close) = block.close {
			self.buffer.clear();
			self.buffer.extend(self.webs.open.ascending());

			for &slot in &self.buffer {
				if slot >= usize::from(close) {
					self.webs.open.remove(slot);
				}
			}
		}

		for successor in graph.successors(id) {
			self.buffer.clear();
			self.buffer.extend(self.live_sets.live_in(successor).ascending());
			self.buffer.extend(self.webs.open.ascending());

			for &slot in &self.buffer {
				if let Ok(slot) = u16::try_from(slot) {
					self.webs.link(successor, slot);
				}
			}
		}
	}

	fn join_named(&mut self) {
		let mut named: HashMap<u16, u32> = HashMap::new();

		for (node, data) in self.webs.nodes.iter().enumerate() {
			let Some(variable) = data.variable else {
				continue;
			};

			let node = node as u32;

			match named.get(&variable) {
				Some(&first) => self.webs.disjoint.union(first, node),
				None => {
					named.insert(variable, node);
				}
			}
		}
	}

	fn classify(node: &Node) -> SlotKind {
		if node.is_captured {
			SlotKind::UpvalueLink
		} else if node.is_declared
			|| node.is_crossing
			|| node.variable.is_some()
			|| node.reads != 1
			|| node.definitions != 1
		{
			SlotKind::Local
		} else {
			SlotKind::Temporary
		}
	}

	/// Folds the nodes of every web into one summary and builds the table.
	fn build_table<B>(&mut self, function: &Function<B>) -> SlotTable {
		let mut roots = HashMap::new();
		let mut summaries: Vec<Node> = Vec::new();

		self.node_webs.clear();

		for node in 0..self.webs.disjoint.len() as u32 {
			let root = self.webs.disjoint.find(node);
			let web = *roots.entry(root).or_insert_with(|| {
				summaries.push(Node {
					slot: self.webs.nodes[node as usize].slot,
					..Node::default()
				});

				summaries.len() as u32 - 1
			});

			let data = self.webs.nodes[node as usize];
			let summary = &mut summaries[web as usize];

			summary.reads += data.reads;
			summary.definitions += data.definitions;
			summary.variable = summary.variable.or(data.variable);
			summary.is_declared |= data.is_declared;
			summary.is_crossing |= data.is_crossing;
			summary.is_captured |= data.is_captured;

			self.node_webs.push(web);
		}

		let mut ordinals: HashMap<u16, u16> = HashMap::new();
		let webs = summaries
			.iter()
			.map(|summary| {
				let kind = Self::classify(summary);
				let name = match summary.variable {
					Some(variable) => function.variables.get(usize::from(variable)).cloned(),
					None if kind == SlotKind::Temporary => None,
					None => {
						let ordinal = ordinals.entry(summary.slot).or_insert(0);
						let name = generated_name(summary.slot, function.depth, *ordinal);

						*ordinal += 1;

						Some(name)
					}
				};

				Web {
					slot: summary.slot,
					kind,
					is_generated: summary.variable.is_none() && name.is_some(),
					name,
					definitions: summary.definitions,
					reads: summary.reads,
				}
			})
			.collect();

		SlotTable { webs }
	}

	fn remap(&self, function: &mut Function<Graph>) {
		let mut remapper = Remapper {
			webs: &self.node_webs,
		};

		for parameter in &mut function.parameters {
			remapper.write(parameter);
		}

		for block in &mut function.body.blocks {
			for statement in &mut block.statements {
				statement.for_each_slot(&mut remapper);
			}

			block.warp.for_each_read(&mut remapper);

			for variable in block.warp.loop_variables_mut() {
				remapper.write(variable);
			}
		}

		for &(child, index, node) in &self.links {
			let upvalue = &mut function.children[usize::from(child)].upvalues[index];

			upvalue.link = Some(self.node_webs[node as usize]);
		}
	}

	/// Assigns a web to every register reference of `function`, not
	/// looking into its children, and fills its slot table. Upvalues of the
	/// children are linked to the webs they capture.
	pub fn run(&mut self, function: &mut Function<Graph>) {
		let Function {
			parameters,
			body,
			children,
			..
		} = function;

		self.webs.clear();
		self.links.clear();
		self.live_sets.run(body);
		self.find_open_captures(body, children);

		for parameter in parameters.iter_mut() {
			let node = self.webs.entry(0, parameter.index);
			let data = &mut self.webs.nodes[node as usize];

			data.definitions = 1;
			data.variable = parameter.variable;
			data.is_declared = true;

			parameter.web = node;
		}

		for id in body.block_ids() {
			self.scan_block(body, children, id);
		}

		self.join_named();

		function.slots = self.build_table(function);

		self.remap(function);

		tracing::debug!(
			depth = function.depth,
			webs = function.slots.webs.len(),
			"marked locals"
		);
	}
}

impl Default for LocalMarker {
	fn default() -> Self {
		Self::new()
	}
}

/// The name of a variable without debug information. Nested functions carry
/// their depth so they never shadow a captured variable of an outer one.
fn generated_name(slot: u16, depth: u16, ordinal: u16) -> Arc<str> {
	let name = match (depth, ordinal) {
		(0, 0) => format!("slot{slot}"),
		(depth, 0) => format!("slot{slot}_{depth}"),
		(depth, ordinal) => format!("slot{slot}_{depth}_{ordinal}"),
	};

	Arc::from(name)
}
