mod common;

use std::sync::Arc;

use common::{
	assembler::{Dump, Kgc, Knum, Proto},
	programs,
};
use luajit_reader::{
	Parser, Reason,
	constant::{Constant, Number},
	listing::Listing,
	opcode::{OpcodeTable, Operation, Version},
	prototype::{InternalName, UpvalueSource, VariableName},
};
use pretty_assertions::assert_eq;

fn parse(data: &[u8]) -> luajit_reader::Chunk {
	let table = OpcodeTable::new(Version::V2_1);

	Parser::new(&table).parse(data).expect("dump should parse")
}

#[test]
fn header_keeps_chunk_name() {
	let chunk = parse(&programs::arithmetic());

	assert_eq!(chunk.header.version, Version::V2_1);
	assert_eq!(chunk.header.name.as_deref(), Some(&b"=test"[..]));
	assert!(!chunk.header.flags.is_stripped());
}

#[test]
fn stripped_dump_has_no_debug_info() {
	let chunk = parse(&programs::hazard());

	assert!(chunk.header.flags.is_stripped());
	assert!(chunk.header.name.is_none());
	assert!(chunk.root.debug.is_none());
}

#[test]
fn constants_are_indexed_by_operand() {
	let main = Proto::main(Version::V2_1)
		.string("first")
		.constant(Kgc::Signed(-3))
		.string("third")
		.ad(Operation::Ret0, 0, 1);
	let chunk = parse(&Dump::new(Version::V2_1).stripped().finish(&main));

	assert_eq!(
		chunk.root.constants,
		vec![
			Constant::String(Arc::from(&b"first"[..])),
			Constant::Signed(-3),
			Constant::String(Arc::from(&b"third"[..])),
		]
	);
}

#[test]
fn numbers_keep_integer_and_float_forms() {
	let main = Proto::main(Version::V2_1)
		.number(Knum::Integer(-5))
		.number(Knum::Float(0.5))
		.number(Knum::Integer(100_000))
		.ad(Operation::Ret0, 0, 1);
	let chunk = parse(&Dump::new(Version::V2_1).stripped().finish(&main));

	assert_eq!(
		chunk.root.numbers,
		vec![
			Number::Integer(-5),
			Number::Float(0.5),
			Number::Integer(100_000),
		]
	);
}

#[test]
fn children_are_attached_to_their_parent() {
	let chunk = parse(&programs::closure());
	let (index, child) = chunk.root.child(0).expect("constant 0 should be a closure");

	assert_eq!(index, 0);
	assert_eq!(chunk.root.children.len(), 1);
	assert_eq!(child.upvalues.len(), 1);
	assert_eq!(child.upvalues[0].source, UpvalueSource::Local(0));

	let debug = child.debug.as_ref().expect("child should keep debug info");

	assert_eq!(debug.upvalue_names, vec![Arc::<str>::from("count")]);
}

#[test]
fn variables_resolve_by_slot_and_position() {
	let chunk = parse(&programs::closure());
	let debug = chunk.root.debug.as_ref().expect("debug info should be present");

	let name_of = |slot, position| {
		debug
			.variable_at(slot, position)
			.map(|variable| variable.name.clone())
	};

	assert_eq!(name_of(0, 2), Some(VariableName::Named(Arc::from("count"))));
	assert_eq!(name_of(1, 3), Some(VariableName::Named(Arc::from("bump"))));
	assert_eq!(name_of(1, 2), None);
	assert_eq!(name_of(0, 6), None);
}

#[test]
fn internal_names_are_decoded() {
	let main = Proto::main(Version::V2_1)
		.ad(Operation::Ret0, 0, 1)
		.internal(1, 1, 2)
		.internal(2, 1, 2);
	let chunk = parse(&Dump::new(Version::V2_1).finish(&main));
	let debug = chunk.root.debug.expect("debug info should be present");
	let names: Vec<_> = debug.variables.into_iter().map(|variable| variable.name).collect();

	assert_eq!(
		names,
		vec![
			VariableName::Internal(InternalName::ForIndex),
			VariableName::Internal(InternalName::ForStop),
		]
	);
}

#[test]
fn every_truncation_is_rejected() {
	let data = programs::closure();
	let table = OpcodeTable::new(Version::V2_1);

	for len in 0..data.len() {
		let result = Parser::new(&table).parse(&data[..len]);

		assert!(result.is_err(), "prefix of {len} bytes should not parse");
	}
}

#[test]
fn bad_magic_is_rejected() {
	let mut data = programs::arithmetic();

	data[1] = b'X';

	let table = OpcodeTable::new(Version::V2_1);
	let error = Parser::new(&table).parse(&data).unwrap_err();

	assert_eq!(error.offset, 0);
	assert_eq!(error.reason, Reason::BadMagic);
}

#[test]
fn version_must_match_the_table() {
	let main = Proto::main(Version::V2_0).ad(Operation::Ret0, 0, 1);
	let data = Dump::new(Version::V2_0).stripped().finish(&main);
	let table = OpcodeTable::new(Version::V2_1);
	let error = Parser::new(&table).parse(&data).unwrap_err();

	assert_eq!(
		error.reason,
		Reason::VersionMismatch {
			expected: Version::V2_1,
			found: Version::V2_0,
		}
	);
	assert_eq!(Version::detect(&data), Some(Version::V2_0));
}

#[test]
fn opcode_tables_differ_between_versions() {
	let old = OpcodeTable::new(Version::V2_0);
	let new = OpcodeTable::new(Version::V2_1);

	assert_eq!(old.encode(Operation::IsType), None);
	assert!(new.encode(Operation::IsType).is_some());
	assert!(old.len() < new.len());

	for opcode in 0..new.len() as u8 {
		let operation = new.decode(opcode).expect("every opcode should decode");

		assert_eq!(new.encode(operation), Some(opcode));
	}

	assert_eq!(new.decode(new.len() as u8), None);
}

#[test]
fn listing_names_operations() {
	let chunk = parse(&programs::numeric_for());
	let table = OpcodeTable::new(Version::V2_1);
	let listing = Listing::new(&chunk.root, &table).to_string();

	assert!(listing.contains("KSHORT"), "{listing}");
	assert!(listing.contains("FORI"), "{listing}");
	assert!(listing.contains("\"f\""), "{listing}");
}
