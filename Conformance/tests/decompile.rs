mod common;

use common::{
	assembler::{Dump, Knum, Proto},
	decompile, decompile_with, programs,
};
use lua_decompiler::{Decompiler, Error, Options};
use luajit_reader::{
	instruction::Instruction,
	opcode::{OpcodeTable, Operation, Version},
};
use pretty_assertions::assert_eq;

const RECOVER: Options = Options { recover: true };

fn try_decompile(data: &[u8], options: Options) -> Result<String, Error> {
	let decompiler = Decompiler::new(Version::V2_1, options);
	let mut out = Vec::new();

	decompiler.decompile_to(data, &mut out)?;

	Ok(String::from_utf8(out).expect("source should be UTF-8"))
}

#[test]
fn named_local_keeps_its_name() {
	assert_eq!(decompile(&programs::arithmetic()), "local x = 1 + 2\nreturn x\n");
}

#[test]
fn numeric_for_loop() {
	assert_eq!(
		decompile(&programs::numeric_for()),
		"for slot3 = 1, 3 do\n\tf(slot3)\nend\n"
	);
}

#[test]
fn if_with_else() {
	assert_eq!(
		decompile(&programs::if_else()),
		"if g then\n\th(1)\nelse\n\th(2)\nend\n"
	);
}

#[test]
fn while_loop_with_named_counter() {
	assert_eq!(
		decompile(&programs::while_loop()),
		"local i = 0\nwhile i < 10 do\n\ti = i + 1\nend\nreturn i\n"
	);
}

#[test]
fn closure_captures_local() {
	assert_eq!(
		decompile(&programs::closure()),
		"local count = 0\nlocal bump = function()\n\tcount = count + 1\nend\nbump()\n"
	);
}

#[test]
fn and_or_value_tested_in_place() {
	assert_eq!(
		decompile(&programs::and_or_value()),
		"local x = a < b and c or d\nreturn x\n"
	);
	assert_eq!(
		decompile(&programs::and_or_value_stripped()),
		"return a < b and c or d\n"
	);
}

#[test]
fn and_or_value_copied_by_test() {
	assert_eq!(decompile(&programs::and_or_copy()), "return a < b and c or d\n");
}

#[test]
fn and_or_value_as_argument() {
	assert_eq!(decompile(&programs::and_or_argument()), "f(a and b or c)\n");
}

#[test]
fn default_values() {
	assert_eq!(
		decompile(&programs::default_value(Operation::IsT)),
		"local x = a or b\nreturn x\n"
	);
	assert_eq!(
		decompile(&programs::default_value(Operation::IsF)),
		"local x = a and b\nreturn x\n"
	);
}

#[test]
fn generic_for_loop() {
	assert_eq!(
		decompile(&programs::generic_for()),
		"for k, v in pairs(t) do\n\tf(k, v)\nend\n"
	);
	assert_eq!(
		decompile(&programs::generic_for_stripped()),
		"for slot3, slot4 in pairs(t) do\n\tf(slot3, slot4)\nend\n"
	);
}

#[test]
fn repeat_until_loop() {
	assert_eq!(
		decompile(&programs::repeat_until()),
		"local i = 0\nrepeat\n\ti = i + 1\nuntil i >= 10\nreturn i\n"
	);
}

#[test]
fn method_call_sugar() {
	assert_eq!(decompile(&programs::method_call()), "local o = g\no:m(1)\n");
}

#[test]
fn table_fields_fold_into_constructor() {
	assert_eq!(
		decompile(&programs::table_fields()),
		"local t = { x = 1 }\nreturn t\n"
	);
}

#[test]
fn concatenation_chain() {
	assert_eq!(decompile(&programs::concat()), "return a .. b .. c\n");
}

#[test]
fn else_if_chain() {
	assert_eq!(
		decompile(&programs::else_if()),
		"if a then\n\tf(1)\nelseif b then\n\tf(2)\nelse\n\tf(3)\nend\n"
	);
}

#[test]
fn multiple_assignment_from_call() {
	assert_eq!(
		decompile(&programs::multiple_results()),
		"local x, y = f()\nreturn x, y\n"
	);
}

#[test]
fn numbers_are_printed_in_source_form() {
	let cases = [
		(Knum::Float(0.5), "return 0.5\n"),
		(Knum::Integer(100_000), "return 100000\n"),
		(Knum::Integer(-5), "return -5\n"),
	];

	for (number, expected) in cases {
		assert_eq!(decompile(&programs::return_number(number)), expected);
	}
}

#[test]
fn output_is_deterministic() {
	for data in [
		programs::arithmetic(),
		programs::numeric_for(),
		programs::if_else(),
		programs::while_loop(),
		programs::closure(),
		programs::and_or_value(),
		programs::generic_for(),
		programs::else_if(),
	] {
		assert_eq!(decompile(&data), decompile(&data));
	}
}

#[test]
fn hazard_fails_the_file() {
	let result = try_decompile(&programs::hazard(), Options::default());

	assert!(
		matches!(result, Err(Error::Elimination(_))),
		"expected an elimination error, got {result:?}"
	);
}

#[test]
fn hazard_is_reported_inline_when_recovering() {
	let source = decompile_with(&programs::hazard(), RECOVER);

	assert!(source.contains("-- Decompilation error:"), "{source}");
	assert!(source.contains("cannot move past statement"), "{source}");
	assert!(source.contains("slot0 = a\na = 1\nb = slot0\n"), "{source}");
}

#[test]
fn unknown_opcode_byte_is_unsupported() {
	let table = OpcodeTable::new(Version::V2_1);
	let opcode = table.len() as u8;
	let main = Proto::main(Version::V2_1)
		.raw(Instruction::from_ad(opcode, 0, 0).0)
		.ad(Operation::Ret0, 0, 1);
	let data = Dump::new(Version::V2_1).stripped().finish(&main);
	let error = try_decompile(&data, Options::default()).unwrap_err();

	assert!(error.is_unsupported_opcode(), "{error}");
}

#[test]
fn trace_opcodes_are_unsupported() {
	let main = Proto::main(Version::V2_1)
		.ad(Operation::JLoop, 0, 0)
		.ad(Operation::Ret0, 0, 1);
	let data = Dump::new(Version::V2_1).stripped().finish(&main);
	let error = try_decompile(&data, RECOVER).unwrap_err();

	assert!(error.is_unsupported_opcode(), "{error}");
}

#[test]
fn malformed_dump_is_an_error() {
	let data = programs::arithmetic();
	let error = try_decompile(&data[..data.len() - 1], Options::default()).unwrap_err();

	assert!(matches!(error, Error::MalformedBytecode(_)), "{error}");
}

#[test]
fn wrong_version_is_an_error() {
	let main = Proto::main(Version::V2_0).ad(Operation::Ret0, 0, 1);
	let data = Dump::new(Version::V2_0).stripped().finish(&main);
	let error = try_decompile(&data, Options::default()).unwrap_err();

	assert!(matches!(error, Error::MalformedBytecode(_)), "{error}");
}

#[test]
fn old_version_decompiles_with_its_table() {
	let main = Proto::main(Version::V2_0)
		.ad(Operation::KShort, 0, 7)
		.ad(Operation::Ret1, 0, 2);
	let data = Dump::new(Version::V2_0).stripped().finish(&main);
	let decompiler = Decompiler::new(Version::V2_0, Options::default());
	let mut out = Vec::new();

	decompiler
		.decompile_to(&data, &mut out)
		.expect("dump should decompile");

	assert_eq!(String::from_utf8(out).unwrap(), "return 7\n");
}

#[test]
fn empty_main_prints_nothing() {
	let main = Proto::main(Version::V2_1).ad(Operation::Ret0, 0, 1);
	let data = Dump::new(Version::V2_1).stripped().finish(&main);

	assert_eq!(decompile(&data), "");
}
