#![allow(dead_code)]

pub mod assembler;
pub mod programs;

use lua_decompiler::{Decompiler, Options};
use luajit_reader::opcode::Version;

pub fn decompile_with(data: &[u8], options: Options) -> String {
	let decompiler = Decompiler::new(Version::V2_1, options);
	let mut out = Vec::new();

	decompiler
		.decompile_to(data, &mut out)
		.expect("dump should decompile");

	String::from_utf8(out).expect("source should be UTF-8")
}

pub fn decompile(data: &[u8]) -> String {
	decompile_with(data, Options::default())
}
