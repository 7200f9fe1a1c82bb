#![no_std]

extern crate alloc;

mod error;
mod reader;

pub mod constant;
pub mod header;
pub mod instruction;
pub mod listing;
pub mod opcode;
pub mod parser;
pub mod prototype;

pub use self::{
	error::{MalformedBytecode, Reason},
	parser::{Chunk, Parser},
};
