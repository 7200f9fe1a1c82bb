#![no_std]

extern crate alloc;

mod error;
mod temporary;
mod upvalue;

pub use self::{error::EliminationError, temporary::TemporaryEliminator, upvalue::UpvalueEliminator};
