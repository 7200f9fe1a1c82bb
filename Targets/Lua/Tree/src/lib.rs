#![no_std]

extern crate alloc;

pub mod expression;
pub mod function;
pub mod slot;
pub mod statement;
pub mod visitor;
