#![no_std]

extern crate alloc;

mod definitions;
mod disjoint;
mod live_sets;
mod locals;

pub use self::{definitions::DefinitionMarker, live_sets::LiveSets, locals::LocalMarker};
