use alloc::vec::Vec;
use thiserror::Error;

/// A region of the graph matching no structured statement, such as a jump
/// into a loop or a `goto`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unstructurable control flow at blocks {blocks:?}")]
pub struct UnstructurableControlFlow {
	pub blocks: Vec<u16>,
}
