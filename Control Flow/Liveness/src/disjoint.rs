use alloc::vec::Vec;

/// Union-find over dense `u32` keys.
pub struct Disjoint {
	parents: Vec<u32>,
}

impl Disjoint {
	pub const fn new() -> Self {
		Self {
			parents: Vec::new(),
		}
	}

	pub fn clear(&mut self) {
		self.parents.clear();
	}

	pub fn len(&self) -> usize {
		self.parents.len()
	}

	pub fn add(&mut self) -> u32 {
		let id = self.parents.len() as u32;

		self.parents.push(id);

		id
	}

	pub fn find(&mut self, mut id: u32) -> u32 {
		while self.parents[id as usize] != id {
			let parent = self.parents[id as usize];

			self.parents[id as usize] = self.parents[parent as usize];
			id = parent;
		}

		id
	}

	pub fn union(&mut self, lhs: u32, rhs: u32) {
		let lhs = self.find(lhs);
		let rhs = self.find(rhs);

		// The older node stays the root so web numbering follows first use.
		if lhs < rhs {
			self.parents[rhs as usize] = lhs;
		} else {
			self.parents[lhs as usize] = rhs;
		}
	}
}
