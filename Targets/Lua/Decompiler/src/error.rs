use std::path::PathBuf;

use control_flow_builder::BuildError;
use control_flow_structurer::UnstructurableControlFlow;
use data_flow_eliminator::EliminationError;
use lua_validator::InvariantViolation;
use luajit_reader::MalformedBytecode;
use thiserror::Error;

/// Errors reading the version configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read configuration at {}: {source}", path.display())]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to parse configuration at {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		source: toml::de::Error,
	},

	#[error("unknown LuaJIT version `{0}`")]
	UnknownVersion(String),
}

/// Every way decompiling one file can fail.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	MalformedBytecode(#[from] MalformedBytecode),

	#[error(transparent)]
	Build(#[from] BuildError),

	#[error(transparent)]
	InvariantViolation(#[from] InvariantViolation),

	#[error(transparent)]
	Elimination(#[from] EliminationError),

	#[error(transparent)]
	UnstructurableControlFlow(#[from] UnstructurableControlFlow),

	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Whether the error names an opcode missing from the selected table.
	#[must_use]
	pub const fn is_unsupported_opcode(&self) -> bool {
		matches!(self, Self::Build(BuildError::UnsupportedOpcode { .. }))
	}
}
