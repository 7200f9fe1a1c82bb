use std::{
	fs,
	io::{ErrorKind, Result},
	path::{Path, PathBuf},
	process::{Command, Stdio},
	thread,
	time::Duration,
};

use serde::Deserialize;

fn default_work() -> PathBuf {
	PathBuf::from("luajit")
}

fn default_input() -> String {
	String::from("test.lua")
}

fn default_output() -> String {
	String::from("out.lua")
}

const fn default_attempts() -> u32 {
	2000
}

const fn default_interval() -> u64 {
	1
}

fn remove_if_present(path: &Path) -> Result<()> {
	match fs::remove_file(path) {
		Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
		result => result,
	}
}

/// An external decompiler run on files the pipeline gives up on. The input
/// is staged into `work`, the program is started there, and `output` is
/// polled for until it appears, the program exits without it, or the
/// attempts run out. A program still running once `output` appears is
/// stopped.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fallback {
	pub program: PathBuf,

	#[serde(default)]
	pub arguments: Vec<String>,

	#[serde(default = "default_work")]
	pub work: PathBuf,

	#[serde(default = "default_input")]
	pub input: String,

	#[serde(default = "default_output")]
	pub output: String,

	#[serde(default = "default_attempts")]
	pub attempts: u32,

	#[serde(default = "default_interval")]
	pub interval_ms: u64,
}

impl Fallback {
	#[must_use]
	pub fn new(program: PathBuf) -> Self {
		Self {
			program,
			arguments: Vec::new(),
			work: default_work(),
			input: default_input(),
			output: default_output(),
			attempts: default_attempts(),
			interval_ms: default_interval(),
		}
	}

	/// Decompiles `input` into `output` with the external program. Returns
	/// whether a result was produced in time.
	///
	/// # Errors
	///
	/// Returns any IO error staging the files or starting the program.
	pub fn run(&self, input: &Path, output: &Path) -> Result<bool> {
		let staged = self.work.join(&self.input);
		let result = self.work.join(&self.output);

		fs::create_dir_all(&self.work)?;
		remove_if_present(&result)?;
		fs::copy(input, &staged)?;

		let mut child = Command::new(&self.program)
			.args(&self.arguments)
			.current_dir(&self.work)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.spawn()?;

		let interval = Duration::from_millis(self.interval_ms);

		for _ in 0..self.attempts {
			let exited = child.try_wait()?.is_some();

			if result.exists() {
				if !exited {
					child.kill()?;
					child.wait()?;
				}

				fs::copy(&result, output)?;

				tracing::debug!(input = %input.display(), exited, "fallback produced a result");

				return Ok(true);
			}

			if exited {
				break;
			}

			thread::sleep(interval);
		}

		if child.try_wait()?.is_none() {
			child.kill()?;
			child.wait()?;
		}

		tracing::warn!(input = %input.display(), "fallback produced no result");

		Ok(false)
	}
}
