use std::{
	fs::{self, File},
	io::{BufWriter, StdoutLock, Write},
	path::{Path, PathBuf},
	process::ExitCode,
	sync::Mutex,
};

use clap::{CommandFactory, Parser, error::ErrorKind};
use control_flow_graph::Dot;
use lua_decompiler::{
	Decompiler, Error, Options,
	config::{self, Config, DEFAULT_LIST},
};
use luajit_reader::{listing::Listing, opcode::Version};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(version)]
struct Arguments {
	/// The LuaJIT bytecode file for processing
	#[arg(required_unless_present = "recursive")]
	file: Option<PathBuf>,

	/// Write the source to this file instead of the standard output
	#[arg(long, short)]
	output: Option<PathBuf>,

	/// Decompile every file under this directory
	#[arg(long, short, requires = "dir_out", conflicts_with = "file")]
	recursive: Option<PathBuf>,

	/// Directory receiving the sources of `--recursive`
	#[arg(long, short)]
	dir_out: Option<PathBuf>,

	/// Override the LuaJIT version, either 2.0 or 2.1
	#[arg(long, short)]
	jit_version: Option<String>,

	/// TOML file mapping paths to LuaJIT versions
	#[arg(long)]
	config: Option<PathBuf>,

	/// Version list of the configuration to use
	#[arg(long, short = 'v', default_value = DEFAULT_LIST)]
	version_config_list: String,

	/// Report failures inline without abandoning the file
	#[arg(long, short)]
	catch_asserts: bool,

	/// Also write the log to this file
	#[arg(long, short)]
	log_file: Option<PathBuf>,

	/// Print a listing of the bytecode instead of decompiling
	#[arg(long, conflicts_with = "dot")]
	dump: bool,

	/// Print the control flow graph of the main function in graphviz form
	#[arg(long)]
	dot: bool,
}

fn install_logging(log_file: Option<&Path>) -> std::io::Result<()> {
	let file = match log_file {
		Some(path) => {
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent)?;
			}

			Some(File::create(path)?)
		}
		None => None,
	};

	let level = if file.is_some() { "info" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let file_layer = file.map(|file| {
		fmt::layer()
			.with_ansi(false)
			.without_time()
			.with_writer(Mutex::new(file))
	});

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(file_layer)
		.init();

	Ok(())
}

fn lock_standard_output() -> BufWriter<StdoutLock<'static>> {
	const DEFAULT_BUF_SIZE: usize = 1024 * 1024;

	BufWriter::with_capacity(DEFAULT_BUF_SIZE, std::io::stdout().lock())
}

fn select_version(
	arguments: &Arguments,
	config: Option<&Config>,
	path: &Path,
	data: &[u8],
) -> Result<Version, Error> {
	if let Some(name) = &arguments.jit_version {
		return Ok(config::parse_name(name)?);
	}

	if let Some(config) = config {
		let path = std::path::absolute(path)?;

		return Ok(config.select(&arguments.version_config_list, &path.to_string_lossy())?);
	}

	Ok(Version::detect(data).unwrap_or(Version::V2_1))
}

fn create_decompiler(
	arguments: &Arguments,
	config: Option<&Config>,
	path: &Path,
	data: &[u8],
) -> Result<Decompiler, Error> {
	let version = select_version(arguments, config, path, data)?;
	let options = Options {
		recover: arguments.catch_asserts,
	};

	tracing::debug!(path = %path.display(), %version, "selected version");

	Ok(Decompiler::new(version, options))
}

fn decompile_file(
	arguments: &Arguments,
	config: Option<&Config>,
	input: &Path,
	output: &Path,
) -> Result<(), Error> {
	let data = fs::read(input)?;
	let decompiler = create_decompiler(arguments, config, input, &data)?;
	let function = decompiler.decompile(&data)?;
	let mut out = BufWriter::new(File::create(output)?);

	lua_decompiler::write(&function, &mut out)?;

	out.flush()?;

	Ok(())
}

fn destination_of(input: &Path, output: &Path, path: &Path) -> PathBuf {
	let relative = path.strip_prefix(input).unwrap_or(path);
	let mut destination = output.join(relative);

	if let Some(name) = path.file_name() {
		destination.set_file_name(name.to_string_lossy().replace(".luac", ".lua"));
	}

	destination
}

fn run_recursive(
	arguments: &Arguments,
	config: Option<&Config>,
	input: &Path,
	output: &Path,
) -> Result<(), Error> {
	if arguments.version_config_list != DEFAULT_LIST {
		Arguments::command()
			.error(
				ErrorKind::ArgumentConflict,
				"version config lists are not supported in recursive directory mode",
			)
			.exit();
	}

	let fallback = config.and_then(|config| config.fallback.as_ref());
	let mut total = 0_usize;
	let mut failed = 0_usize;

	for entry in WalkDir::new(input).sort_by_file_name() {
		let entry = entry.map_err(std::io::Error::from)?;

		if !entry.file_type().is_file() || !entry.file_name().to_string_lossy().contains(".lua") {
			continue;
		}

		let path = entry.path();
		let destination = destination_of(input, output, path);

		if let Some(parent) = destination.parent() {
			fs::create_dir_all(parent)?;
		}

		total += 1;

		match decompile_file(arguments, config, path, &destination) {
			Ok(()) => tracing::info!(path = %path.display(), "decompiled"),
			Err(error) => {
				failed += 1;

				tracing::warn!(path = %path.display(), %error, "decompilation failed");

				if let Some(fallback) = fallback
					&& let Err(error) = fallback.run(path, &destination)
				{
					tracing::warn!(path = %path.display(), %error, "fallback failed");
				}
			}
		}
	}

	println!("New file(s): {total}. Including {failed} file(s) decompiled by luajit");

	Ok(())
}

fn run_single(arguments: &Arguments, config: Option<&Config>, file: &Path) -> Result<(), Error> {
	let data = fs::read(file)?;
	let decompiler = create_decompiler(arguments, config, file, &data)?;
	let mut out: Box<dyn Write> = match &arguments.output {
		Some(path) => Box::new(BufWriter::new(File::create(path)?)),
		None => Box::new(lock_standard_output()),
	};

	if arguments.dump {
		let chunk = decompiler.parse(&data)?;

		write!(out, "{}", Listing::new(&chunk.root, decompiler.table()))?;
	} else if arguments.dot {
		let chunk = decompiler.parse(&data)?;
		let function = decompiler.build(&chunk)?;

		write!(out, "{}", Dot::new(&function.body))?;
	} else {
		decompiler.decompile_to(&data, &mut out)?;
	}

	out.flush()?;

	Ok(())
}

fn run(arguments: &Arguments) -> Result<(), Error> {
	let config = arguments
		.config
		.as_deref()
		.map(Config::from_file)
		.transpose()?;

	if let Some(input) = &arguments.recursive {
		let Some(output) = &arguments.dir_out else {
			Arguments::command()
				.error(ErrorKind::MissingRequiredArgument, "`--recursive` needs `--dir-out`")
				.exit();
		};

		return run_recursive(arguments, config.as_ref(), input, output);
	}

	let Some(file) = &arguments.file else {
		Arguments::command()
			.error(ErrorKind::MissingRequiredArgument, "a file or `--recursive` is required")
			.exit();
	};

	run_single(arguments, config.as_ref(), file)
}

fn main() -> ExitCode {
	let arguments = Arguments::parse();

	if let Err(error) = install_logging(arguments.log_file.as_deref()) {
		eprintln!("ljd: {error}");

		return ExitCode::FAILURE;
	}

	match run(&arguments) {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			eprintln!("ljd: {error}");

			ExitCode::FAILURE
		}
	}
}
