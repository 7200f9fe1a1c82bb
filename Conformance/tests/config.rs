use std::{
	path::{Path, PathBuf},
	time::{Duration, Instant},
};

use lua_decompiler::{
	ConfigError,
	config::{self, Config, DEFAULT_LIST},
	fallback::Fallback,
};
use luajit_reader::opcode::Version;
use pretty_assertions::assert_eq;

const DOCUMENT: &str = r#"
default = "2.1"

[lists.version_default]
"legacy/" = "2.0"

[lists.game]
"scripts/old" = 2.0
"scripts" = "2.1"
"#;

fn parse(text: &str) -> Result<Config, ConfigError> {
	Config::from_str(text, Path::new("config.toml"))
}

#[test]
fn selects_first_matching_entry() {
	let config = parse(DOCUMENT).expect("config should parse");

	assert!(config.has_list("game"));
	assert!(config.has_list(DEFAULT_LIST));
	assert!(!config.has_list("missing"));

	let select = |list, path| config.select(list, path).expect("version should be known");

	assert_eq!(select("game", "/data/scripts/old/a.luac"), Version::V2_0);
	assert_eq!(select("game", "/data/scripts/new/a.luac"), Version::V2_1);
	assert_eq!(select("game", "/data/other/a.luac"), Version::V2_1);
}

#[test]
fn windows_separators_are_normalized() {
	let config = parse(DOCUMENT).expect("config should parse");

	assert_eq!(
		config.select("game", r"C:\data\scripts\old\a.luac").unwrap(),
		Version::V2_0
	);
}

#[test]
fn missing_list_falls_back_to_default_list() {
	let config = parse(DOCUMENT).expect("config should parse");

	assert_eq!(config.select("missing", "/x/legacy/a.luac").unwrap(), Version::V2_0);
	assert_eq!(config.select("missing", "/x/modern/a.luac").unwrap(), Version::V2_1);
}

#[test]
fn empty_document_uses_defaults() {
	let config = parse("").expect("empty config should parse");

	assert_eq!(config.default, "2.1");
	assert!(config.fallback.is_none());
	assert_eq!(config.select(DEFAULT_LIST, "/a.luac").unwrap(), Version::V2_1);
}

#[test]
fn unknown_version_is_an_error() {
	let config = parse("[lists.version_default]\n\"a\" = \"3.0\"\n").expect("config should parse");
	let error = config.select(DEFAULT_LIST, "/a.luac").unwrap_err();

	assert!(matches!(error, ConfigError::UnknownVersion(ref name) if name == "3.0"), "{error}");
	assert!(matches!(config::parse_name("5.1"), Err(ConfigError::UnknownVersion(_))));
	assert_eq!(config::parse_name(" 2.0 ").unwrap(), Version::V2_0);
}

#[test]
fn unknown_key_is_a_parse_error() {
	let error = parse("verbose = true\n").unwrap_err();

	assert!(matches!(error, ConfigError::Parse { .. }), "{error}");
	assert!(error.to_string().contains("config.toml"), "{error}");
}

#[test]
fn fallback_fills_defaults() {
	let config = parse("[fallback]\nprogram = \"luajit-decompiler\"\n").expect("config should parse");
	let fallback = config.fallback.expect("fallback should be present");

	assert_eq!(fallback.program, PathBuf::from("luajit-decompiler"));
	assert_eq!(fallback.work, PathBuf::from("luajit"));
	assert_eq!(fallback.input, "test.lua");
	assert_eq!(fallback.output, "out.lua");
	assert_eq!(fallback.attempts, 2000);
	assert!(fallback.arguments.is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
	let error = Config::from_file(Path::new("/nonexistent/ljd.toml")).unwrap_err();

	assert!(matches!(error, ConfigError::Io { .. }), "{error}");
	assert!(error.to_string().contains("/nonexistent/ljd.toml"), "{error}");
}

#[cfg(unix)]
#[test]
fn fallback_result_is_taken_while_program_runs() {
	let root = std::env::temp_dir().join(format!("ljd-fallback-{}", std::process::id()));
	let input = root.join("input.luac");
	let output = root.join("input.lua");

	std::fs::create_dir_all(&root).expect("temporary directory should be created");
	std::fs::write(&input, b"print(1)\n").expect("input should be written");

	let mut fallback = Fallback::new(PathBuf::from("sh"));

	fallback.arguments = vec![
		String::from("-c"),
		String::from("cp test.lua partial && mv partial out.lua && sleep 30"),
	];
	fallback.work = root.join("work");
	fallback.attempts = 20_000;

	let started = Instant::now();
	let produced = fallback.run(&input, &output).expect("fallback should run");

	assert!(produced);
	assert!(started.elapsed() < Duration::from_secs(20));
	assert_eq!(std::fs::read(&output).expect("output should exist"), b"print(1)\n");

	std::fs::remove_dir_all(&root).expect("temporary directory should be removed");
}
