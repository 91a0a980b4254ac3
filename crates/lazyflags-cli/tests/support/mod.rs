use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

pub fn new_command_with_temp_home() -> (Command, tempfile::TempDir) {
    let temp_home = tempfile::tempdir().expect("temp home");
    let command = command_with_home(temp_home.path());
    (command, temp_home)
}

pub fn command_with_home(home: &Path) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("lazyflags");
    let mut command = Command::new(binary);
    command.env("HOME", home);
    command.env("XDG_CONFIG_HOME", home.join(".config"));
    command.env("XDG_CACHE_HOME", home.join(".cache"));
    command.env_remove("RUST_LOG");
    command
}

pub fn demo_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("demo.toml")
}

pub fn write_settings(home: &Path, contents: &str) {
    let settings_dir = home.join(".config").join("lazyflags");
    fs::create_dir_all(&settings_dir).expect("create settings dir");
    fs::write(settings_dir.join("config.toml"), contents).expect("write settings");
}

pub fn cache_file(home: &Path) -> PathBuf {
    home.join(".cache").join("LazyFlags").join(".cache")
}

pub fn write_cache(home: &Path, contents: &str) {
    let path = cache_file(home);
    fs::create_dir_all(path.parent().expect("cache parent")).expect("create cache dir");
    fs::write(path, contents).expect("write cache");
}

pub fn assert_timestamp_log_names(entries: &[std::fs::DirEntry]) {
    assert!(!entries.is_empty(), "expected at least one diagnostics log");

    for entry in entries {
        let name = entry
            .file_name()
            .into_string()
            .expect("diagnostics filename utf8");
        let stem = name
            .strip_suffix(".log")
            .expect("diagnostics filename .log suffix");
        assert!(
            !stem.is_empty() && stem.chars().all(|character| character.is_ascii_digit()),
            "diagnostics filename must be <timestamp>.log, got: {name}"
        );
    }
}
