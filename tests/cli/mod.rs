use assert_cmd::prelude::*; // Add methods on commands
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{Builder, TempDir};

use crate::on_disk_config;
use crate::testutils::*;

mod basic;

const TEST_CONFIG_FILE: &str = "wasmfn-test.toml";

fn setup_temp_config_and_data_dir() -> std::io::Result<TempDir> {
    let temp_dir = Builder::new()
        .prefix("wasmfn-test-dir")
        .rand_bytes(5)
        .tempdir()?;

    fs::write(
        temp_dir.path().join(TEST_CONFIG_FILE),
        on_disk_config(temp_dir.path(), false),
    )?;
    fs::write(temp_dir.path().join("times_two.wat"), DOUBLE_I64)?;
    fs::write(temp_dir.path().join("add.wat"), ADD_F64)?;
    fs::write(temp_dir.path().join("broken.wat"), NO_ENTRYPOINT)?;
    Ok(temp_dir)
}

fn module_path(temp_dir: &TempDir, file: &str) -> PathBuf {
    temp_dir.path().join(file)
}

fn wasmfn(config_dir: &Path, args: &[&str]) -> Output {
    Command::cargo_bin("wasmfn")
        .expect("wasmfn bin exists")
        .arg("-c")
        .arg(config_dir.join(TEST_CONFIG_FILE))
        .args(args)
        .output()
        .expect("wasmfn runs")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .lines()
        .map(String::from)
        .collect()
}
