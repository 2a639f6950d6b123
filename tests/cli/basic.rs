use crate::cli::*;

#[test]
fn test_cli_register_query_drop() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_and_data_dir()?;
    let times_two = module_path(&temp_dir, "times_two.wat");
    let add = module_path(&temp_dir, "add.wat");

    let output = wasmfn(
        temp_dir.path(),
        &["register", "times_two", times_two.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Registered default.times_two (i64) -> i64 (id 1)"]
    );

    let output = wasmfn(
        temp_dir.path(),
        &["register", "add", add.to_str().unwrap(), "-n", "math"],
    );
    assert!(output.status.success());

    // Each invocation is a separate process: everything has to come back from disk
    let output = wasmfn(temp_dir.path(), &["query", "SELECT times_two(21) AS x"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["+----+", "| x  |", "+----+", "| 42 |", "+----+"]
    );

    let output = wasmfn(temp_dir.path(), &["list", "-n", "math"]);
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("math.add\t(f64, f64) -> f64\t"));

    let output = wasmfn(temp_dir.path(), &["list", "--json"]);
    let listed = stdout_lines(&output)
        .iter()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "times_two");
    assert_eq!(listed[1]["namespace"], "math");
    assert_eq!(listed[1]["signature"], "(f64, f64) -> f64");

    let output = wasmfn(temp_dir.path(), &["drop", "times_two"]);
    assert!(output.status.success());

    let output = wasmfn(temp_dir.path(), &["query", "SELECT times_two(21)"]);
    assert!(!output.status.success());

    Ok(())
}

#[test]
fn test_cli_errors() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_and_data_dir()?;
    let broken = module_path(&temp_dir, "broken.wat");
    let times_two = module_path(&temp_dir, "times_two.wat");

    let output = wasmfn(
        temp_dir.path(),
        &["register", "broken", broken.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("UDF entry function \"udf_main\" not found"));

    let args = ["register", "times_two", times_two.to_str().unwrap()];
    assert!(wasmfn(temp_dir.path(), &args).status.success());

    let output = wasmfn(temp_dir.path(), &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("Function \"times_two\" already exists"));

    let mut replace = args.to_vec();
    replace.push("--or-replace");
    assert!(wasmfn(temp_dir.path(), &replace).status.success());

    let output = wasmfn(temp_dir.path(), &["drop", "missing"]);
    assert!(!output.status.success());
    assert!(wasmfn(temp_dir.path(), &["drop", "missing", "--if-exists"])
        .status
        .success());

    Ok(())
}
