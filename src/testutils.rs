// Test modules in the WebAssembly text format

// udf_main(x: i64) -> i64 = x * 2
pub const DOUBLE_I64: &str = r#"
(module
  (func (export "udf_main") (param i64) (result i64)
    local.get 0
    i64.const 2
    i64.mul))
"#;

// udf_main(a: f64, b: f64) -> f64 = a + b
pub const ADD_F64: &str = r#"
(module
  (func (export "udf_main") (param f64 f64) (result f64)
    local.get 0
    local.get 1
    f64.add))
"#;

// udf_main() -> f64 = pi
pub const PI_F64: &str = r#"
(module
  (func (export "udf_main") (result f64)
    f64.const 3.141592653589793))
"#;

// udf_main(x: i64, y: f64) -> i64 = x + trunc(y)
pub const MIXED_ARGS: &str = r#"
(module
  (func (export "udf_main") (param i64 f64) (result i64)
    local.get 0
    local.get 1
    i64.trunc_f64_s
    i64.add))
"#;

// Traps on every call
pub const ALWAYS_TRAPS: &str = r#"
(module
  (func (export "udf_main") (param i64) (result i64)
    unreachable))
"#;

// Never terminates
pub const INFINITE_LOOP: &str = r#"
(module
  (func (export "udf_main") (param i64) (result i64)
    (loop $forever
      br $forever)
    i64.const 0))
"#;

// Counts its calls in a global; returns the counter after incrementing it
pub const STATEFUL_COUNTER: &str = r#"
(module
  (global $calls (mut i64) (i64.const 0))
  (func (export "udf_main") (result i64)
    global.get $calls
    i64.const 1
    i64.add
    global.set $calls
    global.get $calls))
"#;

pub const NO_ENTRYPOINT: &str = r#"
(module
  (func (export "something_else") (param i64) (result i64)
    local.get 0))
"#;

pub const VOID_RETURN: &str = r#"
(module
  (func (export "udf_main") (param i64)))
"#;

pub const MULTI_RETURN: &str = r#"
(module
  (func (export "udf_main") (param i64) (result i64 i64)
    local.get 0
    local.get 0))
"#;

pub const I32_RETURN: &str = r#"
(module
  (func (export "udf_main") (param i64) (result i32)
    i32.const 1))
"#;

pub const F32_PARAM: &str = r#"
(module
  (func (export "udf_main") (param i64 f32) (result i64)
    local.get 0))
"#;

// The entry point name is exported, but as a memory rather than a function
pub const ENTRYPOINT_NOT_A_FUNCTION: &str = r#"
(module
  (memory (export "udf_main") 1))
"#;
