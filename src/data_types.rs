pub type FunctionId = i64;
