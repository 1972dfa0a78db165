// Exit codes of the `bmperf` binary
pub const EXIT_SUCCESS: i32 = 0;
/// Invalid artifact tree, fatal configuration error or unwritable report.
pub const EXIT_FAILURE: i32 = 1;
