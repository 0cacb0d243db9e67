//! CLI driver (§6): orchestrates one compilation and reports the result the
//! way a user expects from a command-line compiler — a single-line
//! diagnostic and a non-zero exit code, never a panic.

pub mod cli;
pub mod preprocess;
pub mod session;
