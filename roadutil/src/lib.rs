//! Plumbing shared by the conversion crates and the CLI: logging, timing, running independent
//! jobs in parallel, and reading/writing files.

#[macro_use]
extern crate log;

mod io;
pub mod logger;
mod time;
mod utils;

pub use crate::io::{basename, from_json, read_json, slurp_file, to_json, write_json, write_string};
pub use crate::time::{elapsed_seconds, prettyprint_time, Parallelism, Timer};
pub use crate::utils::prettyprint_usize;

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;
