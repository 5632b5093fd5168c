//! # pcp
//!
//! Command line front-end of the judge: run a single source file, judge it against a question of
//! a contest, or serve the contest over HTTP.
//!
//! The judging itself lives in the `pcp-lang`, `pcp-exec` and `pcp-contest` crates, this crate
//! only glues them to the command line and to the network.

#[macro_use]
extern crate log;

pub mod error;
pub mod local;
pub mod opt;
pub mod server;

pub use local::*;
pub use opt::*;
pub use server::main_serve;
