use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pcp_lang::Language;

#[derive(Parser, Debug)]
#[clap(name = "pcp", version, about)]
pub struct Opt {
    #[clap(flatten)]
    pub logger: LoggerOpt,

    /// What to do
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and run a single source file, printing the result as JSON
    Exec(ExecOpt),
    /// Judge a source file against a question of a contest
    Judge(JudgeOpt),
    /// Start the contest and accept submissions over HTTP
    Serve(ServeOpt),
}

#[derive(Parser, Debug, Clone)]
pub struct LoggerOpt {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug, Clone)]
pub struct ExecOpt {
    /// The source file to run. Its name without the extension is the entry point.
    pub file: PathBuf,

    /// The language of the source, detected from the extension when missing
    #[clap(long, short)]
    pub language: Option<Language>,

    /// File to feed to the standard input of the program
    #[clap(long, short)]
    pub input: Option<PathBuf>,

    /// Wall-clock limit of the execution, in seconds
    #[clap(long = "time-limit", default_value = "60")]
    pub time_limit: u64,

    /// Arguments passed to the program
    #[clap(last = true)]
    pub args: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct JudgeOpt {
    /// The configuration file of the contest
    #[clap(long, short, default_value = "contest.json")]
    pub config: PathBuf,

    /// The number of the question, starting from 1
    pub question: usize,

    /// The source file of the solution
    pub file: PathBuf,

    /// The language of the source, detected from the extension when missing
    #[clap(long, short)]
    pub language: Option<Language>,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOpt {
    /// The configuration file of the contest
    #[clap(long, short, default_value = "contest.json")]
    pub config: PathBuf,

    /// Address to bind the server on
    #[clap(default_value = "127.0.0.1:8080")]
    pub address: String,
}

impl LoggerOpt {
    /// The log level forced by the `-v` flags, `None` leaves `RUST_LOG` alone.
    fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }

    pub fn enable_log(&self) {
        if let Some(level) = self.log_level() {
            std::env::set_var("RUST_BACKTRACE", "1");
            std::env::set_var("RUST_LOG", level);
        }

        env_logger::Builder::from_default_env()
            .format_timestamp_nanos()
            .init();
        better_panic::install();
    }
}
