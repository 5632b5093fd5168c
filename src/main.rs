use clap::Parser;

use pcp::error::NiceError;
use pcp::{main_exec, main_judge, main_serve, Command, Opt};

fn main() {
    let opt = Opt::parse();
    opt.logger.enable_log();

    match opt.command {
        Command::Exec(opt) => main_exec(opt),
        Command::Judge(opt) => main_judge(opt),
        Command::Serve(opt) => main_serve(opt),
    }
    .nice_unwrap()
}
