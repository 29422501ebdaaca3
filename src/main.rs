use clap::Parser;
use lighthouse::cli::SubCommandExtend;
use lighthouse::config::{Opts, SubCommand};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::List(config) => config.run(&opts),
        SubCommand::Show(config) => config.run(&opts),
        SubCommand::Match(config) => config.run(&opts),
    }
}
