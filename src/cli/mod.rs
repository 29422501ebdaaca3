mod list;
mod r#match;
mod show;

pub use list::*;
pub use r#match::*;
pub use show::*;

use clap::ValueEnum;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
