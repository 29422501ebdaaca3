use anyhow::Result;
use clap::Parser;

use crate::cli::{DescriptionSummary, SubCommandExtend};
use crate::config::Opts;
use crate::error::Error;
use crate::storage;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 图像描述 ID
    pub id: String,
}

impl SubCommandExtend for ShowCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let folder = opts.data_dir.description_dir(&self.id);
        if !folder.is_dir() {
            return Err(Error::NotFound(self.id.clone()).into());
        }
        let description = storage::load(folder)?;
        let summary = DescriptionSummary::from(&description);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
