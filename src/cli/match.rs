use anyhow::Result;
use clap::Parser;
use log::debug;

use crate::catalog::Catalog;
use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::{MatchingOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct MatchCommand {
    #[command(flatten)]
    pub matching: MatchingOptions,
    /// 作为查询的图像描述 ID
    pub id: String,
    /// 显示的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    pub count: usize,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for MatchCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let mut catalog = Catalog::new(&self.matching);
        for description in opts.data_dir.load_all().loaded {
            catalog.insert(description);
        }
        debug!("catalog size: {}", catalog.len());

        let query = catalog.get(&self.id)?;
        let mut result = catalog
            .find_matches(&query)
            .into_iter()
            .map(|(score, description)| (score, description.id().to_owned()))
            .collect::<Vec<_>>();
        result.truncate(self.count);

        print_result(&result, self.output_format)
    }
}

fn print_result(result: &[(f32, String)], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for (k, v) in result {
                println!("{:.2}\t{}", k, v);
            }
        }
    }
    Ok(())
}
