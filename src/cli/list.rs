use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::Opts;
use crate::description::Description;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

/// 图像描述摘要
#[derive(Debug, Serialize)]
pub struct DescriptionSummary<'a> {
    pub id: &'a str,
    pub keypoints: usize,
    pub histogram_bins: usize,
    pub frame: Option<(u32, u32)>,
}

impl<'a> From<&'a Description> for DescriptionSummary<'a> {
    fn from(description: &'a Description) -> Self {
        let set = description.descriptor_set();
        Self {
            id: description.id(),
            keypoints: set.len(),
            histogram_bins: set.histogram.len(),
            frame: description.source_image().map(|f| (f.width, f.height)),
        }
    }
}

impl SubCommandExtend for ListCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let report = opts.data_dir.load_all();
        for (path, err) in &report.skipped {
            eprintln!("[SKIP] {}: {}", path.display(), err);
        }

        let summaries: Vec<DescriptionSummary> = report.loaded.iter().map(Into::into).collect();
        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
            OutputFormat::Table => {
                for s in &summaries {
                    let frame = s.frame.map(|(w, h)| format!("{}x{}", w, h));
                    println!("{}\t{}\t{}", s.id, s.keypoints, frame.as_deref().unwrap_or("-"));
                }
            }
        }
        Ok(())
    }
}
