use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::storage::DataDir;

static DATA_DIR: LazyLock<String> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "lighthouse", "lighthouse").expect("failed to get project dir");
    proj_dirs.data_dir().join("Data").to_string_lossy().into_owned()
});

fn default_data_dir() -> &'static str {
    DATA_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct MatchingOptions {
    /// 比率测试阈值，最近距离需小于次近距离乘以该值
    #[arg(long, value_name = "RATIO", default_value_t = 0.7)]
    pub ratio: f32,
    /// 两个相似描述符的允许的最大距离，范围从 0 到 255
    #[arg(long, value_name = "N", default_value_t = 64, value_parser = clap::value_parser!(u32).range(0..=255))]
    pub distance: u32,
    /// 直方图相关性在总分中的权重，范围从 0 到 1
    #[arg(long, value_name = "WEIGHT", default_value_t = 0.3)]
    pub histogram_weight: f32,
    /// 最少特征点，低于该值的图像视为质量不足
    #[arg(short, long, default_value_t = 50)]
    pub min_keypoints: u32,
    /// 低于该分数的匹配结果会被丢弃
    #[arg(long, value_name = "SCORE", default_value_t = 0.0)]
    pub min_score: f32,
    /// 记录物体时同时保存原始图像
    #[arg(long)]
    pub keep_frame: bool,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            ratio: 0.7,
            distance: 64,
            histogram_weight: 0.3,
            min_keypoints: 50,
            min_score: 0.0,
            keep_frame: false,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "lighthouse", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 图像描述数据目录
    #[arg(short, long, default_value = default_data_dir())]
    pub data_dir: DataDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 列出数据目录中的所有图像描述
    List(ListCommand),
    /// 显示单个图像描述的信息
    Show(ShowCommand),
    /// 使用已保存的图像描述在目录中搜索
    Match(MatchCommand),
}
