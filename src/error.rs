use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// 图像中可提取的特征不足，仅中止当前流程
    #[error("图像质量不足: {0}")]
    Quality(String),

    /// 磁盘上的记录无法解析，启动加载时跳过该条目
    #[error("记录已损坏 {}: {reason}", path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("未找到图像描述: {0}")]
    NotFound(String),

    #[error("摄像头采集失败: {0}")]
    Capture(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("工作线程异常退出")]
    WorkerPanicked,
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptRecord { path: path.into(), reason: reason.to_string() }
    }
}
