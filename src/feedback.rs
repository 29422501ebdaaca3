use std::io;
use std::path::Path;

use crate::error::Error;
use crate::task::Task;

/// 声音与界面反馈，全部为单向通知
pub trait Feedback: Send + Sync {
    /// 播放资源目录中的提示音
    fn play_sound(&self, name: &str);

    /// 播放图像描述的语音标签
    fn play_voice_label(&self, id: &str);

    fn show_label(&self, info: &str);

    /// 记录或识别流程结束，无论成功与否
    fn operation_complete(&self);

    /// 录制语音标签到 `path`
    fn record_voice_label(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    /// 流程失败时调用，默认将错误显示为标签
    fn operation_failed(&self, task: Task, error: &Error) {
        self.show_label(&format!("{} 失败: {}", task.as_str(), error));
    }
}
