use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};

use crate::camera::{Camera, Capture};
use crate::description::Description;
use crate::error::Result;
use crate::feedback::Feedback;
use crate::matcher::ImageMatcher;
use crate::metrics;
use crate::storage::{self, Asset, DataDir};
use crate::task::TaskToken;

/// 一次流程的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 采集期间收到了新的请求，没有修改任何状态
    Canceled,
    /// 新物体已保存并加入目录
    Recorded(String),
    Identified { id: String, score: f32 },
    NoMatch,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::Recorded(_) => "recorded",
            Self::Identified { .. } => "identified",
            Self::NoMatch => "no_match",
        }
    }
}

/// 采集 -> 提取 -> 匹配或保存，只在工作线程上运行
pub(crate) struct Pipeline {
    pub camera: Box<dyn Camera>,
    pub matcher: Arc<RwLock<ImageMatcher>>,
    pub data_dir: DataDir,
    pub feedback: Arc<dyn Feedback>,
    pub keep_frame: bool,
}

impl Pipeline {
    fn read(&self) -> RwLockReadGuard<'_, ImageMatcher> {
        self.matcher.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ImageMatcher> {
        self.matcher.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&mut self, token: &TaskToken<'_>) -> Result<Outcome> {
        let frame = match self.camera.capture_for_record(token)? {
            Capture::Frame(frame) => frame,
            Capture::Canceled => return Ok(Outcome::Canceled),
        };
        // 摄像头最后一次轮询之后仍可能收到新请求
        if token.is_canceled() {
            return Ok(Outcome::Canceled);
        }

        let mut description = self.read().describe(&frame)?;
        if self.keep_frame {
            description = description.with_source_image(frame);
        }

        let id = description.id().to_owned();
        let folder = self.data_dir.description_dir(&id);
        if let Err(e) = self.persist(&description, &folder) {
            // 目录里可能只有语音标签或临时文件，删掉以免下次启动时报错
            if folder.exists() {
                if let Err(e) = fs::remove_dir_all(&folder) {
                    warn!("清理 {} 失败: {}", folder.display(), e);
                }
            }
            return Err(e);
        }

        let size = {
            let mut matcher = self.write();
            matcher.insert(description);
            matcher.catalog().len()
        };
        metrics::set_catalog_size(size);
        info!("已记录新物体: {}", id);

        self.feedback.play_sound("registered");
        self.feedback.play_voice_label(&id);
        Ok(Outcome::Recorded(id))
    }

    /// 提示用户录制语音标签，然后写入描述
    fn persist(&self, description: &Description, folder: &Path) -> Result<()> {
        fs::create_dir_all(folder)?;

        self.feedback.play_sound("after-the-tone");
        self.feedback.play_sound("beep");
        self.feedback.record_voice_label(&folder.join(Asset::VoiceLabel.file_name()))?;
        self.feedback.play_sound("beep");

        storage::save(description, folder)
    }

    pub fn identify(&mut self, token: &TaskToken<'_>) -> Result<Outcome> {
        let frame = match self.camera.capture_for_identification(token)? {
            Capture::Frame(frame) => frame,
            Capture::Canceled => return Ok(Outcome::Canceled),
        };
        if token.is_canceled() {
            return Ok(Outcome::Canceled);
        }

        let matches = {
            let matcher = self.read();
            let description = matcher.describe(&frame)?;
            matcher.find_matches(&description)
        };

        let Some((score, best)) = matches.into_iter().next() else {
            self.feedback.play_sound("no-item");
            self.feedback.show_label("no match");
            return Ok(Outcome::NoMatch);
        };

        metrics::observe_match_score(score);
        self.feedback.play_voice_label(best.id());
        self.feedback.show_label(&format!("{} ({:.2})", best.id(), score));
        Ok(Outcome::Identified { id: best.id().to_owned(), score })
    }
}
