mod event_loop;
mod pipeline;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::thread::{self, JoinHandle};

use log::{info, warn};

pub use pipeline::Outcome;
use pipeline::Pipeline;

use crate::camera::Camera;
use crate::catalog::Match;
use crate::config::MatchingOptions;
use crate::description::{Description, Frame};
use crate::error::{Error, Result};
use crate::feedback::Feedback;
use crate::matcher::{Extractor, ImageMatcher};
use crate::metrics;
use crate::storage::DataDir;
use crate::task::{Task, TaskCell};

/// 任务调度器
///
/// 所有摄像头与匹配操作都在同一个工作线程上串行执行，
/// 新的请求会取消正在进行的采集。
pub struct Lighthouse {
    cell: Arc<TaskCell>,
    matcher: Arc<RwLock<ImageMatcher>>,
    data_dir: DataDir,
    feedback: Arc<dyn Feedback>,
    worker: Option<JoinHandle<()>>,
}

impl Lighthouse {
    /// 加载数据目录中的所有图像描述，然后启动工作线程
    ///
    /// # Arguments
    ///
    /// * `opts` - 匹配参数
    /// * `data_dir` - 数据目录，不存在时会被创建
    /// * `camera` - 摄像头，只在工作线程上使用
    /// * `extractor` - 特征提取器
    /// * `feedback` - 声音与界面反馈
    pub fn start(
        opts: &MatchingOptions,
        data_dir: DataDir,
        camera: impl Camera + 'static,
        extractor: Arc<dyn Extractor>,
        feedback: Arc<dyn Feedback>,
    ) -> Result<Self> {
        data_dir.create()?;
        info!("数据目录: {}", data_dir.path().display());

        let mut matcher = ImageMatcher::new(opts, extractor);
        for description in data_dir.load_all().loaded {
            matcher.insert(description);
        }
        metrics::set_catalog_size(matcher.catalog().len());

        let matcher = Arc::new(RwLock::new(matcher));
        let cell = Arc::new(TaskCell::new());
        let pipeline = Pipeline {
            camera: Box::new(camera),
            matcher: matcher.clone(),
            data_dir: data_dir.clone(),
            feedback: feedback.clone(),
            keep_frame: opts.keep_frame,
        };

        let worker = thread::Builder::new().name("lighthouse-video".to_owned()).spawn({
            let cell = cell.clone();
            move || event_loop::run(cell, pipeline)
        })?;

        Ok(Self { cell, matcher, data_dir, feedback, worker: Some(worker) })
    }

    /// 开始记录新物体
    pub fn request_record(&self) {
        self.cell.send(Task::Record);
    }

    /// 开始识别已记录的物体
    pub fn request_identify(&self) {
        self.cell.send(Task::Identify);
    }

    /// 停止记录或识别
    pub fn request_stop(&self) {
        self.cell.send(Task::Wait);
    }

    pub fn current_task(&self) -> Task {
        self.cell.current()
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    fn matcher(&self) -> RwLockReadGuard<'_, ImageMatcher> {
        self.matcher.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.matcher().catalog().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn describe(&self, frame: &Frame) -> Result<Description> {
        self.matcher().describe(frame)
    }

    pub fn description(&self, id: &str) -> Result<Arc<Description>> {
        self.matcher().get(id)
    }

    pub fn find_matches(&self, description: &Description) -> Vec<Match> {
        self.matcher().find_matches(description)
    }

    pub fn find_matches_frame(&self, frame: &Frame) -> Result<Vec<Match>> {
        self.matcher().find_matches_frame(frame)
    }

    /// 播放已记录物体的语音标签
    pub fn play_voice_label(&self, id: &str) -> Result<()> {
        let description = self.description(id)?;
        self.feedback.play_voice_label(description.id());
        Ok(())
    }

    /// 取消正在进行的任务并等待工作线程退出
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_worker()
    }

    fn stop_worker(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.cell.shutdown();
        worker.join().map_err(|_| Error::WorkerPanicked)
    }
}

impl Drop for Lighthouse {
    fn drop(&mut self) {
        if let Err(e) = self.stop_worker() {
            warn!("停止工作线程失败: {}", e);
        }
    }
}
