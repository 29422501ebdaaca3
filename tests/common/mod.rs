#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use lighthouse::*;
use rand::prelude::*;

pub const TIMEOUT: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(5);

/// 按脚本提供图像的摄像头，没有图像时一直轮询令牌
pub struct ScriptedCamera {
    frames: Receiver<Frame>,
    started: Sender<Task>,
}

impl ScriptedCamera {
    fn capture(&mut self, token: &TaskToken<'_>) -> Result<Capture> {
        let _ = self.started.send(token.task());
        loop {
            if token.is_canceled() {
                return Ok(Capture::Canceled);
            }
            match self.frames.recv_timeout(POLL) {
                Ok(frame) => return Ok(Capture::Frame(frame)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Capture("camera closed".to_owned()));
                }
            }
        }
    }
}

impl Camera for ScriptedCamera {
    fn capture_for_record(&mut self, token: &TaskToken<'_>) -> Result<Capture> {
        self.capture(token)
    }

    fn capture_for_identification(&mut self, token: &TaskToken<'_>) -> Result<Capture> {
        self.capture(token)
    }
}

/// 每 32 字节作为一个描述符，直方图为字节高 3 位的分布
pub fn extract(frame: &Frame) -> Result<DescriptorSet> {
    let descriptors: Vec<[u8; 32]> =
        frame.data.chunks_exact(32).map(|c| c.try_into().expect("chunk of 32")).collect();
    let keypoints = (0..descriptors.len())
        .map(|i| KeyPoint {
            x: i as f32,
            y: 0.,
            size: 31.,
            angle: 0.,
            response: 1.,
            octave: 0,
        })
        .collect();
    let mut histogram = vec![0f32; 8];
    for &b in &frame.data {
        histogram[(b >> 5) as usize] += 1.;
    }
    Ok(DescriptorSet { keypoints, descriptors, histogram })
}

/// 生成可复现的随机图像，每 32 字节对应一个描述符
pub fn random_frame(seed: u64, descriptors: usize) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; descriptors * 32];
    rng.fill_bytes(&mut data);
    Frame::new(descriptors as u32 * 32, 1, 1, data)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Sound(String),
    VoiceLabel(String),
    Label(String),
    Failed(Task, &'static str),
    Complete,
}

pub fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Quality(_) => "quality",
        Error::CorruptRecord { .. } => "corrupt",
        Error::NotFound(_) => "not_found",
        Error::Capture(_) => "capture",
        Error::Io(_) => "io",
        Error::WorkerPanicked => "panicked",
    }
}

pub struct RecordingFeedback {
    events: Mutex<Vec<Event>>,
    complete: Sender<()>,
    pub fail_voice_label: AtomicBool,
}

impl RecordingFeedback {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl Feedback for RecordingFeedback {
    fn play_sound(&self, name: &str) {
        self.push(Event::Sound(name.to_owned()));
    }

    fn play_voice_label(&self, id: &str) {
        self.push(Event::VoiceLabel(id.to_owned()));
    }

    fn show_label(&self, info: &str) {
        self.push(Event::Label(info.to_owned()));
    }

    fn operation_complete(&self) {
        self.push(Event::Complete);
        let _ = self.complete.send(());
    }

    fn record_voice_label(&self, path: &Path) -> io::Result<()> {
        if self.fail_voice_label.load(Ordering::SeqCst) {
            return Err(io::Error::other("microphone unavailable"));
        }
        fs::write(path, b"voice")
    }

    fn operation_failed(&self, task: Task, error: &Error) {
        self.push(Event::Failed(task, error_kind(error)));
    }
}

pub struct Harness {
    pub lighthouse: Lighthouse,
    pub frames: Sender<Frame>,
    pub started: Receiver<Task>,
    pub completions: Receiver<()>,
    pub feedback: Arc<RecordingFeedback>,
}

impl Harness {
    pub fn start(dir: &Path, opts: &MatchingOptions) -> Self {
        let (frames_tx, frames_rx) = unbounded();
        let (started_tx, started_rx) = unbounded();
        let camera = ScriptedCamera { frames: frames_rx, started: started_tx };
        Self::launch(dir, opts, camera, frames_tx, started_rx)
    }

    /// 使用自定义摄像头，`frames` 与 `started` 不再起作用
    pub fn with_camera(dir: &Path, opts: &MatchingOptions, camera: impl Camera + 'static) -> Self {
        let (frames_tx, _) = unbounded();
        let (_, started_rx) = unbounded();
        Self::launch(dir, opts, camera, frames_tx, started_rx)
    }

    fn launch(
        dir: &Path,
        opts: &MatchingOptions,
        camera: impl Camera + 'static,
        frames: Sender<Frame>,
        started: Receiver<Task>,
    ) -> Self {
        let (complete_tx, complete_rx) = unbounded();
        let feedback = Arc::new(RecordingFeedback {
            events: Mutex::new(vec![]),
            complete: complete_tx,
            fail_voice_label: AtomicBool::new(false),
        });
        let lighthouse =
            Lighthouse::start(opts, DataDir::new(dir), camera, Arc::new(extract), feedback.clone())
                .expect("failed to start lighthouse");
        Self { lighthouse, frames, started, completions: complete_rx, feedback }
    }

    /// 等待摄像头开始采集，返回采集的任务类型
    pub fn wait_started(&self) -> Task {
        self.started.recv_timeout(TIMEOUT).expect("camera was not started")
    }

    pub fn wait_complete(&self) {
        self.completions.recv_timeout(TIMEOUT).expect("operation did not complete");
    }

    pub fn record(&self, frame: Frame) -> String {
        self.lighthouse.request_record();
        assert_eq!(self.wait_started(), Task::Record);
        self.frames.send(frame).unwrap();
        self.wait_complete();
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                Event::VoiceLabel(id) => Some(id),
                _ => None,
            })
            .expect("no voice label played after record")
    }

    pub fn events(&self) -> Vec<Event> {
        self.feedback.events()
    }
}

pub fn test_options() -> MatchingOptions {
    MatchingOptions { min_keypoints: 4, ..Default::default() }
}
