use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use super::pipeline::Pipeline;
use crate::metrics;
use crate::task::{Task, TaskCell};

/// 事件循环，运行在专用的工作线程上，直到 `TaskCell::shutdown`
pub(crate) fn run(cell: Arc<TaskCell>, mut pipeline: Pipeline) {
    // 最近一次收到的戳记
    let mut stamp = 0;
    while let Some((next, task)) = cell.wait_next(stamp) {
        stamp = next;
        debug!("event loop woke up: stamp {}, task {}", stamp, task.as_str());

        let token = cell.token_at(task, stamp);
        let start = Instant::now();
        let result = match task {
            Task::Wait => continue,
            Task::Record => pipeline.record(&token),
            Task::Identify => pipeline.identify(&token),
        };
        let elapsed = start.elapsed().as_secs_f32();

        match &result {
            Ok(outcome) => {
                info!("{} finished: {:?} ({:.2}s)", task.as_str(), outcome, elapsed);
                metrics::inc_task(task.as_str(), outcome.as_str(), elapsed);
            }
            Err(e) => {
                warn!("{} failed: {}", task.as_str(), e);
                metrics::inc_task(task.as_str(), "error", elapsed);
                pipeline.feedback.operation_failed(task, e);
            }
        }
        pipeline.feedback.operation_complete();
    }
    info!("event loop stopped");
}
