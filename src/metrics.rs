//! 运行指标，注册在 prometheus 的默认注册表中
//!
//! 嵌入方可以直接调用 `prometheus::gather()`，或者用 [`encode`] 得到文本格式

use std::io;
use std::sync::LazyLock;

use prometheus::*;

static METRIC_TASK_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "lighthouse_task_count",
        "count of finished record/identify runs",
        &["task", "outcome"]
    )
    .unwrap()
});

static METRIC_TASK_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "lighthouse_task_duration",
        "duration of the per-run capture pipeline in seconds",
        &["task"]
    )
    .unwrap()
});

static METRIC_MATCH_SCORE: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "lighthouse_match_score",
        "score of the best match of each identification",
        (1..=20).map(|x| x as f64 * 0.05).collect()
    )
    .unwrap()
});

static METRIC_CATALOG_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("lighthouse_catalog_size", "number of image descriptions in memory")
        .unwrap()
});

/// 记录一次流程的结果与耗时
pub(crate) fn inc_task(task: &str, outcome: &str, duration: f32) {
    METRIC_TASK_COUNT.with_label_values(&[task, outcome]).inc();
    METRIC_TASK_DURATION.with_label_values(&[task]).observe(duration as f64);
}

pub(crate) fn observe_match_score(score: f32) {
    METRIC_MATCH_SCORE.observe(score as f64);
}

pub(crate) fn set_catalog_size(size: usize) {
    METRIC_CATALOG_SIZE.set(size as i64);
}

/// 以 prometheus 文本格式导出所有已注册的指标
pub fn encode() -> crate::Result<String> {
    TextEncoder::new().encode_to_string(&gather()).map_err(|e| io::Error::other(e).into())
}
