use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// 无事可做
    Wait = 0,
    /// 记录新物体
    Record = 1,
    /// 识别已记录的物体
    Identify = 2,
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Record => "record",
            Self::Identify => "identify",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Record,
            2 => Self::Identify,
            _ => Self::Wait,
        }
    }
}

#[derive(Debug, Default)]
struct CellState {
    /// 每次发送任务时加一
    stamp: u64,
    shutdown: bool,
}

/// 任务单元：最新请求的任务与其戳记
///
/// 只保留最新的意图，工作线程忙碌期间的中间请求会被覆盖
#[derive(Debug)]
pub struct TaskCell {
    task: AtomicU8,
    state: Mutex<CellState>,
    cond: Condvar,
}

impl Default for TaskCell {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCell {
    pub fn new() -> Self {
        Self {
            task: AtomicU8::new(Task::Wait as u8),
            state: Mutex::new(CellState::default()),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前任务，不需要加锁
    pub fn current(&self) -> Task {
        Task::from_u8(self.task.load(Ordering::Acquire))
    }

    pub fn stamp(&self) -> u64 {
        self.lock().stamp
    }

    /// 发送新任务并唤醒所有等待者，返回新的戳记
    pub fn send(&self, task: Task) -> u64 {
        let mut state = self.lock();
        if state.shutdown {
            return state.stamp;
        }
        self.task.store(task as u8, Ordering::Release);
        state.stamp += 1;
        debug!("send {} to loop, stamp {}", task.as_str(), state.stamp);
        self.cond.notify_all();
        state.stamp
    }

    /// 取消当前任务并通知事件循环退出
    pub fn shutdown(&self) {
        let mut state = self.lock();
        self.task.store(Task::Wait as u8, Ordering::Release);
        state.stamp += 1;
        state.shutdown = true;
        self.cond.notify_all();
    }

    /// 阻塞直到戳记不再等于 `last`，返回新的 (戳记, 任务)
    ///
    /// 已关闭时返回 None
    pub fn wait_next(&self, last: u64) -> Option<(u64, Task)> {
        let mut state = self.lock();
        while state.stamp == last && !state.shutdown {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.shutdown {
            return None;
        }
        Some((state.stamp, self.current()))
    }

    /// 绑定到当前 (任务, 戳记) 的令牌
    pub fn token(&self) -> TaskToken<'_> {
        let state = self.lock();
        TaskToken { cell: self, task: self.current(), stamp: state.stamp }
    }

    /// 绑定到指定快照的令牌，快照过期时令牌立即处于取消状态
    pub fn token_at(&self, task: Task, stamp: u64) -> TaskToken<'_> {
        TaskToken { cell: self, task, stamp }
    }
}

/// 取消检查点
///
/// 摄像头在阻塞采集期间轮询 `is_canceled`，一旦有新的请求到达就应尽快返回
#[derive(Debug, Clone, Copy)]
pub struct TaskToken<'a> {
    cell: &'a TaskCell,
    task: Task,
    stamp: u64,
}

impl TaskToken<'_> {
    pub fn task(&self) -> Task {
        self.task
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn is_canceled(&self) -> bool {
        if self.cell.current() != self.task {
            return true;
        }
        let state = self.cell.lock();
        state.stamp != self.stamp || state.shutdown
    }

    /// 最多等待 `timeout`，期间有新请求时立即返回，返回值表示是否已被取消
    ///
    /// 摄像头的轮询间隔决定了取消的响应速度
    pub fn sleep(&self, timeout: Duration) -> bool {
        let state = self.cell.lock();
        let stale = |s: &CellState| s.stamp != self.stamp || s.shutdown;
        if stale(&*state) {
            return true;
        }
        let (state, _) = self
            .cell
            .cond
            .wait_timeout_while(state, timeout, |s| !stale(&*s))
            .unwrap_or_else(PoisonError::into_inner);
        stale(&*state)
    }
}
