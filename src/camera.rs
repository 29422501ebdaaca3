use crate::description::Frame;
use crate::error::Result;
use crate::task::TaskToken;

/// 采集结果
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Frame(Frame),
    /// 采集期间收到了新的请求
    Canceled,
}

/// 摄像头
///
/// 采集会一直阻塞到拍到合适的画面为止，实现方必须在阻塞期间轮询 `token`，
/// 一旦 `token.is_canceled()` 就返回 `Capture::Canceled`。
/// 轮询间隔越短，取消越及时，`TaskToken::sleep` 可以在等待的同时被新请求唤醒。
pub trait Camera: Send {
    fn capture_for_record(&mut self, token: &TaskToken<'_>) -> Result<Capture>;

    fn capture_for_identification(&mut self, token: &TaskToken<'_>) -> Result<Capture>;
}
