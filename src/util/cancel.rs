use std::sync::atomic::{AtomicBool, Ordering};

/// 构建过程中轮询的协作式取消信号。
pub trait Cancellation: Sync {
    fn is_cancelled(&self) -> bool;
}

/// 永不取消。
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl Cancellation for NeverCancel {
    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Cancellation for AtomicBool {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}
