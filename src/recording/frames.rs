//! Per-frame loop registry.
//!
//! The UI runs one frame per display refresh. Work that should happen every
//! frame registers a loop and receives a handle; the loop runs until that
//! handle is cancelled.

/// Identifies one registered frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopHandle(u64);

/// Tracks which frame loops are still live.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    active: Vec<LoopHandle>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new loop and returns its cancellation handle.
    pub fn register(&mut self) -> LoopHandle {
        self.next_id += 1;
        let handle = LoopHandle(self.next_id);
        self.active.push(handle);
        handle
    }

    /// Cancels a loop. Returns false if it was not active.
    pub fn cancel(&mut self, handle: LoopHandle) -> bool {
        let before = self.active.len();
        self.active.retain(|h| *h != handle);
        before != self.active.len()
    }

    pub fn is_active(&self, handle: LoopHandle) -> bool {
        self.active.contains(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mut frames = FrameScheduler::new();
        let a = frames.register();
        let b = frames.register();
        assert_ne!(a, b);
        assert_eq!(frames.active_count(), 2);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut frames = FrameScheduler::new();
        let a = frames.register();
        let b = frames.register();

        assert!(frames.cancel(a));
        assert!(!frames.cancel(a));
        assert!(!frames.is_active(a));
        assert!(frames.is_active(b));
    }

    #[test]
    fn test_cancelled_handle_is_never_reused() {
        let mut frames = FrameScheduler::new();
        let a = frames.register();
        frames.cancel(a);
        let b = frames.register();
        assert_ne!(a, b);
        assert!(!frames.is_active(a));
    }
}
