/// Handle into the dynamic-extent frame arena.
///
/// Handles are small and `Copy`, so the live stack and every captured
/// continuation store plain handle sequences rather than frames. Two
/// reachable handles are equal exactly when they name the same frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub(crate) u32);

impl FrameHandle {
    /// Returns the raw arena slot index backing this handle.
    pub fn index(self) -> u32 {
        self.0
    }

    #[cfg(test)]
    pub fn new_for_test(index: u32) -> Self {
        Self(index)
    }
}
