use crate::runtime::{dynstack::frame_handle::FrameHandle, frame::DynFrame, leak_detector};

const DEFAULT_COLLECT_THRESHOLD: usize = 4096;
pub(crate) const MIN_COLLECT_THRESHOLD: usize = 64;

struct ArenaEntry {
    frame: DynFrame,
    marked: bool,
}

/// Mark-and-sweep storage for dynamic-extent frames.
///
/// Frames outlive their time on the live stack whenever a continuation has
/// captured them, so popping never frees a slot. Instead the owner
/// periodically calls [`FrameArena::collect`] with every handle still
/// reachable; everything else is released and its slot reused.
pub struct FrameArena {
    entries: Vec<Option<ArenaEntry>>,
    free_list: Vec<u32>,
    allocation_count: usize,
    threshold: usize,
    enabled: bool,
    total_collections: usize,
    total_allocations: usize,
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameArena {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            allocation_count: 0,
            threshold: DEFAULT_COLLECT_THRESHOLD,
            enabled: true,
            total_collections: 0,
            total_allocations: 0,
        }
    }

    /// Creates an arena with a custom threshold.
    ///
    /// Unlike [`Self::set_threshold`], this does not clamp.
    pub fn with_threshold(threshold: usize) -> Self {
        let mut arena = Self::new();
        arena.threshold = threshold;
        arena
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Values below `MIN_COLLECT_THRESHOLD` are clamped upward.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold.max(MIN_COLLECT_THRESHOLD);
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_collect(&self) -> bool {
        self.enabled && self.allocation_count >= self.threshold
    }

    pub fn alloc(&mut self, frame: DynFrame) -> FrameHandle {
        leak_detector::record_frame();
        self.allocation_count += 1;
        self.total_allocations += 1;

        let entry = ArenaEntry {
            frame,
            marked: false,
        };
        if let Some(idx) = self.free_list.pop() {
            self.entries[idx as usize] = Some(entry);
            FrameHandle(idx)
        } else {
            let idx = self.entries.len() as u32;
            self.entries.push(Some(entry));
            FrameHandle(idx)
        }
    }

    /// Returns `None` for handles whose frame has been collected.
    pub fn get(&self, handle: FrameHandle) -> Option<&DynFrame> {
        self.entries
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_ref())
            .map(|entry| &entry.frame)
    }

    pub fn get_mut(&mut self, handle: FrameHandle) -> Option<&mut DynFrame> {
        self.entries
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.as_mut())
            .map(|entry| &mut entry.frame)
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    /// Frees every frame not named by `roots`. Returns how many were freed.
    pub fn collect<'a, I>(&mut self, roots: I) -> usize
    where
        I: IntoIterator<Item = &'a [FrameHandle]>,
    {
        for handles in roots {
            for handle in handles {
                if let Some(Some(entry)) = self.entries.get_mut(handle.0 as usize) {
                    entry.marked = true;
                }
            }
        }

        let live_before = self.live_count();
        self.sweep();
        let collected = live_before.saturating_sub(self.live_count());

        self.total_collections += 1;
        self.allocation_count = 0;
        self.adapt_threshold(collected, live_before);
        collected
    }

    fn sweep(&mut self) {
        for (i, slot) in self.entries.iter_mut().enumerate() {
            if let Some(entry) = slot {
                if entry.marked {
                    entry.marked = false;
                } else {
                    *slot = None;
                    self.free_list.push(i as u32);
                }
            }
        }
    }

    fn adapt_threshold(&mut self, collected: usize, total_before: usize) {
        if total_before == 0 {
            return;
        }
        let ratio = collected as f64 / total_before as f64;
        if ratio < 0.25 {
            self.threshold = (self.threshold * 2).min(1 << 20);
        } else if ratio > 0.75 {
            self.threshold = (self.threshold / 2).max(MIN_COLLECT_THRESHOLD);
        }
    }
}
