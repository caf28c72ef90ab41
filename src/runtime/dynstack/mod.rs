//! The dynamic-extent stack.
//!
//! Frames live in a [`FrameArena`]; the live stack and every captured
//! continuation are sequences of [`FrameHandle`]s, outermost first.
//! Reinstating a continuation is planned as a pure function of the two
//! handle sequences (see [`Transition::plan`]), and the machine then runs
//! the thunks the plan names.
use std::rc::{Rc, Weak};

use crate::runtime::{frame::DynFrame, leak_detector, value::Value};

pub mod arena;
pub mod frame_handle;

pub use arena::FrameArena;
pub use frame_handle::FrameHandle;

/// A continuation's view of the dynamic-extent stack, outermost first.
pub type Snapshot = Rc<[FrameHandle]>;

/// Length of the longest common prefix of two handle sequences.
pub fn shared_prefix_len(current: &[FrameHandle], snapshot: &[FrameHandle]) -> usize {
    current
        .iter()
        .zip(snapshot)
        .take_while(|(a, b)| a == b)
        .count()
}

/// The frames a continuation transfer has to leave and re-enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Frames of the current stack past the shared prefix, innermost first.
    pub unwind: Vec<FrameHandle>,
    /// Frames of the target stack past the shared prefix, outermost first.
    pub rewind: Vec<FrameHandle>,
}

impl Transition {
    pub fn plan(current: &[FrameHandle], target: &[FrameHandle]) -> Self {
        let shared = shared_prefix_len(current, target);
        Self {
            unwind: current[shared..].iter().rev().copied().collect(),
            rewind: target[shared..].to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unwind.is_empty() && self.rewind.is_empty()
    }
}

/// Live stack plus the arena its frames are stored in.
pub struct DynStack {
    arena: FrameArena,
    live: Vec<FrameHandle>,
    snapshots: Vec<Weak<[FrameHandle]>>,
}

impl Default for DynStack {
    fn default() -> Self {
        Self::new()
    }
}

impl DynStack {
    pub fn new() -> Self {
        Self {
            arena: FrameArena::new(),
            live: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut FrameArena {
        &mut self.arena
    }

    pub fn depth(&self) -> usize {
        self.live.len()
    }

    pub fn handles(&self) -> &[FrameHandle] {
        &self.live
    }

    pub fn push(&mut self, frame: DynFrame) -> FrameHandle {
        let handle = self.arena.alloc(frame);
        self.live.push(handle);
        handle
    }

    /// Innermost frame, if any.
    pub fn top(&self) -> Option<(FrameHandle, &DynFrame)> {
        let handle = *self.live.last()?;
        self.arena.get(handle).map(|frame| (handle, frame))
    }

    /// Drops the innermost frame from the live stack. The frame itself
    /// stays in the arena for any continuation that captured it.
    pub fn pop(&mut self) -> Option<FrameHandle> {
        self.live.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.live.truncate(len);
    }

    pub fn frame(&self, handle: FrameHandle) -> Option<&DynFrame> {
        self.arena.get(handle)
    }

    pub fn frame_mut(&mut self, handle: FrameHandle) -> Option<&mut DynFrame> {
        self.arena.get_mut(handle)
    }

    /// Index into the live stack of the innermost prompt whose tag is `eq?`
    /// to `tag`, or whose own tag is `#t`.
    pub fn find_prompt(&self, tag: &Value) -> Option<usize> {
        self.live.iter().rposition(|handle| {
            matches!(
                self.arena.get(*handle),
                Some(DynFrame::Prompt { tag: frame_tag, .. })
                    if frame_tag.is_eq(tag) || matches!(frame_tag, Value::Bool(true))
            )
        })
    }

    /// Captures the live stack for a continuation.
    pub fn capture(&mut self) -> Snapshot {
        leak_detector::record_continuation();
        let snapshot: Snapshot = Rc::from(self.live.as_slice());
        self.snapshots.push(Rc::downgrade(&snapshot));
        snapshot
    }

    /// Captures the live frames from `from` to the top, for resuming an
    /// aborted computation on top of whatever stack is live at that time.
    pub fn capture_from(&mut self, from: usize) -> Snapshot {
        let start = from.min(self.live.len());
        let segment: Snapshot = Rc::from(&self.live[start..]);
        self.snapshots.push(Rc::downgrade(&segment));
        segment
    }

    /// Replaces the live stack with `snapshot`.
    pub fn install(&mut self, snapshot: &[FrameHandle]) {
        self.live.clear();
        self.live.extend_from_slice(snapshot);
    }

    pub fn should_collect(&self) -> bool {
        self.arena.should_collect()
    }

    /// Frees frames unreachable from the live stack and from every
    /// continuation that is still alive. Returns the number freed.
    pub fn collect(&mut self) -> usize {
        let live_snapshots: Vec<Snapshot> = self
            .snapshots
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        self.snapshots.retain(|weak| weak.strong_count() > 0);

        let roots = std::iter::once(self.live.as_slice())
            .chain(live_snapshots.iter().map(|snapshot| &snapshot[..]));
        self.arena.collect(roots)
    }
}

#[cfg(test)]
mod dynstack_test;
