use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Cumulative allocation counts for the runtime's shared objects.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LeakStats {
    pub closures: usize,
    pub structs: usize,
    pub pairs: usize,
    pub continuations: usize,
    pub frames: usize,
}

static CLOSURES: AtomicUsize = AtomicUsize::new(0);
static STRUCTS: AtomicUsize = AtomicUsize::new(0);
static PAIRS: AtomicUsize = AtomicUsize::new(0);
static CONTINUATIONS: AtomicUsize = AtomicUsize::new(0);
static FRAMES: AtomicUsize = AtomicUsize::new(0);

pub fn record_closure() {
    CLOSURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_struct() {
    STRUCTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_pair() {
    PAIRS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_continuation() {
    CONTINUATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_frame() {
    FRAMES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> LeakStats {
    LeakStats {
        closures: CLOSURES.load(Ordering::Relaxed),
        structs: STRUCTS.load(Ordering::Relaxed),
        pairs: PAIRS.load(Ordering::Relaxed),
        continuations: CONTINUATIONS.load(Ordering::Relaxed),
        frames: FRAMES.load(Ordering::Relaxed),
    }
}
