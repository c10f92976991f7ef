// THEORY:
// Decoding an uploaded image goes through a temporary handle onto its bytes
// (the equivalent of an object URL). The handle is the only resource in the
// pipeline with an explicit lifecycle: it is acquired when a decode starts and
// must be released exactly once on every exit path, whether the decode
// succeeds, fails, panics, or the caller drops the in-flight future.
//
// Key architectural principles:
// 1.  **Explicit registry**: Handles are issued by a `HandleRegistry` that is
//     passed in, never held as ambient global state. The registry decides what
//     a handle means (a counter, a temp file, a browser object URL).
// 2.  **RAII release**: `ScopedHandle` releases in `Drop`, so release is tied to
//     scope exit instead of to each `return`/`?` in the preprocessor.
// 3.  **Leak detection**: `TrackingRegistry` keeps live and released counts so
//     tests (and long-running hosts) can assert that nothing leaked.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub type HandleId = u64;

/// Issues and revokes temporary handles onto source image bytes.
pub trait HandleRegistry: Send + Sync {
    /// Opens a handle onto `byte_len` bytes of `media_type` content.
    fn acquire(&self, media_type: &str, byte_len: usize) -> HandleId;
    /// Revokes a handle previously returned by `acquire`.
    fn release(&self, id: HandleId);
}

/// A handle that is released when it goes out of scope.
pub struct ScopedHandle {
    registry: Arc<dyn HandleRegistry>,
    id: HandleId,
}

impl ScopedHandle {
    pub fn acquire(registry: Arc<dyn HandleRegistry>, media_type: &str, byte_len: usize) -> Self {
        let id = registry.acquire(media_type, byte_len);
        Self { registry, id }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl Drop for ScopedHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// Registry that counts handles so leaks and double releases are observable.
#[derive(Default)]
pub struct TrackingRegistry {
    next_id: AtomicU64,
    live: Mutex<HashSet<HandleId>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl TrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    // A panic while holding the lock leaves the set intact; keep counting.
    fn live(&self) -> MutexGuard<'_, HashSet<HandleId>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Every call to `release`, including ones for unknown handles.
    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl HandleRegistry for TrackingRegistry {
    fn acquire(&self, media_type: &str, byte_len: usize) -> HandleId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.live().insert(id);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        debug!(handle = id, media_type, byte_len, "source handle acquired");
        id
    }

    fn release(&self, id: HandleId) {
        self.released.fetch_add(1, Ordering::SeqCst);
        let was_live = self.live().remove(&id);
        if was_live {
            debug!(handle = id, "source handle released");
        } else {
            warn!(handle = id, "release of a handle that is not live");
        }
    }
}
