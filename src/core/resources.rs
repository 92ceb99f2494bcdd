//! Scoped acquisition of pipeline resources.
//!
//! Every buffer and handle a run uses is paired with a `Lease`. The lease is
//! taken from a `ResourceTracker` when the resource is created and handed
//! back when it is dropped, so an early return releases exactly what was
//! acquired, in reverse order.

use std::sync::Arc;

use crate::error::LabelError;

/// Kinds of resources a run acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    RotatedRect,
    Rect,
    ContourSet,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Image => write!(f, "image buffer"),
            ResourceKind::RotatedRect => write!(f, "rotated rectangle"),
            ResourceKind::Rect => write!(f, "rectangle"),
            ResourceKind::ContourSet => write!(f, "contour set"),
        }
    }
}

/// Grants and reclaims resources.
pub trait ResourceTracker: Send + Sync {
    /// Called before a resource is created. An error aborts the acquisition.
    fn acquire(&self, kind: ResourceKind) -> Result<(), LabelError>;

    /// Called exactly once for every successful `acquire`.
    fn release(&self, kind: ResourceKind);
}

/// Tracker backed by the global allocator. Never refuses.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapTracker;

impl ResourceTracker for HeapTracker {
    fn acquire(&self, kind: ResourceKind) -> Result<(), LabelError> {
        log::trace!("acquire {}", kind);
        Ok(())
    }

    fn release(&self, kind: ResourceKind) {
        log::trace!("release {}", kind);
    }
}

/// Guard returned by a successful acquisition; releases on drop.
pub struct Lease {
    kind: ResourceKind,
    tracker: Arc<dyn ResourceTracker>,
}

impl Lease {
    pub fn acquire(tracker: &Arc<dyn ResourceTracker>, kind: ResourceKind) -> Result<Self, LabelError> {
        tracker.acquire(kind)?;
        Ok(Self {
            kind,
            tracker: Arc::clone(tracker),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.tracker.release(self.kind);
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("kind", &self.kind).finish()
    }
}
