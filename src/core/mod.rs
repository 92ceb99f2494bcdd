pub mod buffer;
pub mod resources;

pub use buffer::{ContourSet, Handle, LabelImage, PixelData, PoseSlot, RectHandle};
pub use resources::{HeapTracker, Lease, ResourceKind, ResourceTracker};
