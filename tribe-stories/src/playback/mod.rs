//! Story playback: progress timer, navigation, media adapter, viewer state
//! machine and the async session that drives it

pub mod media;
pub mod navigation;
pub mod progress;
pub mod session;
pub mod viewer;

pub use media::{MediaAdapter, MediaEvent, MediaView};
pub use navigation::{PlaybackCursor, Position};
pub use progress::{ProgressTimer, TickScheduler};
pub use session::ViewerHandle;
pub use viewer::{StoryViewer, ViewerSnapshot, ViewerStep};
