pub mod fetcher;
#[path = "loop_.rs"]
pub mod sync_loop;
pub mod recorder;

pub use fetcher::{HttpSegmentFetcher, HttpSplitFetcher, SegmentDelta, SegmentFetcher, SplitFetcher};
pub use recorder::{HttpRawRecorder, RawRecorder};
pub use sync_loop::SyncLoop;
