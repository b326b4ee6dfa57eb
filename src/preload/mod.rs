//! Predictive preloading
//!
//! - [`cache`]: time-boxed prefetch cache keyed by absolute URL
//! - [`eligibility`]: which links are safe to prefetch
//! - [`preloader`]: issues prefetches, owns hover-delay timers, splices cached fetches into
//!   navigations
//! - [`observer`]: decides when to prefetch (page load, tree mutations, pointer input)
//! - [`config`]: document-level settings and per-link overrides
//! - [`report`]: serializable summary of what a document would prefetch

pub mod cache;
pub mod config;
pub mod eligibility;
pub mod observer;
pub mod preloader;
pub mod report;

pub use cache::{CacheEntry, PrefetchCache};
pub use eligibility::{check_eager_preloadable, check_preloadable, is_preloadable, Rejection};
pub use observer::{LinkPreloadDelegate, LinkPreloadObserver, ObserverState};
pub use preloader::{PendingDelay, Preloader};
pub use report::{plan_document, LinkReport, PreloadPlan};

/// `data-navigate="false"` opts a link (or a subtree) out of driven navigation.
pub const NAVIGATE_ATTRIBUTE: &str = "data-navigate";
/// `data-predictive-preload="false"` opts a link or subtree out of prefetching.
pub const PREDICTIVE_PRELOAD_ATTRIBUTE: &str = "data-predictive-preload";
pub const CACHE_TIME_ATTRIBUTE: &str = "data-predictive-preload-cache-time";
pub const DELAY_ATTRIBUTE: &str = "data-predictive-preload-delay";
/// Marks a link for eager preloading as soon as it is seen.
pub const EAGER_PRELOAD_ATTRIBUTE: &str = "data-preload";
/// Links answered with partial-page stream updates are never prefetched.
pub const STREAM_ATTRIBUTE: &str = "data-stream";
pub const FRAME_ATTRIBUTE: &str = "data-frame";
pub const METHOD_ATTRIBUTE: &str = "data-method";

/// Frame value meaning "navigate the whole document".
pub const TOP_FRAME: &str = "_top";
/// Element wrapping a frame-scoped region of the document.
pub const FRAME_ELEMENT: &str = "content-frame";

pub const PURPOSE_HEADER: &str = "Sec-Purpose";
pub const PURPOSE_PREFETCH: &str = "prefetch";
pub const FRAME_HEADER: &str = "Content-Frame";
