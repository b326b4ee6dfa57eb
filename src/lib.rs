pub mod dom;
pub mod error;
pub mod event;
pub mod fetch;
pub mod mutation;
pub mod navigation;
pub mod page;
pub mod preload;
pub mod resource;
pub mod session;
pub mod timer;

pub use dom::{parse_html, Document, NodeId, ReadyState};
pub use error::{Error, FetchError, ParseError, Result};
pub use event::{Event, EventType, ListenerOptions};
pub use fetch::{FetchMethod, FetchRequest, FetchState};
pub use navigation::{click, submit_form, visit_link, Visit};
pub use page::Page;
pub use resource::{FetchedResource, HttpRequest, ResourceFetcher};
pub use session::PreloadSession;
pub use timer::{Clock, ManualClock};

// Preload engine surface
pub use preload::config::{PreloadSettings, TriggerEvent};
pub use preload::report::{plan_document, LinkReport, PreloadPlan};
pub use preload::{PrefetchCache, Preloader, Rejection};
