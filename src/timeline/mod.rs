mod poller;

pub use poller::{sync_timeline_once, TimelinePoller, POLL_LIMIT};
