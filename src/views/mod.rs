//! Session-scoped view bookkeeping.
//!
//! - [`ViewLedger`]: the set of items already viewed in this session
//! - [`ViewRecorder`]: at-most-once story view reporting via a background worker

mod ledger;
mod recorder;

pub use ledger::{ViewKey, ViewLedger, ViewTarget};
pub use recorder::{spawn_view_worker, ViewMessage, ViewRecorder, ViewWorker};
