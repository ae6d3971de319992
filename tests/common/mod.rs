#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cmdstream::store::RecordStore;
use cmdstream::types::CommandRecord;

pub use cmdstream_test_utils::builders::ExecutionSettingsBuilder;
pub use cmdstream_test_utils::{init_tracing, wait_until, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Wait until the store holds a record for `command` in a terminal state.
pub async fn wait_for_terminal(
    store: &Arc<dyn RecordStore>,
    command: &str,
) -> Option<CommandRecord> {
    wait_until(Duration::from_secs(5), move || async move {
        store
            .list_all()
            .await
            .ok()?
            .into_iter()
            .find(|r| r.command == command && r.status.is_terminal())
    })
    .await
}
