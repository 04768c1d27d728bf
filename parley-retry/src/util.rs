use std::time::Duration;
use tokio::time::Instant;

/// Sleep for a given duration, returning `true` once the sleep completes, or `false` immediately
/// (without sleeping at all) if waking up would exceed the deadline.
pub(crate) async fn sleep_until_or_deadline(duration: Duration, deadline: Option<Instant>) -> bool {
    let wakeup = Instant::now() + duration;
    if let Some(deadline) = deadline {
        if deadline < wakeup {
            return false;
        }
    }
    tokio::time::sleep_until(wakeup).await;
    true
}
