//! Time utilities used by delayed effects.
//!
//! Durations are `time::Duration`, which may be negative; a due time in the
//! past means "fire now".
//!
//! # Example
//!
//! ```no_run
//! use quell_async::time::sleep;
//! use time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! sleep(Duration::milliseconds(250)).await;
//!
//! // Already due
//! sleep(Duration::seconds(-1)).await;
//! # });
//! ```

/// Sleeps for the specified duration.
///
/// - Positive durations: sleeps for the specified time
/// - Zero or negative durations: returns immediately without sleeping
/// - Durations exceeding `std::time::Duration::MAX`: sleeps for `MAX`
#[cfg(feature = "tokio")]
pub async fn sleep(duration: time::Duration) {
    if !duration.is_positive() {
        return;
    }

    let std_duration: std::time::Duration = duration.try_into().unwrap_or(std::time::Duration::MAX);

    tokio::time::sleep(std_duration).await;
}
