//! Wall-clock timestamps and bounded waits.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis() as i64)
		.unwrap_or(0)
}

/// Runs `fut` with a deadline, turning expiry into [`Error::Timeout`].
pub async fn bounded<T, E, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
	F: Future<Output = std::result::Result<T, E>>,
	E: Into<Error>,
{
	match tokio::time::timeout(limit, fut).await {
		Ok(result) => result.map_err(Into::into),
		Err(_) => Err(Error::Timeout(format!("{what} after {}ms", limit.as_millis()))),
	}
}
