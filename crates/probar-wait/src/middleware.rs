//! Cross-cutting wrappers for async operations.
//!
//! Each wrapper takes an operation's future and returns an equivalent
//! future with one concern added. They compose by nesting:
//!
//! ```ignore
//! logged("LoginPage", "log_on", validated(&browser, settled(load, page.log_on())))
//! ```

use crate::browser::Browser;
use crate::result::WaitResult;
use crate::wait::CallStack;
use std::future::Future;
use std::time::Duration;
use tracing::Instrument;

/// Emit "Attempting" before and "Finished" after `operation`, inside an
/// `info` span naming the owner and the operation.
pub async fn logged<F: Future>(owner: &str, operation: &str, fut: F) -> F::Output {
    let span = tracing::info_span!("operation", owner, operation);
    async move {
        tracing::info!("Attempting: {operation}");
        let output = fut.await;
        tracing::info!("Finished: {operation}");
        output
    }
    .instrument(span)
    .await
}

/// Run every session validator after `fut` succeeds.
///
/// The call-site stack is captured before the operation starts.
pub async fn validated<T, F>(browser: &Browser, fut: F) -> WaitResult<T>
where
    F: Future<Output = WaitResult<T>>,
{
    let stack = CallStack::capture("validated operation");
    let output = fut.await?;
    browser.validators().validate_all(browser, &stack).await?;
    Ok(output)
}

/// Await `fut`, then sleep for `delay` to let the page settle.
pub async fn settled<F: Future>(delay: Duration, fut: F) -> F::Output {
    let output = fut.await;
    if !delay.is_zero() {
        tracing::trace!(delay_ms = delay.as_millis() as u64, "settling");
        tokio::time::sleep(delay).await;
    }
    output
}
