use tracing::debug;

use crate::error::Result;
use crate::sandbox::Sandbox;

pub use futures_util::future::BoxFuture;

/// Start `sandbox`, run `body` against it, then stop it on every exit path.
///
/// `stop` runs whether `body` succeeds or fails, and is a no-op when `start`
/// itself failed. Dropping the returned future mid-flight skips `stop`, so
/// callers that cancel must stop the sandbox themselves.
///
/// ```ignore
/// let out = sandbox::scoped(&mut sb, |s| Box::pin(async move {
///     s.execute("echo hi").await
/// }))
/// .await?;
/// ```
pub async fn scoped<T, F>(sandbox: &mut dyn Sandbox, body: F) -> Result<T>
where
    F: for<'s> FnOnce(&'s mut dyn Sandbox) -> BoxFuture<'s, Result<T>>,
{
    if let Err(e) = sandbox.start().await {
        sandbox.stop().await;
        return Err(e);
    }

    let result = body(&mut *sandbox).await;

    debug!(
        backend = sandbox.backend(),
        ok = result.is_ok(),
        "scoped body finished"
    );
    sandbox.stop().await;
    result
}
