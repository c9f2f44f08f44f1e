//! Callback adapter for callers that cannot await.

use std::future::Future;

use tokio::task::JoinHandle;

/// Run `future` on the current runtime and hand its result to `callback`.
///
/// ```ignore
/// let request = request.clone();
/// with_callback(async move { request.get(options).await }, |result| match result {
///     Ok(body) => println!("{:?}", body),
///     Err(e) => eprintln!("{}", e),
/// });
/// ```
pub fn with_callback<F, T, E, C>(future: F, callback: C) -> JoinHandle<()>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    C: FnOnce(Result<T, E>) + Send + 'static,
{
    tokio::spawn(async move {
        callback(future.await);
    })
}
