//! Convenience entry points on top of the engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use httpwork::work::{WorkExt, ExecuteOptions};
//!
//! let data = MyWork::new("alice").start(2).await;
//! if data.success() {
//!     println!("{:?}", data.result());
//! }
//!
//! let data = UploadWork::new(path)
//!     .upload(0, |sent, total, done| println!("{sent}/{total:?} {done}"))
//!     .await;
//! ```

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::http::progress::ProgressChannel;
use crate::work::data::WorkData;
use crate::work::engine::{self, ExecuteOptions};
use crate::work::task::Work;

/// Execution methods available on every [`Work`].
#[async_trait]
pub trait WorkExt: Work {
    /// Run the work once with full control over retry, progress and
    /// cancellation.
    async fn execute(&self, options: ExecuteOptions) -> WorkData<Self::Output> {
        engine::execute(self, options).await
    }

    async fn start(&self, retry: u32) -> WorkData<Self::Output> {
        self.execute(ExecuteOptions::new().retry(retry)).await
    }

    async fn upload<F>(&self, retry: u32, on_send_progress: F) -> WorkData<Self::Output>
    where
        F: Fn(u64, Option<u64>, bool) + Send + Sync + 'static,
    {
        self.execute(
            ExecuteOptions::new()
                .retry(retry)
                .on_send_progress(on_send_progress),
        )
        .await
    }

    async fn download<F>(&self, retry: u32, on_receive_progress: F) -> WorkData<Self::Output>
    where
        F: Fn(u64, Option<u64>, bool) + Send + Sync + 'static,
    {
        self.execute(
            ExecuteOptions::new()
                .retry(retry)
                .on_receive_progress(on_receive_progress),
        )
        .await
    }

    /// Upload with progress offered into `channel`, closed once the work ends.
    async fn upload_with_channel(
        &self,
        retry: u32,
        channel: ProgressChannel,
    ) -> WorkData<Self::Output> {
        let mut options = ExecuteOptions::new().retry(retry);
        options.on_send_progress = Some(channel.listener());
        let data = self.execute(options).await;
        channel.close();
        data
    }

    /// Download with progress offered into `channel`, closed once the work ends.
    async fn download_with_channel(
        &self,
        retry: u32,
        channel: ProgressChannel,
    ) -> WorkData<Self::Output> {
        let mut options = ExecuteOptions::new().retry(retry);
        options.on_receive_progress = Some(channel.listener());
        let data = self.execute(options).await;
        channel.close();
        data
    }
}

impl<W: Work + ?Sized> WorkExt for W {}

/// Spawn an execution and hand its result to `callback`.
///
/// Runs on `handle`, or on the current runtime when `None`; the latter panics
/// outside a tokio runtime, like `tokio::spawn`. Aborting the returned handle
/// drops the execution without running its terminal hooks; cancel through
/// [`ExecuteOptions::cancel`] to get `on_canceled` and `on_finished`.
pub fn launch<W, F, Fut>(
    work: Arc<W>,
    handle: Option<Handle>,
    options: ExecuteOptions,
    callback: F,
) -> JoinHandle<()>
where
    W: Work + 'static,
    F: FnOnce(WorkData<W::Output>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = handle.unwrap_or_else(Handle::current);
    handle.spawn(async move {
        let data = engine::execute(work.as_ref(), options).await;
        callback(data).await;
    })
}
