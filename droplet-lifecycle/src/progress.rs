//! User-facing progress indication while a lifecycle call blocks

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A spinner task tied to the call that started it.
///
/// [`Progress::finish`] stops the task and waits for it, so nothing it logs
/// can land after the caller's own final line. Dropping the value without
/// finishing aborts the task.
pub struct Progress {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    frames: Arc<AtomicU32>,
}

impl Progress {
    /// Spawn the spinner. One frame every `frame_interval`; only every
    /// `log_every`-th frame is written to the log.
    pub fn start(message: impl Into<String>, frame_interval: Duration, log_every: u32) -> Self {
        let message = message.into();
        let log_every = log_every.max(1);
        let frames = Arc::new(AtomicU32::new(0));
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let counter = frames.clone();
        let handle = tokio::spawn(async move {
            let mut i: usize = 0;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => return,
                    _ = tokio::time::sleep(frame_interval) => {
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        if n % log_every == 0 {
                            tracing::info!("{} {}", SPINNER_FRAMES[i % SPINNER_FRAMES.len()], message);
                        }
                        i += 1;
                    }
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
            frames,
        }
    }

    /// Stop the spinner and wait until its task has exited.
    /// Returns the number of frames shown.
    pub async fn finish(mut self) -> u32 {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.frames.load(Ordering::SeqCst)
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
