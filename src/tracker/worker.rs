use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A spawned background task that can be told to stop.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawns `task` with the receiving end of its stop signal.
    pub fn spawn<F, Fut>(name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(task(stop_rx));
        Self {
            name: name.into(),
            stop_tx,
            join,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.join.await {
            log::warn!("Worker {} ended abnormally: {}", self.name, e);
        }
    }
}
