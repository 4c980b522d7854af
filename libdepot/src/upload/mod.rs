use crate::storage::ThreadSafeRecordStore;
use log::{error, info, warn};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;

/// Number of upload workers unless configured otherwise.
pub const DEFAULT_UPLOAD_WORKERS: usize = 10;

/// Outcome of one submitted upload.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum UploadOutcome {
    /// The record store confirmed the write.
    Completed,
    /// The write did not happen; carries a human-readable reason.
    Failed(String),
}

struct UploadJob {
    owner: String,
    filename: String,
    content: Vec<u8>,
    outcome: Sender<UploadOutcome>,
}

/// Executes file-persist operations on a bounded pool of workers.
///
/// The pool caps the number of concurrent storage writes independent of the
/// number of connected clients. Submitting blocks the calling connection
/// thread until the job's outcome is available; when every worker is busy,
/// new uploads queue instead of overrunning the store. Store failures become
/// [`UploadOutcome::Failed`] — they never take a worker down.
pub struct UploadRunner {
    jobs: Mutex<Option<Sender<UploadJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl UploadRunner {
    pub fn new(store: Arc<ThreadSafeRecordStore>, worker_count: usize) -> UploadRunner {
        let (job_tx, job_rx) = mpsc::channel::<UploadJob>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            let job_rx = Arc::clone(&job_rx);
            let store = Arc::clone(&store);
            workers.push(thread::spawn(move || {
                Self::work(worker_index, job_rx, store)
            }));
        }

        info!("Started upload runner with {worker_count} workers");

        UploadRunner {
            jobs: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues one upload and blocks until a worker has carried it out.
    pub fn submit(&self, owner: &str, filename: &str, content: Vec<u8>) -> UploadOutcome {
        let maybe_job_tx = self.jobs.lock().unwrap().as_ref().cloned();
        let Some(job_tx) = maybe_job_tx else {
            return UploadOutcome::Failed("upload runner is stopped".to_owned());
        };

        let (outcome_tx, outcome_rx) = mpsc::channel();
        let job = UploadJob {
            owner: owner.to_owned(),
            filename: filename.to_owned(),
            content,
            outcome: outcome_tx,
        };

        if job_tx.send(job).is_err() {
            return UploadOutcome::Failed("upload runner is stopped".to_owned());
        }

        match outcome_rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => UploadOutcome::Failed("upload task was abandoned".to_owned()),
        }
    }

    fn work(
        worker_index: usize,
        job_rx: Arc<Mutex<Receiver<UploadJob>>>,
        store: Arc<ThreadSafeRecordStore>,
    ) {
        loop {
            let received = job_rx.lock().unwrap().recv();
            let Ok(job) = received else {
                // Queue closed and drained.
                break;
            };

            let outcome = match store.save_file(&job.owner, &job.filename, &job.content) {
                Ok(()) => UploadOutcome::Completed,
                Err(e) => {
                    warn!("Upload of {} for {} failed: {e}", job.filename, job.owner);
                    UploadOutcome::Failed(e.to_string())
                }
            };

            if job.outcome.send(outcome).is_err() {
                warn!("Upload outcome discarded, submitter is gone");
            }
        }

        info!("Upload worker {worker_index} stopped");
    }

    /// Closes the queue and joins the workers. Queued jobs are drained
    /// before the workers exit; new submissions fail immediately.
    pub fn stop(&self) {
        let job_tx = self.jobs.lock().unwrap().take();
        if job_tx.is_none() {
            return;
        }
        drop(job_tx);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for worker in workers {
            if worker.join().is_err() {
                error!("An upload worker panicked");
            }
        }
    }
}

impl Drop for UploadRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
