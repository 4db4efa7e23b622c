//! Parallel dispatch
//!
//! File-granular producer/consumer pool over crossbeam channels. Each worker
//! owns the readers for the files it evaluates, verdicts fan in over a
//! bounded channel, and the single collector merges them, so the shared
//! report never needs a lock. The merged result set is identical to the
//! sequential path; only wall-clock time differs.

use crate::config::SearchConfig;
use crate::search::runner::{Discovery, FileVerdict};
use crate::search::walker::CandidateFile;
use anyhow::Result;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Progress log cadence, in files
const PROGRESS_EVERY: usize = 100;

/// Worker count from CPU budget, capped by config and by the workload
pub(crate) fn optimal_workers(config: &SearchConfig, file_count: usize) -> usize {
    let cpu_cores = num_cpus::get();
    let max_by_percentage =
        std::cmp::max(1, (cpu_cores * config.thread_percentage as usize) / 100);
    let max_workers = if config.max_threads > 0 {
        std::cmp::min(config.max_threads, max_by_percentage)
    } else {
        max_by_percentage
    };
    std::cmp::min(max_workers, file_count.max(1))
}

/// Evaluate all candidates on a worker pool and collect the verdicts
pub(crate) fn run(
    discovery: &Discovery,
    candidates: Vec<CandidateFile>,
    workers: usize,
) -> Result<Vec<FileVerdict>> {
    let total = candidates.len();
    let (work_tx, work_rx): (Sender<CandidateFile>, Receiver<CandidateFile>) =
        bounded(workers * 2);
    let (result_tx, result_rx): (Sender<FileVerdict>, Receiver<FileVerdict>) =
        bounded(workers * 4);
    let progress = Arc::new(AtomicUsize::new(0));

    let verdicts = crossbeam::thread::scope(|s| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let progress = progress.clone();
            s.spawn(move |_| {
                while let Ok(candidate) = work_rx.recv() {
                    let verdict = discovery.evaluate(&candidate);
                    if result_tx.send(verdict).is_err() {
                        break;
                    }
                    let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % PROGRESS_EVERY == 0 || done == total {
                        tracing::debug!("Searched {done}/{total} files");
                    }
                }
            });
        }

        let producer_tx = work_tx.clone();
        s.spawn(move |_| {
            for candidate in candidates {
                if producer_tx.send(candidate).is_err() {
                    break;
                }
            }
        });

        // Close our ends so the receivers can drain to completion
        drop(work_tx);
        drop(result_tx);

        let mut verdicts = Vec::with_capacity(total);
        while let Ok(verdict) = result_rx.recv() {
            verdicts.push(verdict);
        }
        verdicts
    })
    .map_err(|_| anyhow::anyhow!("Worker thread panicked during file search"))?;

    Ok(verdicts)
}
