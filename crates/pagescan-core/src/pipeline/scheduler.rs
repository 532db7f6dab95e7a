//! Fan-out of page tasks over a bounded rayon pool.
//!
//! Pool threads send finished outcomes back to the calling thread, which
//! files each one into the slot of its page and reports progress.
//! Completion order therefore never leaks into the result.

use std::sync::mpsc;
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use super::task::PageTask;
use crate::aggregate;
use crate::models::config::{ExecutionMode, ExtractionConfig};
use crate::models::result::{ExtractionResult, PageOutcome, RunState};
use crate::ocr::Recognizer;
use crate::pdf::Document;

/// How a run is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One page at a time, in index order.
    Sequential,
    /// A pool of `workers` threads.
    Concurrent { workers: usize },
}

impl Strategy {
    /// Pick the strategy for a document of `page_count` pages.
    ///
    /// A pool only pays off with two or more pages. The pool never has more
    /// workers than pages or than the configured ceiling.
    pub fn select(config: &ExtractionConfig, page_count: usize) -> Self {
        if config.mode == ExecutionMode::Sequential || page_count <= 1 {
            return Strategy::Sequential;
        }

        let workers = config.max_workers.max(1).min(page_count);
        if workers == 1 {
            Strategy::Sequential
        } else {
            Strategy::Concurrent { workers }
        }
    }
}

/// Runs page tasks against a recognizer.
pub struct Scheduler<R> {
    recognizer: R,
}

impl<R: Recognizer> Scheduler<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Process every page of `document` and aggregate the outcomes.
    ///
    /// Every page is attempted; page failures are recorded in their outcome.
    /// `progress` receives `(completed, total)` after each page, on the calling
    /// thread. The document is dropped (closed) once all pages are done.
    pub fn run<D, F>(&self, document: D, config: &ExtractionConfig, mut progress: F) -> ExtractionResult
    where
        D: Document,
        F: FnMut(usize, usize),
    {
        let start = Instant::now();
        let total = document.page_count();

        if total == 0 {
            debug!("Document has no pages, nothing to dispatch");
            drop(document);
            return ExtractionResult::empty(start.elapsed());
        }

        let strategy = Strategy::select(config, total);
        info!(
            "Extracting {} pages ({:?}, {} dpi, {}, {})",
            total, strategy, config.dpi, config.languages, config.profile
        );
        debug!("Run state: {:?} -> {:?}", RunState::Idle, RunState::Running);

        let outcomes = match strategy {
            Strategy::Sequential => self.run_sequential(&document, config, &mut progress),
            Strategy::Concurrent { workers } => {
                self.run_concurrent(&document, config, workers, &mut progress)
            }
        };
        drop(document);

        let result = aggregate::aggregate(outcomes, start.elapsed());
        info!(
            "Run {:?}: {} pages, {} failed, {:.1}s",
            result.state(),
            result.page_count,
            result.failed_count(),
            result.elapsed.as_secs_f64()
        );
        result
    }

    fn run_sequential<D, F>(&self, document: &D, config: &ExtractionConfig, progress: &mut F) -> Vec<PageOutcome>
    where
        D: Document,
        F: FnMut(usize, usize),
    {
        let total = document.page_count();
        let mut outcomes = Vec::with_capacity(total);

        for index in 0..total {
            outcomes.push(PageTask::new(index, config).execute(document, &self.recognizer));
            progress(index + 1, total);
        }

        outcomes
    }

    fn run_concurrent<D, F>(
        &self,
        document: &D,
        config: &ExtractionConfig,
        workers: usize,
        progress: &mut F,
    ) -> Vec<PageOutcome>
    where
        D: Document,
        F: FnMut(usize, usize),
    {
        let pool = match ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pagescan-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Failed to build worker pool ({}), processing pages in order", e);
                return self.run_sequential(document, config, progress);
            }
        };

        let total = document.page_count();
        let mut slots: Vec<Option<PageOutcome>> = (0..total).map(|_| None).collect();
        let recognizer = &self.recognizer;
        let (tx, rx) = mpsc::channel::<PageOutcome>();

        // The closure runs on the calling thread, which collects while the pool works
        pool.in_place_scope(|scope| {
            for index in 0..total {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = PageTask::new(index, config).execute(document, recognizer);
                    // The receiver lives until the scope ends
                    let _ = tx.send(outcome);
                });
            }
            drop(tx);

            for (completed, outcome) in rx.iter().enumerate() {
                let index = outcome.page_index;
                debug_assert!(slots[index].is_none(), "page {index} recorded twice");
                slots[index] = Some(outcome);
                progress(completed + 1, total);
            }
        });

        slots.into_iter().flatten().collect()
    }
}

/// Run an extraction over an opened document.
pub fn run_extraction<D, R, F>(
    document: D,
    recognizer: R,
    config: &ExtractionConfig,
    progress: F,
) -> ExtractionResult
where
    D: Document,
    R: Recognizer,
    F: FnMut(usize, usize),
{
    Scheduler::new(recognizer).run(document, config, progress)
}
