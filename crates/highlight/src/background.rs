// Chunk: docs/chunks/background_parse - Worker-thread parsing with stale-result rejection

//! Highlighting with parsing on a background thread.
//!
//! The editing thread keeps the snapshot, the line index, the tracker and the
//! cache; a named worker thread owns the parse engine. Jobs go out on a
//! command channel and results come back on a second channel drained by
//! [`BackgroundSession::poll`].
//!
//! At most one job is in flight. A request arriving while the worker is busy
//! becomes the pending request (the latest one wins); the edits behind it
//! are queued and shipped, in order, with the next job. A result is applied
//! only if the document still has the content and epoch the job was
//! dispatched for. A stale result is dropped, except for the lines whose
//! syntax it reported as changed: those are mapped through the newer edits
//! and marked stale.

use std::ops::{Range, RangeInclusive};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use glint_buffer::{ByteCharMap, CharEncoding, Fingerprint, LineIndex, TextSnapshot};
use glint_syntax::{EditDescriptor, EngineOptions, HighlightRange, LanguageRegistry, ParseEngine, SyntaxError};
use tracing::{debug, trace, warn};

use crate::cache::CacheKey;
use crate::config::HighlightConfig;
use crate::document::{AppliedEdit, DocumentState};
use crate::scheduler::{HighlightTarget, ViewportScheduler};
use crate::session::{build_engine, language_key, PLAIN_TEXT};
use crate::update::{CharRange, HighlightEvent, HighlightUpdate};

// =============================================================================
// Worker protocol
// =============================================================================

enum Command {
    /// Replace the engine (language change).
    Configure {
        language: String,
        options: EngineOptions,
    },
    Parse(Job),
    Shutdown,
}

struct Job {
    id: u64,
    epoch: u64,
    snapshot: TextSnapshot,
    /// Edits since the previous job, in order.
    edits: Vec<EditDescriptor>,
    /// Discard the tree first (document load).
    reset: bool,
    target: Option<HighlightTarget>,
    /// Build the character projection on the worker.
    project: Option<CharEncoding>,
}

struct JobOutput {
    changed: Vec<Range<usize>>,
    ranges: Vec<HighlightRange>,
    char_map: Option<Arc<ByteCharMap>>,
}

struct JobResult {
    id: u64,
    epoch: u64,
    fingerprint: Fingerprint,
    target: Option<HighlightTarget>,
    elapsed: Duration,
    outcome: Result<JobOutput, SyntaxError>,
}

fn run_worker(
    registry: Arc<LanguageRegistry>,
    mut engine: ParseEngine,
    commands: Receiver<Command>,
    results: Sender<JobResult>,
) {
    while let Ok(command) = commands.recv() {
        match command {
            Command::Configure { language, options } => {
                engine = build_engine(&registry, &language, options);
            }
            Command::Parse(job) => {
                let result = run_job(&mut engine, job);
                if results.send(result).is_err() {
                    // Session dropped
                    break;
                }
            }
            Command::Shutdown => break,
        }
    }
    trace!("parse worker exiting");
}

fn run_job(engine: &mut ParseEngine, job: Job) -> JobResult {
    let started = Instant::now();
    if job.reset {
        engine.reset();
    }
    let outcome = execute(engine, &job);
    JobResult {
        id: job.id,
        epoch: job.epoch,
        fingerprint: job.snapshot.fingerprint(),
        target: job.target,
        elapsed: started.elapsed(),
        outcome,
    }
}

fn execute(engine: &mut ParseEngine, job: &Job) -> Result<JobOutput, SyntaxError> {
    let sync = engine.sync(&job.snapshot, &job.edits)?;
    let Some(target) = &job.target else {
        return Ok(JobOutput {
            changed: sync.changed,
            ranges: Vec::new(),
            char_map: None,
        });
    };
    let ranges = engine.highlights_in(&job.snapshot, target.span.clone())?;
    let char_map = job
        .project
        .map(|encoding| Arc::new(ByteCharMap::new(job.snapshot.text(), encoding)));
    Ok(JobOutput {
        changed: sync.changed,
        ranges,
        char_map,
    })
}

// =============================================================================
// Session
// =============================================================================

/// What to do when the worker is next free.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    /// Bring the tree up to date only.
    Parse,
    /// Re-highlight a window around an edit, fresh or not.
    Edit(RangeInclusive<usize>),
    /// Highlight the stale lines of a viewport window.
    Viewport(RangeInclusive<usize>),
}

struct InFlight {
    id: u64,
    fingerprint: Fingerprint,
}

/// Highlighting for one document with parsing on a worker thread.
pub struct BackgroundSession {
    registry: Arc<LanguageRegistry>,
    config: HighlightConfig,
    language: &'static str,
    doc: DocumentState,
    scheduler: ViewportScheduler,
    commands: Sender<Command>,
    results: Receiver<JobResult>,
    worker: Option<JoinHandle<()>>,
    /// Bumped by load and language change; older results are discarded.
    epoch: u64,
    next_job: u64,
    in_flight: Option<InFlight>,
    pending: Option<Request>,
    needs_reset: bool,
    disabled: bool,
    stale_results: u64,
}

impl BackgroundSession {
    /// Starts the worker thread for an empty document in `language`.
    pub fn spawn(
        registry: Arc<LanguageRegistry>,
        language: &str,
        config: HighlightConfig,
    ) -> std::io::Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        let engine = build_engine(&registry, language, config.engine_options());
        let worker_registry = registry.clone();
        let worker = thread::Builder::new()
            .name("glint-parse".into())
            .spawn(move || run_worker(worker_registry, engine, command_rx, result_tx))?;

        let scheduler = ViewportScheduler::new(&config);
        Ok(Self {
            language: language_key(&registry, language),
            registry,
            config,
            doc: DocumentState::new(),
            scheduler,
            commands: command_tx,
            results: result_rx,
            worker: Some(worker),
            epoch: 0,
            next_job: 0,
            in_flight: None,
            pending: None,
            needs_reset: false,
            disabled: false,
            stale_results: 0,
        })
    }

    // ==================== Accessors ====================

    /// Canonical name of the document's language, `None` if unsupported.
    pub fn language(&self) -> Option<&'static str> {
        (self.language != PLAIN_TEXT).then_some(self.language)
    }

    pub fn snapshot(&self) -> &TextSnapshot {
        &self.doc.snapshot
    }

    pub fn line_index(&mut self) -> &mut LineIndex {
        &mut self.doc.index
    }

    pub fn scheduler(&self) -> &ViewportScheduler {
        &self.scheduler
    }

    /// Returns true while a job is on the worker.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Content of the job on the worker, if any.
    pub fn in_flight_fingerprint(&self) -> Option<Fingerprint> {
        self.in_flight.as_ref().map(|job| job.fingerprint)
    }

    /// Returns true if a request is waiting for the worker.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of results dropped because the document moved on.
    pub fn stale_results(&self) -> u64 {
        self.stale_results
    }

    /// Returns true once a parse has timed out.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.doc.snapshot.fingerprint(), self.language)
    }

    // ==================== Notifications ====================

    /// Replaces the document and schedules a parse from scratch.
    pub fn document_did_load(&mut self, text: &str) {
        self.doc.load(text);
        self.scheduler.reset();
        self.epoch += 1;
        self.needs_reset = true;
        self.request(Request::Parse);
    }

    /// Switches grammars on the worker and schedules a parse. A session
    /// disabled by a timeout starts over.
    pub fn language_changed(&mut self, language: &str) {
        self.language = language_key(&self.registry, language);
        let configure = Command::Configure {
            language: language.to_string(),
            options: self.config.engine_options(),
        };
        if self.commands.send(configure).is_err() {
            self.worker_gone();
            return;
        }
        self.doc.take_edits();
        self.scheduler.reset();
        self.epoch += 1;
        self.needs_reset = true;
        self.disabled = false;
        self.pending = None;
        self.request(Request::Parse);
    }

    /// Records an insertion and schedules the lines around it.
    pub fn text_did_insert(&mut self, at: usize, text: &str) {
        match self.doc.insert(at, text) {
            Some(applied) => self.after_edit(applied),
            None => debug!(at, len = text.len(), "insertion out of range ignored"),
        }
    }

    /// Records a deletion and schedules the lines around it.
    pub fn text_did_delete(&mut self, range: Range<usize>) {
        match self.doc.delete(range.clone()) {
            Some(applied) => self.after_edit(applied),
            None => debug!(?range, "deletion out of range ignored"),
        }
    }

    fn after_edit(&mut self, applied: AppliedEdit) {
        if applied.dirty.is_none() {
            return;
        }
        self.scheduler.record_edit(&applied.dirty);
        if self.disabled {
            self.doc.take_edits();
            return;
        }
        let window = self.scheduler.edit_window(&mut self.doc.index, applied.written);
        self.request(Request::Edit(window));
    }

    /// Handles a viewport change (byte offsets).
    ///
    /// Answers immediately when the stale lines are cached for the current
    /// content and the worker has nothing to catch up on; otherwise
    /// schedules the stale lines and returns `None`.
    pub fn viewport_changed(&mut self, start: usize, end: usize) -> Option<HighlightUpdate> {
        let window = self
            .scheduler
            .viewport_window(&mut self.doc.index, start, end);
        if self.disabled {
            return None;
        }

        let served = self.serve_cached(window.clone());
        if served.is_none()
            && self
                .scheduler
                .stale_target(&mut self.doc.index, window.clone())
                .is_some()
        {
            self.request(Request::Viewport(window.clone()));
        }

        let key = self.cache_key();
        self.scheduler.prune(&mut self.doc.index, &key, window);
        served
    }

    /// Serves the stale lines of `window` from the cache. Only done once
    /// every edit has been shipped to the worker.
    fn serve_cached(&mut self, window: RangeInclusive<usize>) -> Option<HighlightUpdate> {
        if !self.doc.pending_edits.is_empty() || self.needs_reset {
            return None;
        }
        let key = self.cache_key();
        let target = self.scheduler.stale_target(&mut self.doc.index, window)?;
        self.scheduler.cached(&key, &target)
    }

    /// Projects an update's ranges into the configured character space.
    pub fn char_ranges(&mut self, update: &HighlightUpdate) -> Option<Vec<CharRange>> {
        let key = CacheKey::new(update.fingerprint, self.language);
        let map = self.scheduler.cache_mut().char_map(&key)?;
        Some(update.char_ranges(&map))
    }

    // ==================== Results ====================

    /// Handles every result the worker has delivered, without blocking.
    pub fn poll(&mut self) -> Vec<HighlightEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.results.try_recv() {
            self.handle(result, &mut events);
        }
        events
    }

    /// Blocks until the worker delivers one result (or `timeout` passes)
    /// and handles it.
    pub fn wait(&mut self, timeout: Duration) -> Vec<HighlightEvent> {
        let mut events = Vec::new();
        if self.in_flight.is_none() {
            return events;
        }
        match self.results.recv_timeout(timeout) {
            Ok(result) => self.handle(result, &mut events),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.worker_gone(),
        }
        events
    }

    /// Handles results until the worker is idle with nothing pending, or
    /// `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<HighlightEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while self.in_flight.is_some() {
            let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            events.extend(self.wait(left));
        }
        events
    }

    fn handle(&mut self, result: JobResult, events: &mut Vec<HighlightEvent>) {
        if self.in_flight.as_ref().is_some_and(|job| job.id == result.id) {
            self.in_flight = None;
        }
        trace!(
            language = self.language,
            job = result.id,
            elapsed_us = result.elapsed.as_micros() as u64,
            "parse job finished"
        );

        if result.epoch != self.epoch {
            self.stale_results += 1;
            debug!(job = result.id, "discarding result from before reload");
        } else {
            match result.outcome {
                Err(SyntaxError::Timeout) => {
                    warn!(language = self.language, "parse timed out, highlighting disabled");
                    self.disabled = true;
                    self.pending = None;
                    self.doc.take_edits();
                    events.push(HighlightEvent::TimedOut);
                }
                Err(e) => {
                    debug!(error = %e, "parse job failed");
                    if matches!(e, SyntaxError::Disabled) {
                        self.disabled = true;
                        self.pending = None;
                    }
                }
                Ok(output) if result.fingerprint != self.doc.snapshot.fingerprint() => {
                    self.stale_results += 1;
                    // The edits queued since dispatch lead from the job's
                    // content to the current one.
                    let changed: Vec<Range<usize>> = output
                        .changed
                        .into_iter()
                        .map(|range| {
                            self.doc
                                .pending_edits
                                .iter()
                                .fold(range, |range, edit| edit.map_range(range))
                        })
                        .collect();
                    self.scheduler.invalidate_bytes(&mut self.doc.index, &changed);
                    debug!(job = result.id, "discarding stale result");
                }
                Ok(output) => {
                    self.scheduler
                        .invalidate_bytes(&mut self.doc.index, &output.changed);
                    if let Some(target) = result.target {
                        let key = self.cache_key();
                        let update =
                            self.scheduler
                                .apply(key, &self.doc.snapshot, target, output.ranges);
                        if let Some(map) = output.char_map {
                            self.scheduler.cache_mut().offer_char_map(&key, map);
                        }
                        events.push(HighlightEvent::Updated(update));
                    }
                }
            }
        }

        if self.in_flight.is_none() {
            match self.pending.take() {
                Some(request) => self.dispatch(request),
                None => {
                    // Lines invalidated by this result may be on screen
                    if let Some(window) = self.scheduler.last_viewport() {
                        match self.serve_cached(window.clone()) {
                            Some(update) => events.push(HighlightEvent::Updated(update)),
                            None => self.dispatch(Request::Viewport(window)),
                        }
                    }
                }
            }
        }
    }

    // ==================== Dispatch ====================

    fn request(&mut self, request: Request) {
        if self.in_flight.is_some() {
            self.pending = Some(request);
        } else {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: Request) {
        if self.disabled {
            return;
        }
        let target = match request {
            Request::Parse => None,
            Request::Edit(window) => self.scheduler.target(&mut self.doc.index, window),
            Request::Viewport(window) => self.scheduler.stale_target(&mut self.doc.index, window),
        };
        if target.is_none() && self.doc.pending_edits.is_empty() && !self.needs_reset {
            return;
        }

        self.next_job += 1;
        let job = Job {
            id: self.next_job,
            epoch: self.epoch,
            snapshot: self.doc.snapshot.clone(),
            edits: self.doc.take_edits(),
            reset: std::mem::take(&mut self.needs_reset),
            target,
            project: self
                .config
                .project_chars_on_worker
                .then_some(self.config.char_encoding),
        };
        trace!(
            job = job.id,
            edits = job.edits.len(),
            lines = ?job.target.as_ref().map(|t| t.lines.clone()),
            "dispatching parse job"
        );

        let in_flight = InFlight {
            id: job.id,
            fingerprint: job.snapshot.fingerprint(),
        };
        if self.commands.send(Command::Parse(job)).is_err() {
            self.worker_gone();
            return;
        }
        self.in_flight = Some(in_flight);
    }

    fn worker_gone(&mut self) {
        warn!("parse worker is gone, highlighting disabled");
        self.disabled = true;
        self.in_flight = None;
        self.pending = None;
    }
}

impl Drop for BackgroundSession {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            // Bounded by the parse timeout
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for BackgroundSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundSession")
            .field("language", &self.language)
            .field("snapshot", &self.doc.snapshot)
            .field("epoch", &self.epoch)
            .field("busy", &self.in_flight.is_some())
            .field("pending", &self.pending)
            .field("disabled", &self.disabled)
            .finish()
    }
}
