//! Shared fixtures: a scripted transport, an instrumented cache and a
//! recording error tracker.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use sluice_cache::{
    CacheEditor, CacheEntry, DiskCache, DiskCacheOptions, KeyLockRegistry, LruDiskCache,
};
use sluice_fetch::{
    Configuration, DownloadError, DownloadRequest, Downloader, ErrorCause, ErrorTracker, Transport,
    TransportError, TransportErrorKind, TransportResponse,
};
use tempfile::TempDir;

pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// One step of a scripted response body.
#[derive(Clone)]
pub enum Step {
    Data(Vec<u8>),
    Fail(io::ErrorKind),
    Sleep(Duration),
    Call(Hook),
}

#[derive(Clone)]
pub struct ScriptedResponse {
    status: Result<u16, String>,
    content_length: Option<u64>,
    chunked: bool,
    steps: Vec<Step>,
}

impl ScriptedResponse {
    /// `200 OK` with an exact length, delivered in one chunk.
    pub fn ok(body: &[u8]) -> Self {
        Self::ok_in_chunks(body, body.len().max(1))
    }

    pub fn ok_in_chunks(body: &[u8], chunk_size: usize) -> Self {
        Self {
            status: Ok(200),
            content_length: Some(body.len() as u64),
            chunked: false,
            steps: body.chunks(chunk_size).map(|c| Step::Data(c.to_vec())).collect(),
        }
    }

    /// `200 OK` with chunked transfer and no declared length.
    pub fn chunked(body: &[u8], chunk_size: usize) -> Self {
        Self {
            content_length: None,
            chunked: true,
            ..Self::ok_in_chunks(body, chunk_size)
        }
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status = Ok(code);
        self
    }

    pub fn broken_status(mut self, message: &str) -> Self {
        self.status = Err(message.to_owned());
        self
    }

    pub fn content_length(mut self, length: Option<u64>) -> Self {
        self.content_length = length;
        self
    }

    pub fn not_chunked(mut self) -> Self {
        self.chunked = false;
        self
    }

    /// Inserts `step` before every data chunk.
    pub fn before_each_chunk(mut self, step: Step) -> Self {
        self.steps = self
            .steps
            .into_iter()
            .flat_map(|s| match s {
                Step::Data(_) => vec![step.clone(), s],
                other => vec![other],
            })
            .collect();
        self
    }

    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn first(mut self, step: Step) -> Self {
        self.steps.insert(0, step);
        self
    }
}

pub enum Outcome {
    Respond(ScriptedResponse),
    Fail(TransportError),
}

/// Transport that replays queued outcomes, falling back to a fixed one.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Outcome>>,
    fallback: Mutex<Option<ScriptedResponse>>,
    max_retry_count: u32,
    opens: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(max_retry_count: u32) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            max_retry_count,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, outcome: Outcome) {
        self.queue.lock().push_back(outcome);
    }

    pub fn respond(&self, response: ScriptedResponse) {
        self.push(Outcome::Respond(response));
    }

    pub fn fail(&self, error: TransportError) {
        self.push(Outcome::Fail(error));
    }

    /// Served whenever the queue is empty.
    pub fn always(&self, response: ScriptedResponse) {
        *self.fallback.lock() = Some(response);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, _uri: &str) -> Result<Box<dyn TransportResponse>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .queue
            .lock()
            .pop_front()
            .or_else(|| self.fallback.lock().clone().map(Outcome::Respond));

        match outcome {
            Some(Outcome::Respond(response)) => Ok(Box::new(OpenResponse {
                script: response.clone(),
                body: Some(ScriptedBody {
                    steps: response.steps.into(),
                    current: Cursor::new(Vec::new()),
                }),
            })),
            Some(Outcome::Fail(error)) => Err(error),
            None => Err(TransportError::connect("no scripted outcome left")),
        }
    }

    fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    fn is_retryable(&self, error: &TransportError) -> bool {
        matches!(error.kind(), TransportErrorKind::Timeout | TransportErrorKind::Interrupted)
    }
}

struct OpenResponse {
    script: ScriptedResponse,
    body: Option<ScriptedBody>,
}

impl TransportResponse for OpenResponse {
    fn status_code(&self) -> Result<u16, TransportError> {
        self.script.status.clone().map_err(TransportError::protocol)
    }

    fn content_length(&self) -> Option<u64> {
        self.script.content_length
    }

    fn is_chunked(&self) -> bool {
        self.script.chunked
    }

    fn headers_string(&self) -> String {
        format!(
            "[Content-Length: {:?}; chunked: {}]",
            self.script.content_length, self.script.chunked
        )
    }

    fn body(&mut self) -> Result<Box<dyn Read + Send>, TransportError> {
        self.body
            .take()
            .map(|body| Box::new(body) as Box<dyn Read + Send>)
            .ok_or_else(|| TransportError::protocol("body already taken"))
    }

    fn release(&mut self) {
        self.body = None;
    }
}

struct ScriptedBody {
    steps: VecDeque<Step>,
    current: Cursor<Vec<u8>>,
}

impl Read for ScriptedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let read = self.current.read(buf)?;
            if read > 0 {
                return Ok(read);
            }
            match self.steps.pop_front() {
                None => return Ok(0),
                Some(Step::Data(data)) => self.current = Cursor::new(data),
                Some(Step::Fail(kind)) => return Err(io::Error::new(kind, "scripted failure")),
                Some(Step::Sleep(duration)) => thread::sleep(duration),
                Some(Step::Call(hook)) => hook(),
            }
        }
    }
}

/// [`LruDiskCache`] that counts store access and can hide its entries.
pub struct CountingCache {
    pub inner: LruDiskCache,
    gets: AtomicUsize,
    edits: AtomicUsize,
    open_edits: Arc<AtomicUsize>,
    max_open: AtomicUsize,
    hide: AtomicBool,
}

impl CountingCache {
    pub fn new(inner: LruDiskCache) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            edits: AtomicUsize::new(0),
            open_edits: Arc::new(AtomicUsize::new(0)),
            max_open: AtomicUsize::new(0),
            hide: AtomicBool::new(false),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn edits(&self) -> usize {
        self.edits.load(Ordering::SeqCst)
    }

    /// Highest number of editors that were open at the same time.
    pub fn max_open_editors(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    /// While set, lookups miss even for committed entries.
    pub fn hide_entries(&self, hide: bool) {
        self.hide.store(hide, Ordering::SeqCst);
    }

    /// Commits `data` for `key` outside of any download.
    pub fn seed(&self, key: &str, data: &[u8]) {
        let mut editor = self.inner.edit(key).unwrap();
        editor.write_all(data).unwrap();
        editor.commit().unwrap();
    }

    pub fn read(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).map(|entry| entry.read_all().unwrap())
    }
}

impl DiskCache for CountingCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.hide.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.get(key)
    }

    fn edit(&self, key: &str) -> sluice_cache::Result<Box<dyn CacheEditor>> {
        self.edits.fetch_add(1, Ordering::SeqCst);
        let open = self.open_edits.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(open, Ordering::SeqCst);
        match self.inner.edit(key) {
            Ok(editor) => Ok(Box::new(TrackedEditor {
                editor: Some(editor),
                open: Arc::clone(&self.open_edits),
            })),
            Err(err) => {
                self.open_edits.fetch_sub(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    fn remove(&self, key: &str) -> sluice_cache::Result<bool> {
        self.inner.remove(key)
    }

    fn clear(&self) -> sluice_cache::Result<()> {
        self.inner.clear()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn max_size(&self) -> u64 {
        self.inner.max_size()
    }

    fn close(&self) {
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

struct TrackedEditor {
    editor: Option<Box<dyn CacheEditor>>,
    open: Arc<AtomicUsize>,
}

impl TrackedEditor {
    fn editor(&mut self) -> io::Result<&mut Box<dyn CacheEditor>> {
        self.editor.as_mut().ok_or_else(|| io::Error::other("editor finished"))
    }
}

impl io::Write for TrackedEditor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.editor()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.editor()?.flush()
    }
}

impl CacheEditor for TrackedEditor {
    fn key(&self) -> &str {
        self.editor.as_ref().map_or("", |e| e.key())
    }

    fn commit(mut self: Box<Self>) -> sluice_cache::Result<()> {
        match self.editor.take() {
            Some(editor) => editor.commit(),
            None => Ok(()),
        }
    }

    fn abort(mut self: Box<Self>) {
        if let Some(editor) = self.editor.take() {
            editor.abort();
        }
    }
}

impl Drop for TrackedEditor {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Records the cause of every reported failure.
#[derive(Default)]
pub struct RecordingTracker {
    causes: Mutex<Vec<ErrorCause>>,
}

impl RecordingTracker {
    pub fn causes(&self) -> Vec<ErrorCause> {
        self.causes.lock().clone()
    }
}

impl ErrorTracker for RecordingTracker {
    fn on_download_error(&self, _request: &DownloadRequest, error: &DownloadError) {
        self.causes.lock().push(error.cause());
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub cache: Arc<CountingCache>,
    pub transport: Arc<ScriptedTransport>,
    pub tracker: Arc<RecordingTracker>,
    pub downloader: Downloader,
}

impl Harness {
    pub fn new(max_retry_count: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(KeyLockRegistry::new());
        let options = DiskCacheOptions::new(dir.path().join("cache")).locks(Arc::clone(&locks));
        let cache = Arc::new(CountingCache::new(LruDiskCache::open(options).unwrap()));
        let transport = Arc::new(ScriptedTransport::new(max_retry_count));
        let tracker = Arc::new(RecordingTracker::default());

        let config = Configuration::builder(cache.clone(), transport.clone())
            .error_tracker(tracker.clone())
            .locks(locks)
            .build();

        Self {
            dir,
            cache,
            transport,
            tracker,
            downloader: Downloader::new(Arc::new(config)),
        }
    }

    pub fn config(&self) -> &Arc<Configuration> {
        self.downloader.config()
    }
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
