//! In-memory upload service for tests.
//!
//! Contexts are immutable snapshots of a block's accepted bytes, so a
//! stale context can still be appended to, just like the real service
//! until it evicts it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use blockput_protocol::{CONTEXT_SEPARATOR, ChunkReply, CommitReply, STATUS_INVALID_CONTEXT};
use blockput_transport::{PostFuture, Response, Transport};
use bytes::Bytes;
use serde_json::json;

/// Failure injected for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Status(u16),
    /// Accept the chunk but report a wrong crc32.
    CorruptCrc,
    InvalidContext,
}

type FaultFn = Box<dyn Fn(&str, &[u8], usize) -> Option<Fault> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Commit {
    pub path: String,
    pub body: String,
    pub object: Vec<u8>,
}

struct Block {
    size: u64,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_ctx: usize,
    contexts: HashMap<String, Block>,
    calls: Vec<String>,
    commits: Vec<Commit>,
}

pub struct MockService {
    state: Mutex<State>,
    fault: Option<FaultFn>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fault: None,
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// `f(path, body, call_index)` decides whether a call fails.
    pub fn with_fault(
        mut self,
        f: impl Fn(&str, &[u8], usize) -> Option<Fault> + Send + Sync + 'static,
    ) -> Self {
        self.fault = Some(Box::new(f));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every path posted so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of `mkblk` and `bput` calls.
    pub fn chunk_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|p| p.starts_with("/mkblk/") || p.starts_with("/bput/"))
            .count()
    }

    pub fn commits(&self) -> Vec<Commit> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn handle(&self, path: String, body: Bytes) -> Response {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let resp = self.respond(&path, &body);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        resp
    }

    fn respond(&self, path: &str, body: &[u8]) -> Response {
        let mut state = self.state.lock().unwrap();
        let index = state.calls.len();
        state.calls.push(path.to_string());

        let fault = self.fault.as_ref().and_then(|f| f(path, body, index));
        match fault {
            Some(Fault::Status(code)) => return error(code, "injected failure"),
            Some(Fault::InvalidContext) => return error(STATUS_INVALID_CONTEXT, "invalid context"),
            _ => {}
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["mkblk", size] => {
                let Ok(size) = size.parse::<u64>() else {
                    return error(400, "bad block size");
                };
                if body.len() as u64 > size {
                    return error(400, "chunk larger than block");
                }
                let reply = state.issue(size, body.to_vec(), body);
                chunk_reply(reply, fault)
            }
            ["bput", ctx, offset] => {
                let Some(block) = state.contexts.get(*ctx) else {
                    return error(STATUS_INVALID_CONTEXT, "invalid context");
                };
                if offset.parse::<u64>().ok() != Some(block.data.len() as u64) {
                    return error(400, "offset mismatch");
                }
                if (block.data.len() + body.len()) as u64 > block.size {
                    return error(400, "chunk overruns block");
                }
                let size = block.size;
                let mut data = block.data.clone();
                data.extend_from_slice(body);
                let reply = state.issue(size, data, body);
                chunk_reply(reply, fault)
            }
            ["rs-mkfile", _entry, "fsize", fsize, ..] => {
                let body = String::from_utf8_lossy(body).into_owned();
                let mut object = Vec::new();
                if !body.is_empty() {
                    for ctx in body.split(CONTEXT_SEPARATOR) {
                        match state.contexts.get(ctx) {
                            Some(block) if block.data.len() as u64 == block.size => {
                                object.extend_from_slice(&block.data)
                            }
                            Some(_) => return error(400, "incomplete block"),
                            None => return error(STATUS_INVALID_CONTEXT, "invalid context"),
                        }
                    }
                }
                if fsize.parse::<u64>().ok() != Some(object.len() as u64) {
                    return error(400, "size mismatch");
                }
                let hash = format!("hash-{:08x}", crc32fast::hash(&object));
                state.commits.push(Commit {
                    path: path.to_string(),
                    body,
                    object,
                });
                let reply = CommitReply {
                    hash,
                    key: String::new(),
                };
                Response::json(200, serde_json::to_vec(&reply).unwrap())
            }
            _ => error(404, "no such endpoint"),
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Stores a new snapshot; the reply's crc32 covers `chunk` only.
    fn issue(&mut self, size: u64, data: Vec<u8>, chunk: &[u8]) -> ChunkReply {
        self.next_ctx += 1;
        let ctx = format!("ctx-{}", self.next_ctx);
        let reply = ChunkReply {
            ctx: ctx.clone(),
            checksum: format!("sum-{}", self.next_ctx),
            crc32: crc32fast::hash(chunk),
            offset: data.len() as u64,
            host: String::new(),
        };
        self.contexts.insert(ctx, Block { size, data });
        reply
    }
}

fn chunk_reply(mut reply: ChunkReply, fault: Option<Fault>) -> Response {
    if fault == Some(Fault::CorruptCrc) {
        reply.crc32 ^= 0xffff_ffff;
    }
    Response::json(200, serde_json::to_vec(&reply).unwrap())
}

fn error(status: u16, message: &str) -> Response {
    Response::json(status, json!({ "error": message }).to_string())
}

impl Transport for MockService {
    fn post<'a>(&'a self, path: &'a str, _content_type: &'a str, body: Bytes) -> PostFuture<'a> {
        Box::pin(async move { Ok(self.handle(path.to_string(), body).await) })
    }
}

/// `size` bytes where every byte of block `i` is `i + 1`.
pub fn patterned(size: u64, block_size: u64) -> Vec<u8> {
    (0..size).map(|i| ((i / block_size) as u8).wrapping_add(1)).collect()
}
