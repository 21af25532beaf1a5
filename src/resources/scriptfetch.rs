//! Script source fetching.
//!
//! A [`ScriptFetcher`] turns a script path into its source text. Fetches are
//! identified by a [`ScriptTicket`] and reported back through
//! [`ScriptFetcher::poll`] in whatever order they finish; putting them back in
//! request order is the job of
//! [`ScriptLoader`](crate::resources::scriptloader::ScriptLoader).
//!
//! The threaded variant reads files on a background thread and talks to the
//! main thread over `crossbeam-channel`.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crate::helpers::is_url;

/// Identifies one script load from request to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptTicket(pub u64);

/// Commands sent to the fetch thread.
#[derive(Debug, Clone)]
pub enum FetchCmd {
    Fetch { ticket: ScriptTicket, path: PathBuf },
    Shutdown,
}

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub ticket: ScriptTicket,
    pub source: Result<String, String>,
}

/// Channels and join handle of the background fetch thread.
pub struct ScriptFetchBridge {
    tx_cmd: Sender<FetchCmd>,
    rx_msg: Receiver<FetchResult>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptFetchBridge {
    /// Spawn the fetch thread.
    pub fn spawn() -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<FetchCmd>();
        let (tx_msg, rx_msg) = unbounded::<FetchResult>();
        let handle = std::thread::spawn(move || fetch_thread(rx_cmd, tx_msg));
        ScriptFetchBridge {
            tx_cmd,
            rx_msg,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Hand a fetch to the thread. Fails once the thread has stopped.
    pub fn send(&self, ticket: ScriptTicket, path: PathBuf) -> Result<(), String> {
        if !self.is_running() {
            return Err("script fetch thread is stopped".to_string());
        }
        self.tx_cmd
            .send(FetchCmd::Fetch { ticket, path })
            .map_err(|_| "script fetch thread is gone".to_string())
    }

    /// Ask the thread to stop and wait for it.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx_cmd.send(FetchCmd::Shutdown);
            let _ = handle.join();
        }
    }
}

fn fetch_thread(rx_cmd: Receiver<FetchCmd>, tx_msg: Sender<FetchResult>) {
    while let Ok(cmd) = rx_cmd.recv() {
        match cmd {
            FetchCmd::Fetch { ticket, path } => {
                let source = read_source(&path);
                if tx_msg.send(FetchResult { ticket, source }).is_err() {
                    break;
                }
            }
            FetchCmd::Shutdown => break,
        }
    }
    debug!("Script fetch thread stopped");
}

fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Where script sources come from.
pub enum ScriptFetcher {
    /// Read files under `root` synchronously when requested.
    Inline {
        root: PathBuf,
        ready: Vec<FetchResult>,
    },
    /// Read files under `root` on a background thread. Requests the thread
    /// never sees are answered from `ready`.
    Threaded {
        root: PathBuf,
        bridge: ScriptFetchBridge,
        ready: Vec<FetchResult>,
    },
    /// Sources registered in memory, keyed by path.
    Embedded {
        sources: FxHashMap<String, String>,
        ready: Vec<FetchResult>,
    },
}

impl ScriptFetcher {
    pub fn inline(root: impl Into<PathBuf>) -> Self {
        ScriptFetcher::Inline {
            root: root.into(),
            ready: Vec::new(),
        }
    }

    pub fn threaded(root: impl Into<PathBuf>) -> Self {
        ScriptFetcher::Threaded {
            root: root.into(),
            bridge: ScriptFetchBridge::spawn(),
            ready: Vec::new(),
        }
    }

    pub fn embedded<I, K, V>(sources: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ScriptFetcher::Embedded {
            sources: sources
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ready: Vec::new(),
        }
    }

    /// Start fetching `src`. The result shows up in a later [`poll`](Self::poll).
    pub fn request(&mut self, ticket: ScriptTicket, src: &str) {
        if is_url(src) {
            warn!("Remote script sources are not supported: {}", src);
            self.ready_mut().push(FetchResult {
                ticket,
                source: Err(format!("remote source not supported: {}", src)),
            });
            return;
        }

        match self {
            ScriptFetcher::Inline { root, ready } => {
                let source = read_source(&root.join(src));
                ready.push(FetchResult { ticket, source });
            }
            ScriptFetcher::Threaded {
                root,
                bridge,
                ready,
            } => {
                if let Err(e) = bridge.send(ticket, root.join(src)) {
                    warn!("Cannot fetch {}: {}", src, e);
                    ready.push(FetchResult {
                        ticket,
                        source: Err(format!("{}: {}", src, e)),
                    });
                }
            }
            ScriptFetcher::Embedded { sources, ready } => {
                let source = sources
                    .get(src)
                    .cloned()
                    .ok_or_else(|| format!("no embedded script named {}", src));
                ready.push(FetchResult { ticket, source });
            }
        }
    }

    fn ready_mut(&mut self) -> &mut Vec<FetchResult> {
        match self {
            ScriptFetcher::Inline { ready, .. }
            | ScriptFetcher::Threaded { ready, .. }
            | ScriptFetcher::Embedded { ready, .. } => ready,
        }
    }

    /// Collect every fetch finished since the last call.
    pub fn poll(&mut self) -> Vec<FetchResult> {
        let mut results = std::mem::take(self.ready_mut());
        if let ScriptFetcher::Threaded { bridge, .. } = self {
            results.extend(bridge.rx_msg.try_iter());
        }
        results
    }

    /// Stop the background thread, if any.
    pub fn shutdown(&mut self) {
        if let ScriptFetcher::Threaded { bridge, .. } = self {
            bridge.shutdown();
        }
    }
}
