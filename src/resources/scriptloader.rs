//! Deferred script loader.
//!
//! Scripts requested before the engine finished loading are buffered. When the
//! engine enters its loading phase, [`ScriptLoader::flush_pending`] injects
//! the buffered scripts and counts them. Every completion decrements the
//! counter; scripts requested while the flush is running (for example by a
//! script that requests more scripts) are folded into the same counter. When
//! the counter reaches zero the loader reports it once, and the engine
//! continues its startup.
//!
//! Scripts always execute in the order they were injected, whatever order
//! their fetches finish in.
//!
//! The loader only keeps the books. Running the sources is done by
//! [`update_script_loads`](crate::systems::scripts::update_script_loads).

use bevy_ecs::prelude::*;
use log::{debug, info};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::resources::enginestate::EngineState;
use crate::resources::scriptfetch::{ScriptFetcher, ScriptTicket};

/// Called once the script it was given with has executed.
pub type ScriptCallback = Box<dyn FnOnce(&mut Commands) + Send + Sync>;

struct ScriptRequest {
    src: String,
    on_load: Option<ScriptCallback>,
}

struct InFlightScript {
    ticket: ScriptTicket,
    src: String,
    on_load: Option<ScriptCallback>,
    /// Part of the startup flush counter.
    counted: bool,
}

/// A script whose source arrived and is next in line to execute.
pub struct ReadyScript {
    ticket: ScriptTicket,
    src: String,
    source: Result<String, String>,
    on_load: Option<ScriptCallback>,
    counted: bool,
}

impl ReadyScript {
    pub fn ticket(&self) -> ScriptTicket {
        self.ticket
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    /// Source text, or the reason it could not be fetched.
    pub fn source(&self) -> Result<&str, &str> {
        self.source.as_deref().map_err(|e| e.as_str())
    }
}

#[derive(Resource)]
pub struct ScriptLoader {
    pending: Vec<ScriptRequest>,
    in_flight: VecDeque<InFlightScript>,
    arrived: FxHashMap<ScriptTicket, Result<String, String>>,
    remaining: usize,
    flushing: bool,
    next_ticket: u64,
    fetcher: ScriptFetcher,
}

impl ScriptLoader {
    pub fn new(fetcher: ScriptFetcher) -> Self {
        ScriptLoader {
            pending: Vec::new(),
            in_flight: VecDeque::new(),
            arrived: FxHashMap::default(),
            remaining: 0,
            flushing: false,
            next_ticket: 1,
            fetcher,
        }
    }

    /// Loader reading scripts under `root` synchronously.
    pub fn inline(root: impl Into<PathBuf>) -> Self {
        Self::new(ScriptFetcher::inline(root))
    }

    /// Loader reading scripts under `root` on a background thread.
    pub fn threaded(root: impl Into<PathBuf>) -> Self {
        Self::new(ScriptFetcher::threaded(root))
    }

    /// Loader serving scripts from memory.
    pub fn embedded<I, K, V>(sources: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(ScriptFetcher::embedded(sources))
    }

    /// Request a script.
    ///
    /// Buffered until the engine is loaded; injected right away afterwards.
    pub fn load_script(
        &mut self,
        src: impl Into<String>,
        on_load: Option<ScriptCallback>,
        engine: &EngineState,
    ) {
        let request = ScriptRequest {
            src: src.into(),
            on_load,
        };
        if engine.is_loaded() {
            self.inject(request, false);
        } else {
            debug!("Deferring script {}", request.src);
            self.pending.push(request);
        }
    }

    /// Inject every buffered script under the startup counter.
    ///
    /// Returns `false` when there is nothing to wait for, in which case the
    /// caller continues the startup itself.
    pub fn flush_pending(&mut self) -> bool {
        if self.pending.is_empty() {
            return self.flushing;
        }
        self.flushing = true;
        self.fold_pending();
        true
    }

    fn fold_pending(&mut self) {
        let requests = std::mem::take(&mut self.pending);
        self.remaining += requests.len();
        info!(
            "Loading {} deferred script(s), {} outstanding",
            requests.len(),
            self.remaining
        );
        for request in requests {
            self.inject(request, true);
        }
    }

    fn inject(&mut self, request: ScriptRequest, counted: bool) {
        let ticket = ScriptTicket(self.next_ticket);
        self.next_ticket += 1;
        debug!("Injecting script {} ({:?})", request.src, ticket);
        self.fetcher.request(ticket, &request.src);
        self.in_flight.push_back(InFlightScript {
            ticket,
            src: request.src,
            on_load: request.on_load,
            counted,
        });
    }

    fn collect_arrivals(&mut self) {
        for result in self.fetcher.poll() {
            self.arrived.insert(result.ticket, result.source);
        }
    }

    /// Next script to execute, if its source is back.
    ///
    /// Only the oldest injected script is ever returned; later scripts wait
    /// behind it even if their sources arrived first.
    pub fn next_ready(&mut self) -> Option<ReadyScript> {
        self.collect_arrivals();
        let ticket = self.in_flight.front()?.ticket;
        let source = self.arrived.remove(&ticket)?;
        let script = self.in_flight.pop_front()?;
        Some(ReadyScript {
            ticket,
            src: script.src,
            source,
            on_load: script.on_load,
            counted: script.counted,
        })
    }

    /// Mark `script` as executed: run its callback and update the startup
    /// counter.
    ///
    /// Returns `true` exactly once per flush, when the last counted script
    /// completes.
    pub fn complete(&mut self, script: ReadyScript, commands: &mut Commands) -> bool {
        if let Some(on_load) = script.on_load {
            on_load(commands);
        }
        if !script.counted {
            return false;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if !self.pending.is_empty() {
            self.fold_pending();
        }
        if self.remaining == 0 && self.flushing {
            self.flushing = false;
            self.pending.clear();
            return true;
        }
        false
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Startup scripts still to complete.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub fn shutdown(&mut self) {
        self.fetcher.shutdown();
    }
}

/// Stop the background fetch thread of the world's script loader, if any.
pub fn shutdown_script_fetcher(world: &mut World) {
    if let Some(mut loader) = world.get_resource_mut::<ScriptLoader>() {
        loader.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::enginestate::EnginePhases;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn not_loaded() -> EngineState {
        let mut engine = EngineState::new();
        engine.set(EnginePhases::Loading);
        engine
    }

    fn loaded() -> EngineState {
        let mut engine = EngineState::new();
        engine.set(EnginePhases::Loaded);
        engine
    }

    fn loader() -> ScriptLoader {
        ScriptLoader::embedded([("a.lua", "a"), ("b.lua", "b"), ("c.lua", "c")])
    }

    #[test]
    fn test_requests_buffer_until_loaded() {
        let mut loader = loader();
        loader.load_script("a.lua", None, &EngineState::new());
        loader.load_script("b.lua", None, &not_loaded());
        assert_eq!(loader.pending_len(), 2);
        assert_eq!(loader.in_flight_len(), 0);

        loader.load_script("c.lua", None, &loaded());
        assert_eq!(loader.pending_len(), 2);
        assert_eq!(loader.in_flight_len(), 1);
    }

    #[test]
    fn test_flush_with_nothing_pending() {
        let mut loader = loader();
        assert!(!loader.flush_pending());
        assert!(!loader.is_flushing());
    }

    #[test]
    fn test_flush_signals_once_after_all_complete() {
        let mut world = World::new();
        let mut commands = world.commands();
        let mut loader = loader();
        let engine = not_loaded();
        for _ in 0..3 {
            loader.load_script("a.lua", None, &engine);
        }

        assert!(loader.flush_pending());
        assert_eq!(loader.remaining(), 3);

        let mut signals = 0;
        let mut executed = 0;
        while let Some(script) = loader.next_ready() {
            executed += 1;
            if executed == 1 {
                // the first script asks for one more while the flush runs
                loader.load_script("b.lua", None, &engine);
            }
            if loader.complete(script, &mut commands) {
                signals += 1;
            }
        }

        assert_eq!(executed, 4);
        assert_eq!(signals, 1);
        assert_eq!(loader.remaining(), 0);
        assert_eq!(loader.pending_len(), 0);
        assert!(!loader.is_flushing());
    }

    #[test]
    fn test_callbacks_run_on_completion() {
        let mut world = World::new();
        let mut commands = world.commands();
        let mut loader = loader();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        loader.load_script(
            "a.lua",
            Some(Box::new(move |_commands: &mut Commands| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            &not_loaded(),
        );
        loader.flush_pending();

        let script = loader.next_ready().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(loader.complete(script, &mut commands));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_execution_follows_injection_order() {
        let mut loader = loader();
        let engine = loaded();
        loader.load_script("a.lua", None, &engine);
        loader.load_script("b.lua", None, &engine);

        // b's source is back, a's is not yet
        loader.collect_arrivals();
        let first = loader.arrived.remove(&ScriptTicket(1)).unwrap();
        assert!(loader.next_ready().is_none());

        loader.arrived.insert(ScriptTicket(1), first);
        assert_eq!(loader.next_ready().unwrap().src(), "a.lua");
        assert_eq!(loader.next_ready().unwrap().src(), "b.lua");
        assert!(loader.next_ready().is_none());
    }

    #[test]
    fn test_failed_fetch_still_completes() {
        let mut world = World::new();
        let mut commands = world.commands();
        let mut loader = loader();
        loader.load_script("missing.lua", None, &not_loaded());
        loader.flush_pending();

        let script = loader.next_ready().unwrap();
        assert!(script.source().is_err());
        assert!(loader.complete(script, &mut commands));
    }

    #[test]
    fn test_direct_loads_do_not_signal() {
        let mut world = World::new();
        let mut commands = world.commands();
        let mut loader = loader();
        loader.load_script("a.lua", None, &loaded());
        let script = loader.next_ready().unwrap();
        assert!(!loader.complete(script, &mut commands));
    }

    #[test]
    fn test_stopped_fetch_thread_does_not_stall_flush() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.lua"), "x = 1").unwrap();
        let mut world = World::new();
        let mut commands = world.commands();
        let mut loader = ScriptLoader::threaded(dir.path());
        loader.shutdown();

        loader.load_script("x.lua", None, &not_loaded());
        loader.load_script("x.lua", None, &not_loaded());
        assert!(loader.flush_pending());

        let first = loader.next_ready().unwrap();
        assert!(first.source().is_err());
        assert!(!loader.complete(first, &mut commands));
        let second = loader.next_ready().unwrap();
        assert!(loader.complete(second, &mut commands));
        assert_eq!(loader.in_flight_len(), 0);
    }
}
