//! Fragment-style router: an ordered route table, a single navigation guard
//! and a location-changed channel feeding a non-cancelling dispatch loop.
//!
//! `navigate` never calls into dispatch directly. It records the new location
//! in [`History`] and enqueues a [`LocationChanged`] signal; [`Router::run`]
//! turns each signal into its own dispatch task. A slow dispatch is never
//! cancelled by a newer one, so both may render and the later one to finish
//! is what remains visible.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio::{
    sync::{mpsc, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

pub const ROOT_PATH: &str = "/";
const SEGMENT_SEPARATOR: char = '/';
const CAPTURE_MARKER: char = ':';

pub type RouteParams = HashMap<String, String>;
pub type RouteHandler = Arc<dyn Fn(RouteParams) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardResult {
    Proceed,
    Cancel,
    RedirectTo(String),
}

#[async_trait]
pub trait NavigationGuard: Send + Sync {
    async fn check(&self, path: &str) -> GuardResult;
}

/// Adapts an async closure into a [`NavigationGuard`].
pub struct FnGuard<F>(pub F);

#[async_trait]
impl<F, Fut> NavigationGuard for FnGuard<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = GuardResult> + Send + 'static,
{
    async fn check(&self, path: &str) -> GuardResult {
        (self.0)(path.to_string()).await
    }
}

#[derive(Clone)]
pub struct RouteEntry {
    pattern: String,
    handler: RouteHandler,
}

impl RouteEntry {
    pub fn new(pattern: impl Into<String>, handler: RouteHandler) -> Self {
        Self {
            pattern: pattern.into(),
            handler,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: RouteParams,
}

/// Selects the route for `path`.
///
/// A pattern equal to `path` wins outright with no params. Otherwise the first
/// entry in registration order with the same segment count whose literal
/// segments all match is chosen; capture segments bind the raw path segment.
pub fn match_route<'a>(routes: &'a [RouteEntry], path: &str) -> Option<RouteMatch<'a>> {
    if let Some(entry) = routes.iter().find(|entry| entry.pattern == path) {
        return Some(RouteMatch {
            entry,
            params: RouteParams::new(),
        });
    }

    let path_segments: Vec<&str> = path.split(SEGMENT_SEPARATOR).collect();
    routes.iter().find_map(|entry| {
        let pattern_segments: Vec<&str> = entry.pattern.split(SEGMENT_SEPARATOR).collect();
        if pattern_segments.len() != path_segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (pattern_segment, path_segment) in pattern_segments.iter().zip(&path_segments) {
            if let Some(name) = pattern_segment.strip_prefix(CAPTURE_MARKER) {
                params.insert(name.to_string(), (*path_segment).to_string());
            } else if pattern_segment != path_segment {
                return None;
            }
        }
        Some(RouteMatch { entry, params })
    })
}

/// Linear history of visited locations with a cursor, like the entries a
/// browser keeps for fragment changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, path: String) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(path);
        self.cursor = self.entries.len() - 1;
    }

    fn replace(&mut self, path: String) {
        match self.entries.get_mut(self.cursor) {
            Some(entry) => *entry = path,
            None => self.push(path),
        }
    }

    fn back(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    fn forward(&mut self) -> Option<&str> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChanged {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Cancelled,
    Redirected(String),
    Handled { pattern: String },
    NotFound,
}

pub struct Router {
    routes: RwLock<Vec<RouteEntry>>,
    guard: RwLock<Option<Arc<dyn NavigationGuard>>>,
    history: Mutex<History>,
    current_route: Mutex<Option<String>>,
    signals: mpsc::UnboundedSender<LocationChanged>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<LocationChanged>>>,
}

impl Router {
    pub fn new() -> Arc<Self> {
        Self::with_history(History::default())
    }

    /// A router whose location is already `path`, as when the client is
    /// opened on a deep link. Nothing is dispatched until [`Router::start`].
    pub fn with_initial_location(path: impl Into<String>) -> Arc<Self> {
        let mut history = History::default();
        history.push(path.into());
        Self::with_history(history)
    }

    fn with_history(history: History) -> Arc<Self> {
        let (signals, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            routes: RwLock::new(Vec::new()),
            guard: RwLock::new(None),
            history: Mutex::new(history),
            current_route: Mutex::new(None),
            signals,
            receiver: Mutex::new(Some(receiver)),
        })
    }

    /// Appends a route. Duplicate patterns are accepted; only the first one
    /// registered can ever match.
    pub async fn register<F, Fut>(&self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(RouteParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: RouteHandler = Arc::new(move |params| handler(params).boxed());
        let entry = RouteEntry::new(pattern, handler);
        debug!(pattern = entry.pattern(), "router: route registered");
        self.routes.write().await.push(entry);
    }

    /// Installs the guard, replacing any previous one.
    pub async fn set_guard(&self, guard: impl NavigationGuard + 'static) {
        *self.guard.write().await = Some(Arc::new(guard));
    }

    pub async fn navigate(&self, path: impl Into<String>, replace: bool) {
        let path = path.into();
        {
            let mut history = self.history.lock().await;
            if history.current() == Some(path.as_str()) {
                debug!(%path, "router: location unchanged; no signal");
                return;
            }
            if replace {
                history.replace(path.clone());
            } else {
                history.push(path.clone());
            }
        }
        debug!(%path, replace, "router: location changed");
        self.signal(path);
    }

    pub async fn back(&self) {
        let path = self.history.lock().await.back().map(str::to_string);
        match path {
            Some(path) => self.signal(path),
            None => debug!("router: already at oldest history entry"),
        }
    }

    pub async fn forward(&self) {
        let path = self.history.lock().await.forward().map(str::to_string);
        match path {
            Some(path) => self.signal(path),
            None => debug!("router: already at newest history entry"),
        }
    }

    /// Re-dispatches the current location without touching history.
    pub async fn reload(&self) {
        let path = self.current_location().await;
        self.signal(path);
    }

    pub async fn current_location(&self) -> String {
        self.history
            .lock()
            .await
            .current()
            .unwrap_or(ROOT_PATH)
            .to_string()
    }

    pub async fn history(&self) -> History {
        self.history.lock().await.clone()
    }

    /// Last path whose handler was invoked.
    pub async fn current_route(&self) -> Option<String> {
        self.current_route.lock().await.clone()
    }

    /// Kicks off the first dispatch: an empty location becomes `/`, an
    /// existing one is dispatched as is.
    pub async fn start(&self) {
        let current = self.history.lock().await.current().map(str::to_string);
        match current {
            Some(path) => self.signal(path),
            None => self.navigate(ROOT_PATH, false).await,
        }
    }

    /// Consumes location-changed signals, spawning one dispatch task per
    /// signal. Only the first caller gets the receiver.
    pub async fn run(self: Arc<Self>) {
        let Some(mut receiver) = self.receiver.lock().await.take() else {
            warn!("router: dispatch loop already running");
            return;
        };

        while let Some(LocationChanged { path }) = receiver.recv().await {
            let router = Arc::clone(&self);
            tokio::spawn(async move {
                router.dispatch(&path).await;
            });
        }
    }

    pub fn spawn_dispatch_loop(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    fn signal(&self, path: String) {
        if self.signals.send(LocationChanged { path }).is_err() {
            warn!("router: dispatch loop is gone; signal dropped");
        }
    }

    pub async fn dispatch(&self, path: &str) -> DispatchOutcome {
        let guard = self.guard.read().await.clone();
        if let Some(guard) = guard {
            match guard.check(path).await {
                GuardResult::Cancel => {
                    info!(%path, "router: navigation cancelled by guard");
                    return DispatchOutcome::Cancelled;
                }
                GuardResult::RedirectTo(target) if target != path => {
                    info!(%path, %target, "router: guard redirect");
                    self.navigate(target.clone(), true).await;
                    return DispatchOutcome::Redirected(target);
                }
                GuardResult::RedirectTo(_) | GuardResult::Proceed => {}
            }
        }

        let matched = {
            let routes = self.routes.read().await;
            match_route(&routes, path).map(|matched| {
                (
                    matched.entry.pattern.clone(),
                    Arc::clone(&matched.entry.handler),
                    matched.params,
                )
            })
        };

        let Some((pattern, handler, params)) = matched else {
            info!(%path, "router: no route matched; redirecting home");
            self.navigate(ROOT_PATH, true).await;
            return DispatchOutcome::NotFound;
        };

        *self.current_route.lock().await = Some(path.to_string());
        debug!(%path, %pattern, ?params, "router: invoking handler");
        handler(params).await;
        DispatchOutcome::Handled { pattern }
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
