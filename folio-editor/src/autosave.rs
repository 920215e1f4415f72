//! Coalescing autosave.
//!
//! A single tokio task owns one slot per page:
//!
//! - every mutation replaces the slot's pending payload and restarts its
//!   quiet-window deadline;
//! - when the deadline passes the payload becomes *ready* and is sent, unless
//!   a request for that page is still in flight, in which case it is sent as
//!   soon as that request settles;
//! - failed saves are reported through the [`Notifier`]; nothing is rolled
//!   back and the next payload carries the full scene again.
//!
//! At most one `update_page` request per page is in flight at any time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use folio_core::{CoreResult, Page, PageId, PagePatch, PageStore};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::notify::Notifier;
use crate::runtime::{MutationObserver, SceneChange};

enum Command {
    Mutation(SceneChange),
    Flush(PageId, oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Default)]
struct Slot {
    pending: Option<SceneChange>,
    /// `None` with a pending payload means ready to send.
    deadline: Option<Instant>,
    in_flight: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.pending.is_none() && !self.in_flight
    }

    fn is_ready(&self) -> bool {
        self.pending.is_some() && self.deadline.is_none()
    }
}

/// Spawns the autosave task.
pub struct Autosave;

impl Autosave {
    /// Start an autosave task persisting to `store` after `quiet` of
    /// inactivity per page. Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<dyn PageStore>, quiet: Duration, notifier: Notifier) -> AutosaveHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            store,
            quiet,
            notifier,
            slots: HashMap::new(),
            done_tx,
            shutdown: Vec::new(),
            accepting: true,
        };
        tokio::spawn(worker.run(rx, done_rx));
        tracing::debug!("Autosave started (quiet window {quiet:?})");
        AutosaveHandle { tx }
    }
}

/// Sends mutations and control requests to the autosave task.
#[derive(Clone)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl AutosaveHandle {
    /// Send any pending payload for `page` now and wait until the page has
    /// nothing pending or in flight.
    pub async fn flush(&self, page: PageId) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Flush(page, reply)).is_ok() {
            let _ = done.await;
        }
    }

    /// Flush every page, wait for all requests to settle, and stop the task.
    /// Mutations sent afterwards are dropped with a warning.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Shutdown(reply)).is_ok() {
            let _ = done.await;
        }
    }

    /// Whether the task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl MutationObserver for AutosaveHandle {
    fn on_mutation(&self, change: SceneChange) {
        if self.tx.send(Command::Mutation(change)).is_err() {
            tracing::warn!("Autosave is not running; edit was not queued");
        }
    }
}

struct Worker {
    store: Arc<dyn PageStore>,
    quiet: Duration,
    notifier: Notifier,
    slots: HashMap<PageId, Slot>,
    done_tx: mpsc::UnboundedSender<(PageId, CoreResult<Page>)>,
    shutdown: Vec<oneshot::Sender<()>>,
    accepting: bool,
}

impl Worker {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Command>,
        mut done_rx: mpsc::UnboundedReceiver<(PageId, CoreResult<Page>)>,
    ) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                cmd = rx.recv(), if self.accepting => match cmd {
                    Some(cmd) => self.handle(cmd),
                    // Every handle dropped: drain what is left.
                    None => self.begin_shutdown(None),
                },
                Some((page, result)) = done_rx.recv() => self.settle(page, result),
                () = sleep_until(deadline) => self.fire_due(Instant::now()),
            }

            if !self.accepting && self.slots.values().all(Slot::is_idle) {
                break;
            }
        }

        rx.close();
        for reply in self.shutdown.drain(..) {
            let _ = reply.send(());
        }
        tracing::debug!("Autosave stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Mutation(change) => {
                let page = change.page_id;
                let slot = self.slots.entry(page).or_default();
                slot.pending = Some(change);
                slot.deadline = Some(Instant::now() + self.quiet);
                tracing::trace!("Queued autosave for page {page}");
            }
            Command::Flush(page, reply) => {
                match self.slots.get_mut(&page) {
                    Some(slot) if !slot.is_idle() => {
                        slot.waiters.push(reply);
                        if slot.pending.is_some() {
                            slot.deadline = None;
                        }
                    }
                    _ => {
                        let _ = reply.send(());
                        return;
                    }
                }
                self.dispatch_if_ready(page);
            }
            Command::Shutdown(reply) => self.begin_shutdown(Some(reply)),
        }
    }

    fn begin_shutdown(&mut self, reply: Option<oneshot::Sender<()>>) {
        self.accepting = false;
        self.shutdown.extend(reply);
        let pages: Vec<PageId> = self.slots.keys().copied().collect();
        for page in pages {
            if let Some(slot) = self.slots.get_mut(&page) {
                if slot.pending.is_some() {
                    slot.deadline = None;
                }
            }
            self.dispatch_if_ready(page);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().filter_map(|s| s.deadline).min()
    }

    fn fire_due(&mut self, now: Instant) {
        let due: Vec<PageId> = self
            .slots
            .iter()
            .filter(|(_, s)| s.deadline.is_some_and(|d| d <= now))
            .map(|(page, _)| *page)
            .collect();
        for page in due {
            if let Some(slot) = self.slots.get_mut(&page) {
                slot.deadline = None;
            }
            self.dispatch_if_ready(page);
        }
    }

    /// Send the slot's payload if it is ready and nothing is in flight.
    fn dispatch_if_ready(&mut self, page: PageId) {
        let Some(slot) = self.slots.get_mut(&page) else {
            return;
        };
        if slot.in_flight || !slot.is_ready() {
            return;
        }
        let Some(change) = slot.pending.take() else {
            return;
        };
        slot.in_flight = true;

        let store = Arc::clone(&self.store);
        let done_tx = self.done_tx.clone();
        tracing::debug!("Saving page {page} ({}x{})", change.width, change.height);
        tokio::spawn(async move {
            let patch = PagePatch::scene(change.scene, change.width, change.height);
            let result = store.update_page(page, patch).await;
            let _ = done_tx.send((page, result));
        });
    }

    fn settle(&mut self, page: PageId, result: CoreResult<Page>) {
        match result {
            Ok(saved) => tracing::debug!("Saved page {} (position {})", saved.id, saved.position),
            Err(e) => {
                tracing::warn!("Autosave of page {page} failed: {e}");
                self.notifier
                    .error(format!("Could not save your latest changes: {e}"));
            }
        }

        let Some(slot) = self.slots.get_mut(&page) else {
            return;
        };
        slot.in_flight = false;
        self.dispatch_if_ready(page);

        if let Some(slot) = self.slots.get_mut(&page) {
            if slot.is_idle() {
                for waiter in slot.waiters.drain(..) {
                    let _ = waiter.send(());
                }
                self.slots.remove(&page);
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
