// Stream reconciler
//
// One task per mounted dashboard. It issues the bulk snapshot, opens the push
// channel and runs the poll timer concurrently, and folds whatever completes
// into the view-model. Updates carry a version: the snapshot gets the version
// current when it is issued, each push the version at which it is dequeued,
// so a snapshot that lands late cannot clobber a newer pushed field.
//
// Known race: a push the backend produced before it built the snapshot but
// that is dequeued after the snapshot was issued still wins over the
// snapshot. Nothing on the wire orders the two.
//
// Unmounting drops the in-flight futures along with the task, so a completion
// after unmount never reaches the view.

use super::message::{MessageTag, PushMessage};
use super::{DashboardKind, DashboardModel};
use crate::transport::{ChannelEvent, PushChannel, PushReceiver, SnapshotSource};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

type InFlight<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Where the bulk snapshot currently stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Ready,
    Unavailable,
}

/// Health of the push channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Dashboard has no push channel
    Absent,
    Connecting,
    Open,
    /// Channel errored or closed; no further pushes arrive
    Stale,
}

/// Snapshot of a dashboard as seen by the presentation layer
#[derive(Clone, Debug, Serialize)]
pub struct DashboardView<S> {
    pub kind: DashboardKind,
    pub status: LoadStatus,
    pub channel: ChannelStatus,
    /// Version of the latest update folded in
    pub version: u64,
    pub state: S,
}

impl<S> DashboardView<S> {
    pub fn loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// State, once the bulk snapshot has settled
    pub fn ready_state(&self) -> Option<&S> {
        (!self.loading()).then_some(&self.state)
    }
}

/// Collaborators a dashboard talks to
#[derive(Clone)]
pub struct DashboardSources {
    pub snapshots: Arc<dyn SnapshotSource>,
    pub channel: Arc<dyn PushChannel>,
}

#[derive(Clone, Debug)]
pub struct MountOptions {
    pub poll_interval: Duration,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Owner of a mounted dashboard; dropping it unmounts
pub struct DashboardHandle<S> {
    kind: DashboardKind,
    view: watch::Receiver<DashboardView<S>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl<S: Clone> DashboardHandle<S> {
    pub fn kind(&self) -> DashboardKind {
        self.kind
    }

    pub fn view(&self) -> DashboardView<S> {
        self.view.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.view.borrow().loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView<S>> {
        self.view.clone()
    }

    /// Wait until the view satisfies `pred`; `None` once unmounted
    pub async fn wait_for(
        &mut self,
        pred: impl FnMut(&DashboardView<S>) -> bool,
    ) -> Option<DashboardView<S>> {
        self.view.wait_for(pred).await.ok().map(|view| (*view).clone())
    }

    /// Stop the reconciler and wait for it to finish
    pub async fn unmount(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(target: "dashboard", dashboard = %self.kind, error = %e, "Reconciler task failed");
        }
    }
}

/// Mount a dashboard and start reconciling in the background
pub fn mount<M: DashboardModel>(
    model: M,
    sources: DashboardSources,
    options: MountOptions,
) -> DashboardHandle<M::State> {
    let kind = model.kind();
    let view = DashboardView {
        kind,
        status: if kind.has_snapshot() {
            LoadStatus::Loading
        } else {
            LoadStatus::Ready
        },
        channel: if kind.push_tag().is_some() {
            ChannelStatus::Connecting
        } else {
            ChannelStatus::Absent
        },
        version: 0,
        state: model.initial_state(),
    };
    let (publisher, receiver) = watch::channel(view.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let reconciler = Reconciler {
        model,
        view,
        publisher,
        next_version: 0,
    };
    let task = tokio::spawn(reconciler.run(sources, options, shutdown_rx));
    info!(target: "dashboard", dashboard = %kind, "Dashboard mounted");

    DashboardHandle {
        kind,
        view: receiver,
        shutdown: Some(shutdown_tx),
        task,
    }
}

struct Reconciler<M: DashboardModel> {
    model: M,
    view: DashboardView<M::State>,
    publisher: watch::Sender<DashboardView<M::State>>,
    next_version: u64,
}

impl<M: DashboardModel> Reconciler<M> {
    async fn run(
        mut self,
        sources: DashboardSources,
        options: MountOptions,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let kind = self.model.kind();

        let snapshot_version = self.bump();
        let mut snapshot: Option<InFlight<Result<Value>>> = kind.has_snapshot().then(|| {
            let source = sources.snapshots.clone();
            Box::pin(async move { source.fetch_snapshot(kind).await }) as InFlight<_>
        });

        let mut opening: Option<InFlight<Result<PushReceiver>>> =
            kind.push_tag().is_some().then(|| {
                let channel = sources.channel.clone();
                Box::pin(async move { channel.open(kind).await }) as InFlight<_>
            });
        let mut channel: Option<PushReceiver> = None;

        let mut ticker: Option<Interval> = kind.is_polled().then(|| {
            let mut ticker = time::interval(options.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        let mut polling: Option<InFlight<Result<Value>>> = None;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                result = in_flight(&mut snapshot) => {
                    snapshot = None;
                    self.on_snapshot(result, snapshot_version);
                }

                result = in_flight(&mut opening) => {
                    opening = None;
                    match result {
                        Ok(rx) => {
                            channel = Some(rx);
                            self.view.channel = ChannelStatus::Open;
                        }
                        Err(e) => {
                            warn!(target: "dashboard", dashboard = %kind, error = %e, "Push channel failed to open");
                            self.view.channel = ChannelStatus::Stale;
                        }
                    }
                    self.publish();
                }

                event = next_event(&mut channel) => match event {
                    Some(ChannelEvent::Message(frame)) => self.on_frame(&frame),
                    Some(ChannelEvent::Error(e)) => {
                        warn!(target: "dashboard", dashboard = %kind, error = %e, "Push channel error");
                        channel = None;
                        self.mark_stale();
                    }
                    Some(ChannelEvent::Closed) | None => {
                        info!(target: "dashboard", dashboard = %kind, "Push channel closed");
                        channel = None;
                        self.mark_stale();
                    }
                },

                _ = tick(&mut ticker) => {
                    if polling.is_none() {
                        let source = sources.snapshots.clone();
                        polling = Some(Box::pin(async move { source.poll(kind).await }));
                    } else {
                        trace!(target: "dashboard", dashboard = %kind, "Poll still in flight; skipping tick");
                    }
                }

                result = in_flight(&mut polling) => {
                    polling = None;
                    self.on_poll(result);
                }
            }
        }

        debug!(target: "dashboard", dashboard = %kind, "Dashboard unmounted");
    }

    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn publish(&self) {
        self.publisher.send_replace(self.view.clone());
    }

    fn mark_stale(&mut self) {
        self.view.channel = ChannelStatus::Stale;
        self.publish();
    }

    fn on_snapshot(&mut self, result: Result<Value>, version: u64) {
        let kind = self.view.kind;
        match result {
            Ok(Value::Object(fields)) => {
                let applied = self.model.apply(&mut self.view.state, &fields, version);
                self.view.version = self.view.version.max(version);
                self.view.status = LoadStatus::Ready;
                info!(target: "dashboard", dashboard = %kind, applied, "Bulk snapshot loaded");
            }
            Ok(_) => {
                warn!(target: "dashboard", dashboard = %kind, "Bulk snapshot is not an object");
                self.view.status = LoadStatus::Unavailable;
            }
            Err(e) => {
                warn!(target: "dashboard", dashboard = %kind, error = %e, "Bulk snapshot failed");
                self.view.status = LoadStatus::Unavailable;
            }
        }
        self.publish();
    }

    fn on_frame(&mut self, frame: &str) {
        let kind = self.view.kind;
        let message = match PushMessage::parse(frame) {
            Ok(message) => message,
            Err(e) => {
                debug!(target: "dashboard", dashboard = %kind, error = %e, "Dropping push frame");
                return;
            }
        };
        if message.tag == MessageTag::Ping {
            trace!(target: "dashboard", dashboard = %kind, "Keepalive");
            return;
        }
        if message.tag.target() != Some(kind) {
            trace!(target: "dashboard", dashboard = %kind, tag = %message.tag, "Ignoring push for another dashboard");
            return;
        }

        let version = self.bump();
        let applied = self.model.apply(&mut self.view.state, &message.fields, version);
        if applied > 0 {
            self.view.version = version;
            self.publish();
        }
        debug!(target: "dashboard", dashboard = %kind, version, applied, "Push applied");
    }

    fn on_poll(&mut self, result: Result<Value>) {
        let kind = self.view.kind;
        let sample = match result {
            Ok(sample) => sample,
            Err(e) => {
                debug!(target: "dashboard", dashboard = %kind, error = %e, "Poll failed; skipping sample");
                self.model.poll_missed(&mut self.view.state);
                return;
            }
        };
        match self.model.poll(&mut self.view.state, sample) {
            Ok(()) => {
                self.view.version = self.bump();
                self.publish();
            }
            Err(e) => {
                debug!(target: "dashboard", dashboard = %kind, error = %e, "Malformed poll sample; skipping");
                self.model.poll_missed(&mut self.view.state);
            }
        }
    }
}

async fn in_flight<T>(slot: &mut Option<InFlight<T>>) -> T {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_event(channel: &mut Option<PushReceiver>) -> Option<ChannelEvent> {
    match channel {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
