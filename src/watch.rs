use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::FixedOffset;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db;
use crate::models::User;
use crate::report;
use crate::snapshot::{self, Snapshot};

pub const ACTIVITY_CHANNEL: &str = "coaching_activity";

#[derive(Debug, Clone)]
pub struct Published<T> {
    pub generation: u64,
    pub value: T,
}

/// Runs recomputations so that only the newest one can publish. A new
/// trigger aborts the in-flight task, and a task that finishes after a
/// newer trigger drops its result.
pub struct Refresher<T> {
    latest: Arc<AtomicU64>,
    inflight: Option<JoinHandle<()>>,
    tx: Arc<watch::Sender<Option<Published<T>>>>,
}

impl<T: Send + Sync + 'static> Refresher<T> {
    pub fn new() -> (Self, watch::Receiver<Option<Published<T>>>) {
        let (tx, rx) = watch::channel(None);
        let refresher = Self {
            latest: Arc::new(AtomicU64::new(0)),
            inflight: None,
            tx: Arc::new(tx),
        };
        (refresher, rx)
    }

    pub fn trigger<F>(&mut self, recompute: F) -> u64
    where
        F: Future<Output = T> + Send + 'static,
    {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(handle) = self.inflight.take() {
            if !handle.is_finished() {
                tracing::debug!(generation, "cancelling superseded recompute");
                handle.abort();
            }
        }

        let latest = Arc::clone(&self.latest);
        let tx = Arc::clone(&self.tx);
        self.inflight = Some(tokio::spawn(async move {
            let value = recompute.await;
            if !publish(&tx, &latest, generation, value) {
                tracing::debug!(generation, "dropping stale recompute");
            }
        }));

        generation
    }
}

/// Stores `value` only if `generation` is still the latest trigger and is
/// newer than what the channel holds. The check runs under the channel lock.
fn publish<T>(
    tx: &watch::Sender<Option<Published<T>>>,
    latest: &AtomicU64,
    generation: u64,
    value: T,
) -> bool {
    tx.send_if_modified(move |slot| {
        let newer = slot
            .as_ref()
            .map_or(true, |current| current.generation < generation);
        if newer && latest.load(Ordering::SeqCst) == generation {
            *slot = Some(Published { generation, value });
            true
        } else {
            false
        }
    })
}

impl<T> Drop for Refresher<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}

async fn load_snapshot(
    pool: PgPool,
    user_id: uuid::Uuid,
    window_days: i64,
    offset: FixedOffset,
) -> Snapshot {
    let today = snapshot::local_today(&offset);
    let since = snapshot::cutoff_date(today, window_days);
    let data = db::fetch_window(&pool, user_id, since, today, &offset).await;
    snapshot::build_snapshot(&data.checkins, &data.responses, today, &offset)
}

/// Recomputes on every activity notification for `user` until Ctrl-C.
pub async fn run(
    pool: &PgPool,
    user: &User,
    window_days: i64,
    offset: FixedOffset,
) -> anyhow::Result<()> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(ACTIVITY_CHANNEL).await?;
    tracing::info!(channel = ACTIVITY_CHANNEL, email = %user.email, "watching for activity");

    let (mut refresher, mut rx) = Refresher::new();
    let user_key = user.id.to_string();
    refresher.trigger(load_snapshot(pool.clone(), user.id, window_days, offset));

    loop {
        tokio::select! {
            notification = listener.recv() => {
                let notification = notification?;
                if notification.payload() != user_key {
                    continue;
                }
                let generation =
                    refresher.trigger(load_snapshot(pool.clone(), user.id, window_days, offset));
                tracing::info!(generation, "activity received, recomputing");
            }
            changed = rx.changed() => {
                changed?;
                if let Some(published) = rx.borrow_and_update().as_ref() {
                    tracing::debug!(generation = published.generation, "snapshot published");
                    println!("{}", report::render_summary(user, &published.value));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("stopping watch");
                break;
            }
        }
    }

    Ok(())
}
