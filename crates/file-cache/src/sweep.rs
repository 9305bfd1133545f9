//! Expiration sweep and its background scheduler

use crate::config::CacheConfig;
use crate::error::Result;
use crate::types::SweepReport;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Age of a file given its last-write time; future mtimes count as age zero
pub(crate) fn age_of(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}

pub(crate) fn is_expired(age: Duration, ttl: Duration) -> bool {
    age >= ttl
}

/// Hidden files are in-progress writes and never belong to the sweep
fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Delete every expired regular file directly under `dir`.
///
/// Per-file failures are logged and counted; they never abort the sweep.
pub async fn sweep_dir(dir: &Path, ttl: Duration) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(cache_dir = ?dir, "Cache directory missing, nothing to sweep");
            return report;
        }
        Err(e) => {
            warn!(cache_dir = ?dir, error = %e, "Failed to list cache directory");
            report.failed += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(cache_dir = ?dir, error = %e, "Failed to read cache directory entry");
                report.failed += 1;
                break;
            }
        };

        if is_hidden(&entry.file_name()) {
            continue;
        }

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to stat cached file");
                report.failed += 1;
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        report.scanned += 1;

        let age = match metadata.modified() {
            Ok(modified) => age_of(modified),
            Err(e) => {
                warn!(path = ?path, error = %e, "Cached file has no modification time");
                report.failed += 1;
                continue;
            }
        };
        if !is_expired(age, ttl) {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, age_ms = age.as_millis() as u64, "Removed expired file");
                report.removed += 1;
            }
            // Already gone: removed externally or by invalidation
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to remove expired file");
                report.failed += 1;
            }
        }
    }

    report
}

/// Shared state between a [`Sweeper`], its background task and manual sweeps
struct SweepState {
    cache_dir: PathBuf,
    ttl: Duration,
    /// Held for the duration of a sweep so sweeps never overlap
    running: Mutex<()>,
    sweeps: AtomicU64,
    swept_files: AtomicU64,
    last_sweep_at: RwLock<Option<DateTime<Utc>>>,
}

impl SweepState {
    async fn sweep(&self) -> SweepReport {
        let _running = self.running.lock().await;

        let report = sweep_dir(&self.cache_dir, self.ttl).await;

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept_files
            .fetch_add(report.removed as u64, Ordering::Relaxed);
        *self.last_sweep_at.write().await = Some(Utc::now());

        if report.removed > 0 || report.failed > 0 {
            info!(
                cache_dir = ?self.cache_dir,
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                "Sweep finished"
            );
        } else {
            debug!(cache_dir = ?self.cache_dir, scanned = report.scanned, "Sweep found nothing to remove");
        }

        report
    }
}

/// Snapshot of sweep counters
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    pub sweeps: u64,
    pub swept_files: u64,
    pub last_sweep_at: Option<DateTime<Utc>>,
}

/// Background task that sweeps a directory on a fixed interval.
///
/// The first sweep runs immediately. Ticks that fall due while a sweep is still
/// running are skipped. Dropping the sweeper stops the task once any in-flight
/// sweep has finished; [`Sweeper::shutdown`] does the same and waits for it.
pub struct Sweeper {
    state: Arc<SweepState>,
    task: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl Sweeper {
    /// Start sweeping `config.cache_dir`. Must be called from within a tokio runtime.
    pub fn start(config: &CacheConfig) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(SweepState {
            cache_dir: config.cache_dir.clone(),
            ttl: config.ttl,
            running: Mutex::new(()),
            sweeps: AtomicU64::new(0),
            swept_files: AtomicU64::new(0),
            last_sweep_at: RwLock::new(None),
        });

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = config.cleanup_interval;
        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    // Fires on an explicit shutdown or when the sweeper is dropped
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        task_state.sweep().await;
                    }
                }
            }
            debug!(cache_dir = ?task_state.cache_dir, "Sweep scheduler stopped");
        });

        info!(
            cache_dir = ?config.cache_dir,
            ttl_ms = config.ttl.as_millis() as u64,
            interval_ms = period.as_millis() as u64,
            "Sweep scheduler started"
        );

        Ok(Self {
            state,
            task: Mutex::new(Some((shutdown_tx, handle))),
        })
    }

    /// Run a sweep now, waiting for any sweep already in progress first
    pub async fn sweep_now(&self) -> SweepReport {
        self.state.sweep().await
    }

    /// Stop scheduling sweeps and wait for an in-flight sweep to finish. Idempotent.
    pub async fn shutdown(&self) {
        let task = self.task.lock().await.take();
        let Some((shutdown_tx, handle)) = task else {
            return;
        };

        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            warn!(error = %e, "Sweep scheduler task failed");
        }
        info!(cache_dir = ?self.state.cache_dir, "Sweep scheduler shut down");
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    pub async fn stats(&self) -> SweepStats {
        SweepStats {
            sweeps: self.state.sweeps.load(Ordering::Relaxed),
            swept_files: self.state.swept_files.load(Ordering::Relaxed),
            last_sweep_at: *self.state.last_sweep_at.read().await,
        }
    }
}
