//! Generate-on-demand file cache with single-flight generation

use crate::config::CacheConfig;
use crate::error::{BoxError, CacheError, Result};
use crate::sweep::{age_of, is_expired, Sweeper};
use crate::types::{CacheStats, Extension, SweepReport};
use futures::future::{BoxFuture, FutureExt, Shared};
use key_fingerprint::Fingerprint;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type GenerateFn<K> =
    dyn Fn(PathBuf, K) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync;

/// In-flight generation shared by every caller waiting on the same fingerprint
type Flight = Shared<BoxFuture<'static, Result<()>>>;

/// Resolved identity and location of a cache entry
struct EntryLocation {
    fingerprint: Fingerprint,
    extension: String,
    path: PathBuf,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    generations: AtomicU64,
    generation_failures: AtomicU64,
    dedup_joins: AtomicU64,
}

struct Inner<K> {
    config: CacheConfig,
    extension: Extension<K>,
    generate: Arc<GenerateFn<K>>,
    /// Generations in flight, keyed by fingerprint
    pending: Mutex<HashMap<Fingerprint, Flight>>,
    /// Bumped after a generation writes its file and before it leaves `pending`
    settled: AtomicU64,
    counters: Counters,
}

/// A directory of generated files keyed by the fingerprint of arbitrary
/// serializable keys.
///
/// [`FileCache::get_file`] returns the path of an unexpired file for a key,
/// generating it first if needed. Concurrent callers asking for the same key
/// share one generation. A background [`Sweeper`] deletes expired files.
///
/// Keys that differ but share a fingerprint resolve to the same file. With
/// SHA-256 fingerprints this is not expected in practice and is not guarded
/// against.
pub struct FileCache<K> {
    inner: Arc<Inner<K>>,
    sweeper: Sweeper,
}

impl<K> FileCache<K>
where
    K: Serialize + Clone + Send + Sync + 'static,
{
    /// Create the cache directory if needed and start the sweep scheduler.
    ///
    /// `generate` receives the path to write and the key. It must leave a
    /// complete file at that path when it returns `Ok`. The path is a hidden
    /// temporary file that is renamed into place afterwards, so a failed or
    /// abandoned generation never exposes a partial file.
    pub async fn new<G, Fut, E>(
        config: CacheConfig,
        extension: impl Into<Extension<K>>,
        generate: G,
    ) -> Result<Self>
    where
        G: Fn(PathBuf, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        config.validate()?;
        fs::create_dir_all(&config.cache_dir).await?;
        info!(cache_dir = ?config.cache_dir, "Cache initialized");

        let generate: Arc<GenerateFn<K>> = Arc::new(
            move |path: PathBuf, key: K| -> BoxFuture<'static, std::result::Result<(), BoxError>> {
                let generation = generate(path, key);
                async move { generation.await.map_err(Into::<BoxError>::into) }.boxed()
            },
        );

        let sweeper = Sweeper::start(&config)?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                extension: extension.into(),
                generate,
                pending: Mutex::new(HashMap::new()),
                settled: AtomicU64::new(0),
                counters: Counters::default(),
            }),
            sweeper,
        })
    }

    /// Return the path of an unexpired file for `key`, generating it if needed
    pub async fn get_file(&self, key: &K) -> Result<PathBuf> {
        let EntryLocation {
            fingerprint,
            extension,
            path,
        } = self.inner.locate(key)?;

        loop {
            let settled = self.inner.settled.load(Ordering::SeqCst);
            if self.inner.is_fresh(&path).await {
                self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = %fingerprint, "Cache hit");
                return Ok(path);
            }

            // No filesystem access while the table is locked
            let flight = {
                let mut pending = self.inner.pending.lock().await;
                if let Some(flight) = pending.get(&fingerprint) {
                    self.inner.counters.dedup_joins.fetch_add(1, Ordering::Relaxed);
                    debug!(fingerprint = %fingerprint, "Joining in-flight generation");
                    flight.clone()
                } else if self.inner.settled.load(Ordering::SeqCst) != settled {
                    // A generation settled after the freshness check; it may have been ours
                    continue;
                } else {
                    self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(fingerprint = %fingerprint, "Cache miss, generating");
                    let flight = Inner::start_generation(
                        Arc::clone(&self.inner),
                        fingerprint.clone(),
                        extension.clone(),
                        path.clone(),
                        key.clone(),
                    );
                    pending.insert(fingerprint.clone(), flight.clone());
                    flight
                }
            };

            flight.await?;
            return Ok(path);
        }
    }

    /// Path a key's file lives at, without checking or generating it
    pub fn path_for(&self, key: &K) -> Result<PathBuf> {
        Ok(self.inner.locate(key)?.path)
    }

    /// Delete the file for `key` if present. Returns whether a file was removed.
    ///
    /// A generation already in flight for the key still completes and
    /// writes its file.
    pub async fn invalidate(&self, key: &K) -> Result<bool> {
        let EntryLocation {
            fingerprint, path, ..
        } = self.inner.locate(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(fingerprint = %fingerprint, "Invalidated cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl<K> FileCache<K> {
    /// Delete expired files now. Safe to call at any time, including
    /// concurrently with the scheduler and after [`FileCache::shutdown`].
    pub async fn sweep(&self) -> SweepReport {
        self.sweeper.sweep_now().await
    }

    /// Stop the sweep scheduler, letting an in-flight sweep finish. Idempotent.
    pub async fn shutdown(&self) {
        self.sweeper.shutdown().await;
    }

    pub fn cache_dir(&self) -> &Path {
        &self.inner.config.cache_dir
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        let sweep = self.sweeper.stats().await;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            generations: counters.generations.load(Ordering::Relaxed),
            generation_failures: counters.generation_failures.load(Ordering::Relaxed),
            dedup_joins: counters.dedup_joins.load(Ordering::Relaxed),
            sweeps: sweep.sweeps,
            swept_files: sweep.swept_files,
            pending: self.inner.pending.lock().await.len(),
            last_sweep_at: sweep.last_sweep_at,
        }
    }
}

impl<K> Inner<K>
where
    K: Serialize + Clone + Send + Sync + 'static,
{
    fn locate(&self, key: &K) -> Result<EntryLocation> {
        let fingerprint = Fingerprint::of(key)?;
        let extension = self.extension.resolve(key);
        if extension.contains(|c: char| c == '/' || c == '\\') {
            return Err(CacheError::Config(format!(
                "file extension {:?} contains a path separator",
                extension
            )));
        }

        let path = self
            .config
            .cache_dir
            .join(format!("{}{}", fingerprint, extension));
        Ok(EntryLocation {
            fingerprint,
            extension,
            path,
        })
    }

    /// Spawn the generation so it settles, and leaves the pending table, even
    /// if every caller waiting on it goes away.
    fn start_generation(
        inner: Arc<Self>,
        fingerprint: Fingerprint,
        extension: String,
        path: PathBuf,
        key: K,
    ) -> Flight {
        inner.counters.generations.fetch_add(1, Ordering::Relaxed);

        let task = tokio::spawn(async move {
            let result = AssertUnwindSafe(inner.generate_into(&path, &extension, key))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(CacheError::generation("generator panicked".into())));

            inner.settled.fetch_add(1, Ordering::SeqCst);
            inner.pending.lock().await.remove(&fingerprint);

            match &result {
                Ok(()) => debug!(fingerprint = %fingerprint, path = ?path, "Generated file"),
                Err(e) => {
                    inner
                        .counters
                        .generation_failures
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(fingerprint = %fingerprint, error = %e, "Generation failed");
                }
            }
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(CacheError::generation(
                    format!("generation task aborted: {}", e).into(),
                )),
            }
        }
        .boxed()
        .shared()
    }

    /// Run the generator against a hidden temp file carrying the entry's
    /// extension, then rename it over `path`
    async fn generate_into(&self, path: &Path, extension: &str, key: K) -> Result<()> {
        let dir = self.config.cache_dir.clone();
        // The directory may have been removed externally since startup
        fs::create_dir_all(&dir).await?;

        let suffix = extension.to_string();
        // Deleted on drop unless persisted
        let temp = run_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(".").suffix(&suffix);
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                // Mode a plain create requests (umask still applies); tempfile defaults to 0600
                builder.permissions(std::fs::Permissions::from_mode(0o666));
            }
            Ok(builder.tempfile_in(&dir)?.into_temp_path())
        })
        .await?;

        let outcome = (self.generate)(temp.to_path_buf(), key).await;

        let path = path.to_path_buf();
        run_blocking(move || match outcome {
            Ok(()) => temp.persist(&path).map_err(|e| CacheError::from(e.error)),
            Err(e) => {
                let _ = temp.close();
                Err(CacheError::generation(e))
            }
        })
        .await
    }

    async fn is_fresh(&self, path: &Path) -> bool {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!(path = ?path, error = %e, "Failed to stat cached file, treating as miss");
                }
                return false;
            }
        };

        metadata.is_file()
            && metadata
                .modified()
                .map(|modified| !is_expired(age_of(modified), self.config.ttl))
                .unwrap_or(false)
    }
}

/// Run blocking filesystem work (temp file creation, rename) off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CacheError::from(std::io::Error::new(ErrorKind::Other, e)))?
}
