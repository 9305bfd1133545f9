//! Generate-on-demand file cache
//!
//! Memoizes expensive file-producing work (rendering a document, transcoding
//! an image) on disk. Each key is fingerprinted into a filename; the first
//! request for a key runs the generator once, no matter how many callers ask
//! concurrently, and later requests are served from disk until the file's
//! age passes the TTL. A background sweep deletes expired files.

mod cache;
mod config;
mod error;
mod sweep;
mod types;

pub use cache::FileCache;
pub use config::CacheConfig;
pub use error::{BoxError, CacheError, Result};
pub use key_fingerprint::{fingerprint, Fingerprint};
pub use sweep::{sweep_dir, SweepStats, Sweeper};
pub use types::{CacheStats, Extension, SweepReport};
