//! Message aggregation: read, parse, filter, order and limit.
//!
//! Files are parsed on a dedicated rayon pool so a large channel never starves
//! the async runtime. Parse order is irrelevant; the final ordering is total:
//! newest first, ties broken by source path ascending.

use std::{cmp::Ordering, path::PathBuf, sync::Arc};

use rayon::prelude::*;
use timble_core::{Channel, MessageRecord};
use tracing::{debug, trace};

use crate::store::MessageStore;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
  #[error("Failed to build parse pool: {0}")]
  Pool(#[from] rayon::ThreadPoolBuildError),
  #[error("Aggregation task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct Aggregator {
  store: Arc<MessageStore>,
  pool: Arc<rayon::ThreadPool>,
}

impl Aggregator {
  /// `workers == 0` sizes the pool to the number of CPUs.
  pub fn new(store: Arc<MessageStore>, workers: usize) -> Result<Self, AggregateError> {
    let workers = if workers == 0 { num_cpus::get() } else { workers };
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(workers)
      .thread_name(|i| format!("timble-parse-{i}"))
      .build()?;
    debug!(workers, "Aggregation pool ready");

    Ok(Self {
      store,
      pool: Arc::new(pool),
    })
  }

  pub fn store(&self) -> &Arc<MessageStore> {
    &self.store
  }

  /// Parse `paths` and return the newest `limit` records admitted by `channel`.
  ///
  /// Unreadable files are skipped. Blocks the calling thread.
  pub fn aggregate_blocking(&self, paths: &[PathBuf], channel: &Channel, limit: usize) -> Vec<MessageRecord> {
    if limit == 0 || paths.is_empty() {
      return Vec::new();
    }

    let store = &self.store;
    let mut records: Vec<MessageRecord> = self.pool.install(|| {
      paths
        .par_iter()
        .filter_map(|path| store.read_record(path))
        .filter(|record| channel.admits(&record.channel))
        .collect()
    });

    let parsed = records.len();
    sort_records(&mut records);
    records.truncate(limit);

    trace!(
      channel = %channel,
      files = paths.len(),
      parsed,
      returned = records.len(),
      "Aggregated messages"
    );
    records
  }

  /// Async entry point; runs [`Self::aggregate_blocking`] off the runtime.
  pub async fn aggregate(
    &self,
    paths: Vec<PathBuf>,
    channel: Channel,
    limit: usize,
  ) -> Result<Vec<MessageRecord>, AggregateError> {
    let this = self.clone();
    let records = tokio::task::spawn_blocking(move || this.aggregate_blocking(&paths, &channel, limit)).await?;
    Ok(records)
  }
}

/// Newest first; equal timestamps fall back to path order.
pub fn sort_records(records: &mut [MessageRecord]) {
  records.sort_by(compare_records);
}

fn compare_records(a: &MessageRecord, b: &MessageRecord) -> Ordering {
  b.timestamp
    .cmp(&a.timestamp)
    .then_with(|| a.source_path.cmp(&b.source_path))
}
