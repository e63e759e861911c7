use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::credential::{Credential, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("no usable credentials configured for {0}")]
    NoCredentialsConfigured(ProviderId),
}

/// Ordered credential set used to (re)build a pool. Insertion order of
/// providers is their traversal priority; key order within a provider
/// is credential priority. Blank keys are dropped here, so the pool
/// never sees them.
#[derive(Debug, Clone, Default)]
pub struct PoolSnapshot {
    providers: Vec<(ProviderId, Vec<String>)>,
}

impl PoolSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_keys<I, S>(mut self, provider: ProviderId, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(Into::into)
            .filter(|key| !key.trim().is_empty());
        match self
            .providers
            .iter_mut()
            .find(|(existing, _)| *existing == provider)
        {
            Some((_, list)) => list.extend(keys),
            None => self.providers.push((provider, keys.collect())),
        }
        self
    }
}

struct ProviderSlot {
    provider: ProviderId,
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

/// Per-caller credential store with one rotation cursor per provider.
///
/// The cursor remembers which key to try next across `generate` calls,
/// so repeated quota failures on one key do not pin every call to it.
/// Cursor updates are atomic read-modify-writes and the credential
/// lists sit behind `ArcSwap`, so no lock is held, ever; concurrent
/// calls may interleave advances (rotation is a load-spreading
/// heuristic, not a consistency-critical counter) but the cursor never
/// leaves `[0, len)`.
pub struct CredentialPool {
    slots: ArcSwap<Vec<Arc<ProviderSlot>>>,
}

impl CredentialPool {
    pub fn new(snapshot: PoolSnapshot) -> Self {
        let pool = Self {
            slots: ArcSwap::from_pointee(Vec::new()),
        };
        pool.replace_snapshot(snapshot);
        pool
    }

    /// Providers with at least one usable credential, in priority order.
    pub fn providers(&self) -> Vec<ProviderId> {
        self.slots
            .load()
            .iter()
            .filter(|slot| !slot.credentials.is_empty())
            .map(|slot| slot.provider)
            .collect()
    }

    pub fn credential_count(&self, provider: ProviderId) -> usize {
        self.slot(provider)
            .map(|slot| slot.credentials.len())
            .unwrap_or(0)
    }

    /// The credential under the cursor. Does not advance: a caller that
    /// hits a fatal failure must be able to come back to the same key.
    pub fn next_credential(&self, provider: ProviderId) -> Result<Credential, PoolError> {
        let slot = self
            .slot(provider)
            .ok_or(PoolError::NoCredentialsConfigured(provider))?;
        let len = slot.credentials.len();
        if len == 0 {
            return Err(PoolError::NoCredentialsConfigured(provider));
        }
        let cursor = slot.cursor.load(Ordering::Relaxed) % len;
        Ok(slot.credentials[cursor].clone())
    }

    /// Advance the cursor one step, wrapping at the list length. Each
    /// completed non-fatal attempt calls this exactly once.
    pub fn advance(&self, provider: ProviderId) {
        if let Some(slot) = self.slot(provider) {
            let len = slot.credentials.len();
            if len == 0 {
                return;
            }
            let _ = slot
                .cursor
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cursor| {
                    Some((cursor + 1) % len)
                });
        }
    }

    /// Current cursor position, for observability and tests.
    pub fn cursor(&self, provider: ProviderId) -> usize {
        self.slot(provider)
            .map(|slot| slot.cursor.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Swap in a new credential set without resetting rotation state:
    /// each provider keeps its cursor, clamped modulo the new length.
    pub fn replace_snapshot(&self, snapshot: PoolSnapshot) {
        let previous = self.slots.load();
        let slots = snapshot
            .providers
            .into_iter()
            .map(|(provider, keys)| {
                let credentials: Vec<Credential> = keys
                    .into_iter()
                    .map(|key| Credential::new(provider, key))
                    .collect();
                let carried = previous
                    .iter()
                    .find(|slot| slot.provider == provider)
                    .map(|slot| slot.cursor.load(Ordering::Relaxed))
                    .unwrap_or(0);
                let cursor = match credentials.len() {
                    0 => 0,
                    len => carried % len,
                };
                Arc::new(ProviderSlot {
                    provider,
                    credentials,
                    cursor: AtomicUsize::new(cursor),
                })
            })
            .collect();
        self.slots.store(Arc::new(slots));
    }

    fn slot(&self, provider: ProviderId) -> Option<Arc<ProviderSlot>> {
        self.slots
            .load()
            .iter()
            .find(|slot| slot.provider == provider)
            .cloned()
    }
}
