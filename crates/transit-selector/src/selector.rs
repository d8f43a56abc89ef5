use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use transit_db::{Channel, ChannelRepository};
use transit_store::AdmissionStore;
use uuid::Uuid;

use crate::error::SelectorError;
use crate::lease::ChannelLease;

/// Picks an active channel and reserves one of its concurrency slots
#[derive(Clone)]
pub struct ChannelSelector {
    channels: Arc<dyn ChannelRepository>,
    admission: AdmissionStore,
}

impl ChannelSelector {
    pub fn new(channels: Arc<dyn ChannelRepository>, admission: AdmissionStore) -> Self {
        Self { channels, admission }
    }

    /// Select a channel with a free slot
    ///
    /// Weighted random pick over the channels not yet tried, then an
    /// atomic acquire against the admission store; denials retry on the
    /// remaining peers. Bounded by the number of active channels, since
    /// the tried set grows every round.
    pub async fn select(&self) -> Result<ChannelLease, SelectorError> {
        let active = self.channels.list_active().await?;
        if active.is_empty() {
            return Err(SelectorError::NoActiveChannels);
        }

        let mut tried: HashSet<Uuid> = HashSet::new();
        while tried.len() < active.len() {
            let Some(pick) = weighted_pick(&active, &tried, &mut rand::rng()) else {
                break;
            };
            tried.insert(pick.id);

            match self.admission.acquire(pick.id, pick.max_concurrency).await {
                Ok(true) => {
                    tracing::info!(channel_id = %pick.id, channel_name = %pick.name, "channel selected");
                    return Ok(ChannelLease::new(pick.clone(), self.admission.clone()));
                }
                Ok(false) => {
                    tracing::debug!(
                        channel_id = %pick.id,
                        max_concurrency = pick.max_concurrency,
                        "channel at concurrency limit"
                    );
                }
                Err(e) => {
                    // A store error against one channel counts as a
                    // denial for it; the remaining peers still get tried.
                    tracing::warn!(channel_id = %pick.id, error = %e, "failed to acquire concurrency slot");
                }
            }
        }

        Err(SelectorError::AllAtCapacity)
    }

    /// Return a slot that is not held through a lease
    ///
    /// The poller calls this when a task it reconciles reaches a
    /// terminal state.
    pub async fn release(&self, channel_id: Uuid) {
        if let Err(e) = self.admission.release(channel_id).await {
            tracing::error!(%channel_id, error = %e, "failed to release concurrency slot");
        }
    }
}

/// Weighted random pick over the channels not yet tried
///
/// Sums the weights, draws uniformly in `[0, total)`, and walks the
/// channels in their stable repository order accumulating weight until
/// the draw is covered. Returns `None` when nothing is left to try.
fn weighted_pick<'a, R: Rng>(
    channels: &'a [Channel],
    tried: &HashSet<Uuid>,
    rng: &mut R,
) -> Option<&'a Channel> {
    let total: i64 = channels
        .iter()
        .filter(|c| !tried.contains(&c.id))
        .map(|c| i64::from(c.weight.max(0)))
        .sum();
    if total == 0 {
        return None;
    }

    let draw = rng.random_range(0..total);
    let mut cumulative = 0i64;
    for channel in channels {
        if tried.contains(&channel.id) {
            continue;
        }
        cumulative += i64::from(channel.weight.max(0));
        if draw < cumulative {
            return Some(channel);
        }
    }

    None
}
