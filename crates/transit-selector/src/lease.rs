use transit_db::Channel;
use transit_store::AdmissionStore;

/// One reserved concurrency slot on a channel
///
/// Each successful acquire maps to exactly one release. The normal
/// paths are explicit: `release().await` when the request finishes, or
/// `keep()` when the slot is intentionally left held for the poller to
/// reconcile. If a lease is dropped without either (an error return or
/// a cancelled request), the `Drop` backstop spawns the release so the
/// slot cannot leak.
pub struct ChannelLease {
    channel: Channel,
    admission: AdmissionStore,
    armed: bool,
}

impl ChannelLease {
    pub(crate) fn new(channel: Channel, admission: AdmissionStore) -> Self {
        Self {
            channel,
            admission,
            armed: true,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Return the slot now
    pub async fn release(mut self) {
        self.armed = false;
        release_slot(&self.admission, &self.channel).await;
    }

    /// Leave the slot held and take the channel
    ///
    /// Used by async submissions: the slot stays reserved until the
    /// poller observes a terminal state and releases it.
    pub fn keep(mut self) -> Channel {
        self.armed = false;
        self.channel.clone()
    }
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let admission = self.admission.clone();
        let channel = self.channel.clone();

        // Release is async; from Drop it has to run as a task. Outside
        // a runtime the slot leaks until a store restart resets it.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_slot(&admission, &channel).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    channel_id = %self.channel.id,
                    "channel lease dropped outside a runtime; slot not released"
                );
            }
        }
    }
}

async fn release_slot(admission: &AdmissionStore, channel: &Channel) {
    if let Err(e) = admission.release(channel.id).await {
        tracing::error!(channel_id = %channel.id, error = %e, "failed to release concurrency slot");
    } else {
        tracing::debug!(channel_id = %channel.id, "channel released");
    }
}
