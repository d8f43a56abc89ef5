use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::Cache;
use secrecy::SecretString;
use transit_billing::BillingService;
use transit_config::ModelCatalog;
use transit_core::AuthedUser;
use transit_db::{ChannelRepository, TaskRepository, UserApiKeyRepository, UserRepository};
use transit_selector::ChannelSelector;
use transit_store::AdmissionStore;

/// How long a resolved API key stays cached before the database is
/// consulted again (bounds how long a revoked key keeps working)
const KEY_CACHE_TTL: Duration = Duration::from_secs(60);
const KEY_CACHE_CAPACITY: u64 = 10_000;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<ModelCatalog>,
    pub selector: ChannelSelector,
    pub billing: BillingService,
    pub admission: AdmissionStore,
    pub channels: Arc<dyn ChannelRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub api_keys: Arc<dyn UserApiKeyRepository>,
    pub admin_token: SecretString,
    pub(crate) key_cache: Cache<String, AuthedUser>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        models: ModelCatalog,
        channels: Arc<dyn ChannelRepository>,
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
        api_keys: Arc<dyn UserApiKeyRepository>,
        admission: AdmissionStore,
        billing: BillingService,
        admin_token: SecretString,
    ) -> Self {
        let selector = ChannelSelector::new(channels.clone(), admission.clone());
        let key_cache = Cache::builder()
            .time_to_live(KEY_CACHE_TTL)
            .max_capacity(KEY_CACHE_CAPACITY)
            .build();

        Self {
            models: Arc::new(models),
            selector,
            billing,
            admission,
            channels,
            users,
            tasks,
            api_keys,
            admin_token,
            key_cache,
        }
    }
}
