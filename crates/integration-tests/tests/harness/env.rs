//! In-memory relay environment seeded with one user and one API key

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use transit_billing::BillingService;
use transit_config::{ModelCatalog, ModelConfig, ModelKind};
use transit_db::in_memory::{
    InMemoryChannelRepository, InMemoryTaskRepository, InMemoryUserApiKeyRepository,
    InMemoryUserRepository,
};
use transit_db::{Channel, ChannelRepository, User, UserApiKey, UserApiKeyRepository, UserRepository};
use transit_poller::TaskPoller;
use transit_server::AppState;
use transit_store::{AdmissionStore, BalanceStore};

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const API_KEY: &str = "sk-transit-test-1";

pub struct TestEnv {
    pub admission: AdmissionStore,
    pub balances: BalanceStore,
    pub billing: BillingService,
    pub channels: Arc<InMemoryChannelRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub tasks: Arc<InMemoryTaskRepository>,
    pub api_keys: Arc<InMemoryUserApiKeyRepository>,
    pub user: User,
}

impl TestEnv {
    pub async fn new() -> Self {
        let admission = AdmissionStore::in_memory();
        let balances = BalanceStore::in_memory();
        let billing = BillingService::new(balances.clone());
        let channels = Arc::new(InMemoryChannelRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let api_keys = Arc::new(InMemoryUserApiKeyRepository::new());

        let user = User::new("tester".to_owned());
        users.create(&user).await.unwrap();
        api_keys
            .create(&UserApiKey::new(user.id, API_KEY.to_owned()))
            .await
            .unwrap();

        Self {
            admission,
            balances,
            billing,
            channels,
            users,
            tasks,
            api_keys,
            user,
        }
    }

    /// Catalog used across the scenarios: one chat model, one image
    /// model, one video model
    pub fn models() -> ModelCatalog {
        ModelCatalog::new(vec![
            ModelConfig {
                name: "m".to_owned(),
                upstream_name: "provider-m".to_owned(),
                kind: ModelKind::Sync,
                price_per_1k_input_tokens: 0.01,
                price_per_1k_output_tokens: 0.02,
                price_per_generation: 0.0,
            },
            ModelConfig {
                name: "img".to_owned(),
                upstream_name: "provider-img".to_owned(),
                kind: ModelKind::Async,
                price_per_1k_input_tokens: 0.0,
                price_per_1k_output_tokens: 0.0,
                price_per_generation: 0.5,
            },
            ModelConfig {
                name: "vid".to_owned(),
                upstream_name: "provider-vid".to_owned(),
                kind: ModelKind::Async,
                price_per_1k_input_tokens: 0.0,
                price_per_1k_output_tokens: 0.0,
                price_per_generation: 2.0,
            },
        ])
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            Self::models(),
            self.channels.clone(),
            self.users.clone(),
            self.tasks.clone(),
            self.api_keys.clone(),
            self.admission.clone(),
            self.billing.clone(),
            SecretString::from(ADMIN_TOKEN.to_owned()),
        )
    }

    /// Register an active channel pointing at the given upstream
    pub async fn add_channel(&self, base_url: &str, max_concurrency: i32, weight: i32) -> Channel {
        let channel = Channel::new(
            "test-channel".to_owned(),
            SecretString::from("sk-chan"),
            base_url.to_owned(),
            max_concurrency,
            weight,
        );
        self.channels.create(&channel).await.unwrap();
        channel
    }

    /// A poller over this environment, driven manually via `sweep`
    pub fn poller(&self) -> TaskPoller {
        TaskPoller::new(
            self.tasks.clone(),
            self.channels.clone(),
            self.admission.clone(),
            self.billing.clone(),
            Duration::from_secs(10),
            100,
        )
    }

    pub async fn balance(&self) -> f64 {
        self.balances.read(self.user.id).await.unwrap()
    }
}
