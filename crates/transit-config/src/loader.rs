use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, ModelKind};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, placeholder expansion
    /// fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw)
            .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self =
            toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if required values are missing or a model entry
    /// lacks the pricing its kind needs
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }

        if self.admin.token.expose_secret().is_empty() {
            anyhow::bail!("admin.token must not be empty");
        }

        if self.poller.interval_secs == 0 {
            anyhow::bail!("poller.interval_secs must be greater than 0");
        }

        if self.poller.batch_size <= 0 {
            anyhow::bail!("poller.batch_size must be greater than 0");
        }

        if self.models.is_empty() {
            anyhow::bail!("at least one model must be configured");
        }

        for model in self.models.iter() {
            match model.kind {
                ModelKind::Sync => {
                    if model.price_per_1k_input_tokens <= 0.0 || model.price_per_1k_output_tokens <= 0.0 {
                        anyhow::bail!("sync model '{}' requires positive token prices", model.name);
                    }
                }
                ModelKind::Async => {
                    if model.price_per_generation <= 0.0 {
                        anyhow::bail!("async model '{}' requires a positive price_per_generation", model.name);
                    }
                }
            }
        }

        Ok(())
    }
}
