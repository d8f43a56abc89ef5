use serde::Deserialize;

/// Whether a model completes within the request or through an async job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Chat completion; billed by metered token usage after the response
    Sync,
    /// Image or video generation; billed per generation up front
    Async,
}

/// One entry of the model catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Name clients send in the `model` field
    pub name: String,
    /// Name forwarded to the upstream provider
    pub upstream_name: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub price_per_1k_input_tokens: f64,
    #[serde(default)]
    pub price_per_1k_output_tokens: f64,
    #[serde(default)]
    pub price_per_generation: f64,
}

/// Lookup table over the configured models
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog(Vec<ModelConfig>);

impl ModelCatalog {
    pub fn new(models: Vec<ModelConfig>) -> Self {
        Self(models)
    }

    /// Find a model by its client-facing name
    pub fn find(&self, name: &str) -> Option<&ModelConfig> {
        self.0.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
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
                name: "vid".to_owned(),
                upstream_name: "provider-vid".to_owned(),
                kind: ModelKind::Async,
                price_per_1k_input_tokens: 0.0,
                price_per_1k_output_tokens: 0.0,
                price_per_generation: 2.0,
            },
        ])
    }

    #[test]
    fn find_returns_configured_model() {
        let catalog = catalog();
        let model = catalog.find("vid").unwrap();
        assert_eq!(model.upstream_name, "provider-vid");
        assert_eq!(model.kind, ModelKind::Async);
    }

    #[test]
    fn find_misses_unknown_model() {
        assert!(catalog().find("nope").is_none());
    }

    #[test]
    fn kind_deserializes_lowercase() {
        let model: ModelConfig = toml::from_str(
            r#"
            name = "m"
            upstream_name = "u"
            kind = "sync"
            "#,
        )
        .unwrap();
        assert_eq!(model.kind, ModelKind::Sync);
    }
}
