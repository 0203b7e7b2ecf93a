use std::sync::Arc;

use airiss_core::{ai::AIAnalyzer, CoreError, FeedbackProvider};

use crate::config::Config;
use crate::registry::Registry;

/// Builds a feedback provider from an API key.
pub type FeedbackFactory =
    Arc<dyn Fn(String) -> Result<Arc<dyn FeedbackProvider>, CoreError> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub config: Arc<Config>,
    pub feedback: FeedbackFactory,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let model = config.openai_model.clone();
        let endpoint = config.openai_endpoint.clone();
        let feedback: FeedbackFactory = Arc::new(
            move |api_key: String| -> Result<Arc<dyn FeedbackProvider>, CoreError> {
                let mut analyzer = AIAnalyzer::new(api_key)?.with_model(model.clone());
                if let Some(endpoint) = &endpoint {
                    analyzer = analyzer.with_endpoint(endpoint.clone());
                }
                Ok(Arc::new(analyzer))
            },
        );

        AppState {
            registry: Registry::new(),
            config: Arc::new(config),
            feedback,
        }
    }

    #[cfg(test)]
    pub fn with_feedback(mut self, feedback: FeedbackFactory) -> Self {
        self.feedback = feedback;
        self
    }
}
