//! Template renderer port and in-memory implementation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::simulate_latency;
use crate::error::ServiceError;

const SERVICE: &str = "template_renderer";

/// Renders document templates to HTML.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Renders a template with the given data, returning HTML fragments.
    async fn render(
        &self,
        template_name: &str,
        template_path: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<String>, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryTemplateState {
    rendered: Vec<String>,
    failing_templates: HashSet<String>,
    fail_on_render: bool,
    delay: Option<Duration>,
}

/// In-memory template renderer for testing.
///
/// Produces one fragment per call that embeds the template name and the
/// `companyName` field of the data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateRenderer {
    state: Arc<RwLock<InMemoryTemplateState>>,
}

impl InMemoryTemplateRenderer {
    /// Creates a new in-memory template renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every render call to fail.
    pub async fn set_fail_on_render(&self, fail: bool) {
        self.state.write().await.fail_on_render = fail;
    }

    /// Configures renders of one template to fail.
    pub async fn fail_template(&self, template_name: impl Into<String>) {
        self.state
            .write()
            .await
            .failing_templates
            .insert(template_name.into());
    }

    /// Delays every call by the given duration.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Returns the names of successfully rendered templates, in call order.
    pub async fn rendered(&self) -> Vec<String> {
        self.state.read().await.rendered.clone()
    }
}

#[async_trait]
impl TemplateRenderer for InMemoryTemplateRenderer {
    async fn render(
        &self,
        template_name: &str,
        template_path: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<String>, ServiceError> {
        let delay = self.state.read().await.delay;
        simulate_latency(delay).await;

        let mut state = self.state.write().await;
        if state.fail_on_render || state.failing_templates.contains(template_name) {
            return Err(ServiceError::unavailable(
                SERVICE,
                format!("cannot render {template_path}/{template_name}"),
            ));
        }

        state.rendered.push(template_name.to_string());
        let company = data
            .get("companyName")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        Ok(vec![format!(
            "<section data-template=\"{template_name}\">{company}</section>"
        )])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_render_embeds_data() {
        let renderer = InMemoryTemplateRenderer::new();
        let html = renderer
            .render("contract", "templates", &json!({"companyName": "Acme"}))
            .await
            .unwrap();

        assert_eq!(html.len(), 1);
        assert!(html[0].contains("Acme"));
        assert_eq!(renderer.rendered().await, vec!["contract"]);
    }

    #[tokio::test]
    async fn test_single_template_failure() {
        let renderer = InMemoryTemplateRenderer::new();
        renderer.fail_template("billing").await;

        assert!(renderer.render("billing", "t", &json!({})).await.is_err());
        assert!(renderer.render("contract", "t", &json!({})).await.is_ok());
    }
}
