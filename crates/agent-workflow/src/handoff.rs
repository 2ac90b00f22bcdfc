//! Stage handoff composition
//!
//! Each stage after the first receives an input composed from the original
//! request and the complete output of the previous stage. The phrasing is a
//! minijinja template so applications can tune it without touching the
//! workflow itself.

use agent_core::{Error, Result};
use minijinja::{Environment, context};

/// Default handoff: restate the request and embed the previous output verbatim
pub const DEFAULT_HANDOFF_TEMPLATE: &str = "{{ request }}\n\n\
Use the output of the previous step ({{ previous_agent }}) as your input:\n\n\
{{ previous_output }}";

/// Template rendering the input of stage `n + 1` from the output of stage `n`
///
/// Available variables:
/// - `request`: the workflow's original input
/// - `previous_output`: full, untruncated output of the previous stage
/// - `previous_agent`: display name of the previous stage
/// - `stage_index`: zero-based index of the stage being prepared
///
/// # Examples
///
/// ```
/// use agent_workflow::HandoffTemplate;
///
/// let template = HandoffTemplate::new("Assess the risk of: {{ previous_output }}").unwrap();
/// let input = template.render("ignored", "AAPL 40%", "Research", 1).unwrap();
/// assert_eq!(input, "Assess the risk of: AAPL 40%");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffTemplate {
    source: String,
}

impl Default for HandoffTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_HANDOFF_TEMPLATE.to_string(),
        }
    }
}

impl HandoffTemplate {
    /// Parse a template
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the template does not parse, or if
    /// it never references `previous_output` (the next stage would not see
    /// the previous stage's output at all).
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();

        let env = Environment::new();
        env.template_from_str(&source)
            .map_err(|e| Error::Configuration(format!("invalid handoff template: {e}")))?;

        if !source.contains("previous_output") {
            return Err(Error::Configuration(
                "handoff template must reference previous_output".to_string(),
            ));
        }

        Ok(Self { source })
    }

    /// The raw template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compose the input of the stage at `stage_index`
    pub fn render(
        &self,
        request: &str,
        previous_output: &str,
        previous_agent: &str,
        stage_index: usize,
    ) -> Result<String> {
        let env = Environment::new();
        env.render_str(
            &self.source,
            context! {
                request => request,
                previous_output => previous_output,
                previous_agent => previous_agent,
                stage_index => stage_index,
            },
        )
        .map_err(|e| Error::Configuration(format!("failed to render handoff template: {e}")))
    }
}
