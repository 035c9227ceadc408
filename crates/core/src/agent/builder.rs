use std::sync::Arc;

use react_agent_model::ModelProvider;

use super::{Agent, AgentInner};
use crate::config::AgentConfig;
use crate::model_client::ModelClient;
use crate::prompt::PromptTemplate;
use crate::scratchpad::ScratchpadEntry;
use crate::tool::{
    Registry, RegistryError, Tool, ToolObject, ToolObjectImpl,
};

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: Vec<Arc<dyn ToolObject>>,
    template: PromptTemplate,
    config: AgentConfig,
    on_step: Option<super::StepObserver>,
    on_model_delta: Option<super::DeltaObserver>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: vec![],
            template: PromptTemplate::builtin(),
            config: AgentConfig::default(),
            on_step: None,
            on_model_delta: None,
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(ToolObjectImpl(tool)));
        self
    }

    /// Replaces the built-in instruction template.
    #[inline]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Sets the agent configuration.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a callback invoked after every recorded loop iteration.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&ScratchpadEntry) + Send + Sync + 'static,
    ) -> Self {
        self.on_step = Some(Arc::new(on_step));
        self
    }

    /// Attaches a callback invoked with every streamed completion delta.
    #[inline]
    pub fn on_model_delta(
        mut self,
        on_model_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_model_delta = Some(Arc::new(on_model_delta));
        self
    }

    /// Builds the agent.
    ///
    /// Fails if two tools share a name.
    pub fn build(self) -> Result<Agent, RegistryError> {
        let AgentBuilder {
            model_client,
            tools,
            template,
            config,
            on_step,
            on_model_delta,
        } = self;

        let mut registry = Registry::default();
        for tool in tools {
            registry.register_object(tool)?;
        }
        debug!(
            "built agent with {} tools, template {}",
            registry.len(),
            PromptTemplate::VERSION
        );

        Ok(Agent {
            inner: Arc::new(AgentInner {
                model_client,
                tools: registry,
                template,
                config,
                on_step,
                on_model_delta,
            }),
        })
    }
}
