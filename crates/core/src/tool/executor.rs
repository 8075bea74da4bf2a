use tracing::Instrument;

use crate::tool::{AnyTool, Tool, ToolDescription, ToolObject, ToolResult};

/// An executor that dispatches actions from the model to registered tools.
///
/// Tools keep their registration order, which is also the order they are
/// listed in the prompt.
#[derive(Default)]
pub struct Executor {
    tools: Vec<Box<dyn ToolObject>>,
}

impl Executor {
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if let Some(idx) = self.tools.iter().position(|t| t.name() == name) {
            warn!("tool registered twice, replacing: {name}");
            self.tools[idx] = Box::new(AnyTool(tool));
            return;
        }
        self.tools.push(Box::new(AnyTool(tool)));
    }

    #[inline]
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.tools
            .iter()
            .map(|tool| ToolDescription {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
            })
            .collect()
    }

    #[inline]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Runs the named tool, returning `None` if there is no such tool.
    pub async fn execute(&self, name: &str, raw_input: &str) -> Option<ToolResult> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!("tool not found: {name}");
            return None;
        };
        trace!("running tool {name} with input: {raw_input:?}");
        let result = tool
            .execute(raw_input)
            .instrument(debug_span!("tool execute", tool = name))
            .await;
        if let Err(err) = &result {
            debug!("tool {name} failed: {err}");
        }
        Some(result)
    }
}
