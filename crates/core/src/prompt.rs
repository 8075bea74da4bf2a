//! The instruction template fed to the model on every iteration.

use research_agent_model::ModelMessage;

use crate::tool::ToolDescription;

const TOOLS_PLACEHOLDER: &str = "{tools}";
const TOOL_NAMES_PLACEHOLDER: &str = "{tool_names}";
const SCRATCHPAD_PLACEHOLDER: &str = "{agent_scratchpad}";

/// Instructions for an expert research assistant that searches the web for
/// anything it cannot answer from general knowledge.
pub const RESEARCH_INSTRUCTIONS: &str = "\
You are an expert research assistant. Your task is to accurately answer user questions. \
You **MUST** adhere to the specific ReAct format provided below for *every* step. \
You **MUST** use a search tool ({tool_names}) for any question requiring up-to-date or external information. \
Questions that only need general knowledge, such as definitions, can be answered directly. \
Provide a detailed, well-structured answer in **MARKDOWN** format with sources included.

**STOPPING CRITERION:** Once you have sufficient information to fully answer the user's request, \
you **MUST** immediately stop the action/observation loop and proceed to the Final Answer. \
Do NOT search again if the answer is complete.

The available tools are:
{tools}

The available tool names are: {tool_names}

--- START ReAct FORMAT INSTRUCTIONS ---
To answer, you must follow this exact sequence:
Thought: <Your internal reasoning>
Action: <Tool Name, one of [{tool_names}]>
Action Input: <Input for the tool>
Observation: <The tool's result>
... (repeat Thought/Action/Action Input/Observation cycle if necessary) ...
Thought: I now know the final answer
Final Answer: <The final, detailed answer to the user in clean Markdown>
--- END ReAct FORMAT INSTRUCTIONS ---

Never write the Observation yourself, it is provided after each Action.

{agent_scratchpad}";

/// A prompt template with `{tools}`, `{tool_names}` and `{agent_scratchpad}`
/// placeholders.
///
/// The rendered template becomes the system message and the question is sent
/// as the user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Creates a template from custom instruction text.
    #[inline]
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Renders the system instructions.
    pub fn render_instructions(
        &self,
        tools: &[ToolDescription],
        scratchpad: &str,
    ) -> String {
        let tool_lines = tools
            .iter()
            .map(|t| format!("{}: {}", t.name, t.description.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        // The scratchpad goes in last, so placeholders the model happened to
        // write are left alone.
        self.template
            .replace(TOOLS_PLACEHOLDER, &tool_lines)
            .replace(TOOL_NAMES_PLACEHOLDER, &tool_names)
            .replace(SCRATCHPAD_PLACEHOLDER, scratchpad)
    }

    /// Renders the messages for one model call.
    pub fn render(
        &self,
        tools: &[ToolDescription],
        scratchpad: &str,
        question: &str,
    ) -> Vec<ModelMessage> {
        vec![
            ModelMessage::System(self.render_instructions(tools, scratchpad)),
            ModelMessage::User(question.to_owned()),
        ]
    }
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self::new(RESEARCH_INSTRUCTIONS)
    }
}
