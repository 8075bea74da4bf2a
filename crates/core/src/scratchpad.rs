//! Step records of an agent run and their scratchpad rendering.

/// Tool name recorded for steps where the model output could not be parsed.
pub const EXCEPTION_TOOL: &str = "_Exception";

/// One Thought/Action/Observation cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentStep {
    /// The reasoning the model wrote before choosing the action.
    pub thought: String,
    /// The tool the model asked for, or [`EXCEPTION_TOOL`].
    pub tool: String,
    /// The raw tool input.
    pub tool_input: String,
    /// What the tool returned, or the error notice fed back to the model.
    pub observation: String,
    /// The raw model output this step was parsed from.
    pub log: String,
}

impl AgentStep {
    /// Returns `true` if this step records a parse failure.
    #[inline]
    pub fn is_exception(&self) -> bool {
        self.tool == EXCEPTION_TOOL
    }
}

/// Renders steps the way the model is asked to write them, ending with an
/// open `Thought: ` so the model continues from there.
pub fn format_scratchpad(steps: &[AgentStep]) -> String {
    let mut scratchpad = String::new();
    for step in steps {
        scratchpad.push_str(&step.log);
        scratchpad.push_str("\nObservation: ");
        scratchpad.push_str(&step.observation);
        scratchpad.push_str("\nThought: ");
    }
    scratchpad
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_scratchpad() {
        assert_eq!(format_scratchpad(&[]), "");

        let steps = [AgentStep {
            thought: "I should search.".to_owned(),
            tool: "search".to_owned(),
            tool_input: "rust 2024 edition".to_owned(),
            observation: "Released in February 2025.".to_owned(),
            log: "Thought: I should search.\nAction: search\nAction Input: rust 2024 edition"
                .to_owned(),
        }];
        assert_eq!(
            format_scratchpad(&steps),
            "Thought: I should search.\nAction: search\nAction Input: rust 2024 edition\nObservation: Released in February 2025.\nThought: "
        );
        assert!(!steps[0].is_exception());
    }
}
