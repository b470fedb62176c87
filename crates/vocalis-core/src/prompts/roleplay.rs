//! Role-play simulator prompt: produce the next line for whichever agent is due.
//!
//! The model answers with a JSON object `{"salesAgentResponse": "...", "consumerAgentResponse": "..."}`
//! where the agent that is not speaking gets an empty string.

/// System instruction for the generation model.
pub const ROLEPLAY_SYSTEM: &str = r#"You are an expert conversation simulator. Your task is to generate the next turn in a roleplay conversation between a sales agent and a consumer agent based on their defined prompts and the conversation history.

- Analyze the 'User Query' to understand whose turn it is and what the context is.
- Generate a response for ONLY the agent whose turn it is. The other agent's response should be an empty string.
- The response should be realistic, adhering to the agent's personality, goals, and communication style defined in their system prompt.
- Ensure responses include tone indicators like *confident* or *skeptical* at the beginning.
- If an agent decides the conversation is over (e.g., a meeting is booked), their response MUST include the word 'TERMINATE'.
- You must return a JSON object with exactly two string fields: "salesAgentResponse" and "consumerAgentResponse"."#;

/// User prompt template. `{knowledge}` expands to an empty string or a "Relevant knowledge" block.
pub const ROLEPLAY_USER_TEMPLATE: &str = r#"
Sales Agent System Prompt:
{sales_prompt}

Consumer Agent System Prompt:
{consumer_prompt}

External Knowledge URL (if provided): {knowledge_url}
{knowledge}
Conversation Context / User Query: 
{query}

Generate the next response in the conversation.
"#;

/// Build the user prompt for one generation call.
pub fn roleplay_user_prompt(
    sales_prompt: &str,
    consumer_prompt: &str,
    knowledge_url: &str,
    knowledge: Option<&str>,
    query: &str,
) -> String {
    let knowledge = match knowledge {
        Some(snippet) if !snippet.trim().is_empty() => {
            format!("\nRelevant knowledge:\n{}\n", snippet.trim())
        }
        _ => String::new(),
    };
    ROLEPLAY_USER_TEMPLATE
        .replace("{sales_prompt}", sales_prompt)
        .replace("{consumer_prompt}", consumer_prompt)
        .replace("{knowledge_url}", knowledge_url)
        .replace("{knowledge}", &knowledge)
        .replace("{query}", query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_block_only_when_present() {
        let without = roleplay_user_prompt("S", "C", "", None, "Q");
        assert!(!without.contains("Relevant knowledge"));
        assert!(without.contains("Sales Agent System Prompt:\nS"));

        let with = roleplay_user_prompt("S", "C", "https://kb", Some("pricing is flat"), "Q");
        assert!(with.contains("Relevant knowledge:\npricing is flat"));
        assert!(with.contains("External Knowledge URL (if provided): https://kb"));
    }
}
