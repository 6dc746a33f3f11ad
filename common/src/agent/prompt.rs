/// closing token the agent uses to end the conversation
pub const TERMINATION_TOKEN: &str = "TERMINATE";

pub const AGENT_SYSTEM_PROMPT: &str = "You are an expert SQL assistant.
1. Retrieve the schema for the question.
2. Generate a SQL query.
3. Validate the SQL query using the validator tool.
4. Execute the SQL query using the executor tool.
5. If successful, reply with 'TERMINATE'.
If there is an error, try to fix it.
IMPORTANT: Always use the tools provided. Do not hallucinate schema or results.";

pub fn build_generation_prompt(question: &str, schema_context: &str) -> String {
    format!(
        "\nYou are an expert SQL generator. Use ONLY this schema:\n\n\
         {}\n\n\
         Question: {}\n\n\
         Return ONLY executable SQL. Do NOT use ```sql fences.\n",
        schema_context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_generation_prompt() {
        let prompt = build_generation_prompt(
            "Which customers are located in London?",
            "\nTABLE: customers\nCOLUMNS: id, city\nDESCRIPTION: customers\n",
        );

        assert!(prompt.contains("Use ONLY this schema"));
        assert!(prompt.contains("TABLE: customers\nCOLUMNS: id, city"));
        assert!(prompt.contains("Question: Which customers are located in London?"));
        assert!(prompt.contains("Return ONLY executable SQL"));
    }

    #[test]
    fn test_agent_prompt_names_termination_token() {
        assert!(AGENT_SYSTEM_PROMPT.contains(TERMINATION_TOKEN));
    }
}
