//! Prompt templates for answering and summarization.

/// Template for question answering over retrieved context.
pub const QA_PROMPT_TEMPLATE: &str = "Use the following context to answer the question.
If you don't know the answer, say you don't know. Keep answers concise.

Context:
{context}

Question: {question}
Answer:";

/// Template for summarizing the whole corpus.
pub const SUMMARY_PROMPT_TEMPLATE: &str = "
Summarize the key points from these documents in 3-5 bullet points.
Focus on main themes, important conclusions, and actionable insights.

Documents:
{text}
";

/// Fill [`QA_PROMPT_TEMPLATE`].
pub fn render_qa_prompt(context: &str, question: &str) -> String {
    // Question first: placeholder text inside the context must survive untouched.
    QA_PROMPT_TEMPLATE.replacen("{question}", question, 1).replacen("{context}", context, 1)
}

/// Fill [`SUMMARY_PROMPT_TEMPLATE`].
pub fn render_summary_prompt(text: &str) -> String {
    SUMMARY_PROMPT_TEMPLATE.replacen("{text}", text, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qa_prompt_places_context_and_question() {
        let prompt = render_qa_prompt("The sky is blue.", "What color is the sky?");
        assert!(prompt.contains("Context:\nThe sky is blue.\n\nQuestion: What color is the sky?\nAnswer:"));
        assert!(prompt.contains("say you don't know"));
    }

    #[test]
    fn placeholders_in_context_are_left_alone() {
        let prompt = render_qa_prompt("literal {question} here", "q");
        assert!(prompt.contains("literal {question} here"));
    }

    #[test]
    fn summary_prompt_includes_text() {
        let prompt = render_summary_prompt("doc one\n\ndoc two");
        assert!(prompt.contains("Documents:\ndoc one\n\ndoc two\n"));
    }
}
