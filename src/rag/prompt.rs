use crate::docs::QaRecord;

/// Builds the single-turn prompt sent upstream: system line, retrieved
/// Q/A pairs as context, then the user question.
pub fn compose_prompt(system_prompt: &str, question: &str, context: &[QaRecord]) -> String {
    let mut prompt = String::new();
    prompt.push_str(system_prompt.trim());
    prompt.push_str("\n\nHere is some relevant context:\n\n");
    for record in context {
        prompt.push_str(&format!("Q: {}\nA: {}\n\n", record.question, record.answer));
    }
    prompt.push_str(&format!("User Question: {}\nAnswer:", question.trim()));
    prompt
}
