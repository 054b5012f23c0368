/// Builds the single-turn prompt sent to the provider.
///
/// The knowledge text is cut to at most `max_knowledge_chars` characters; the
/// customer message is embedded verbatim.
pub fn build_prompt(
    knowledge: &str,
    user_message: &str,
    language: &str,
    max_knowledge_chars: usize,
) -> String {
    let knowledge = truncate_chars(knowledge.trim(), max_knowledge_chars);
    format!(
        "You are a customer support assistant. Answer the customer's question using only \
         the information in the knowledge base below. If the knowledge base does not contain \
         the answer, say that you do not know and that a staff member will follow up. \
         Always answer in {language}.\n\n\
         Knowledge base:\n\"\"\"\n{knowledge}\n\"\"\"\n\n\
         Customer message:\n\"\"\"\n{user_message}\n\"\"\"\n\n\
         Answer:"
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
