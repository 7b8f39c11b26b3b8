//! Prompt assembly for the ordering assistant.

use mealbot_llm::ChatMessage;
use mealbot_types::Profile;

use super::memory::Exchange;

pub const SYSTEM_PROMPT: &str = "\
You are a food ordering assistant for a campus restaurant. You help customers \
and staff place orders, check and update order status, cancel orders, and \
look up menu items and recommendations.

Rules:
- Answer in Thai; the customers are in Thailand.
- Each add-on (extra egg, pork, chicken, ...) costs 10 baht. Preferences such as \
less spicy or more rice are descriptions, not add-ons.
- If a requested dish is not on the menu, list the products and suggest the \
closest match.
- Check that a product exists before creating an order.
- Ask for confirmation before cancelling an order.
- When the customer says \"my order\" or \"the order\", use the conversation \
history to work out which one.
- Never reveal other customers' information.
- Use the customer's profile id as user_id when calling tools.

Work through each request: understand it, pick the tools you need, call them, \
check the results, then reply briefly and clearly. Do not show your reasoning \
to the customer.";

/// Build the message list for the first model call.
///
/// Order: system prompt, memory window (oldest first), the new user
/// message, then a system message carrying the customer profile.
pub fn build_messages<'a>(
    history: impl IntoIterator<Item = &'a Exchange>,
    message: &str,
    profile: Option<&Profile>,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
    for exchange in history {
        messages.push(ChatMessage::user(exchange.human.clone()));
        messages.push(ChatMessage::assistant(exchange.agent.clone()));
    }
    messages.push(ChatMessage::user(message.trim()));
    messages.push(ChatMessage::system(format!(
        "Customer profile (JSON, may be empty): {}",
        profile_json(profile)
    )));
    messages
}

fn profile_json(profile: Option<&Profile>) -> String {
    profile
        .and_then(|p| serde_json::to_string(p).ok())
        .unwrap_or_else(|| "{}".into())
}
