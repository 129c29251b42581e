// CV analysis: prompt assembly, the chat-model call, and the HTTP entry point.
// All chat-model calls go through llm_client.

pub mod handlers;
pub mod invoker;
pub mod prompts;
