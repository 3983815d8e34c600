//! Conversation gateway
//!
//! Front-end HTTP service: validates chat requests, assembles prompts from
//! persona style, shared memory and recent history, calls the generation
//! and speech services, and records turns through the memory proxy.

pub mod api;
pub mod conversation;
pub mod gemini;
pub mod memory_client;
pub mod reply;
pub mod speech;

pub use api::{create_router, start_server};
pub use conversation::{ConversationService, TurnOutcome};
pub use gemini::{GeminiClient, TextGenerator};
pub use memory_client::{MemoryApi, MemoryProxyClient};
pub use reply::ReplyGenerator;
pub use speech::{SpeechClient, Transcriber};
