pub mod admin;
pub mod history;
pub mod log;
pub mod manager;
pub mod store;
pub mod types;
pub mod window;

pub use admin::SessionAdmin;
pub use history::{format_history, render_history};
pub use log::{LogOptions, MessageLog};
pub use manager::ConversationManager;
pub use store::{InMemoryBackend, JsonDirBackend, SessionBackend};
pub use types::{Message, MessageRole, Session, SessionSummary};
pub use window::{build_context_window, compose_window};
