#![allow(clippy::missing_docs_in_private_items)]

pub mod answer_retrieval;
pub mod completion;
pub mod conversation;
pub mod session;

pub use answer_retrieval::{AnsweringPipeline, QueryAnswer};
pub use completion::CompletionProvider;
pub use conversation::{ConversationLog, ConversationTurn};
pub use session::{SessionCache, SessionKey};
