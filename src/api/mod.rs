//! Typed wrappers over the backend's authenticated endpoints

mod chat;
mod feed;
mod knowledge;
mod video;

pub use chat::{
    ArchiveResult, Capabilities, ChatApi, NewSession, SessionHistory, SessionList, SessionReset,
    SupportedTask, SystemStatus,
};
pub use feed::FeedApi;
pub use knowledge::{KnowledgeApi, KnowledgeItem, KnowledgeQuery};
pub use video::{VideoAnalysis, VideoApi};
