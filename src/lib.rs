pub mod chat;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod interaction_log;
pub mod prompts;
pub mod scraper;
pub mod session;
pub mod web_server;

pub use client::{ChatClient, ChatResponse, HttpChatClient};
pub use config::{Credentials, ServiceSettings};
pub use error::{ClientError, ConfigError, SessionError};
pub use history::{History, Role, TokenBudget, TokenEstimator, Turn, WordCountEstimator};
pub use prompts::{build_prompt, AnalysisOption, Overrides, TemplateSet};
pub use scraper::ResponseArtifacts;
pub use session::{Exchange, Session};
