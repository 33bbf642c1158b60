//! One user's conversation: client handle, history and turn handling.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::config::ServiceSettings;
use crate::error::SessionError;
use crate::history::{History, TokenBudget, Turn};
use crate::interaction_log::InteractionLog;
use crate::prompts::{build_prompt, AnalysisOption, Overrides, TemplateSet};
use crate::scraper::{annotate, ResponseArtifacts};

/// The outcome of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// The prompt string that was sent.
    pub prompt: String,
    pub response: String,
    pub artifacts: ResponseArtifacts,
}

pub struct Session {
    client: Box<dyn ChatClient>,
    history: History,
    budget: TokenBudget,
    overrides: Overrides,
    templates: TemplateSet,
    image_base_url: String,
    response_timeout: Duration,
    started: bool,
    log: Option<InteractionLog>,
}

impl Session {
    pub fn new(
        client: Box<dyn ChatClient>,
        settings: &ServiceSettings,
        templates: TemplateSet,
    ) -> Self {
        Self {
            client,
            history: History::new(),
            budget: TokenBudget::default(),
            overrides: Overrides::for_templates(templates),
            templates,
            image_base_url: settings.image_base_url.clone(),
            response_timeout: settings.response_timeout,
            started: false,
            log: None,
        }
    }

    pub fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_interaction_log(mut self, log: InteractionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Opens a conversation, uploads `file` and sends the opening prompt for `option`.
    ///
    /// An upload failure is returned as [`SessionError::Upload`]. Any failure, including
    /// a failed opening turn, leaves the session unstarted with an empty history so the
    /// caller can try again.
    pub async fn start(
        &mut self,
        option: AnalysisOption,
        file: &Path,
    ) -> Result<Exchange, SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }

        self.client.new_conversation().await?;
        if let Err(e) = self.client.upload_file(file).await {
            warn!(file = %file.display(), error = %e, "File upload failed");
            self.record("error", &format!("Error uploading file: {}", e));
            return Err(SessionError::Upload(e));
        }
        debug!(file = %file.display(), "Uploaded file");

        self.history.clear();
        self.started = true;
        info!(option = %option, file = %file.display(), "Conversation started");
        let started = format!("Conversation started: {} ({})", option, file.display());
        self.record("session", &started);

        let prompt = build_prompt(self.templates, option.number(), None);
        self.history.append(Turn::user(prompt.clone()));
        self.record("user", &prompt);
        match self.exchange(prompt).await {
            Ok(exchange) => Ok(exchange),
            Err(e) => {
                warn!(error = %e, "Opening turn failed; conversation not started");
                self.record("error", &format!("Opening turn failed: {}", e));
                self.started = false;
                self.history.clear();
                Err(e)
            }
        }
    }

    /// Sends a follow-up message with the (truncated) history as context.
    pub async fn send(&mut self, message: &str) -> Result<Exchange, SessionError> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }

        self.history.append(Turn::user(message));
        self.record("user", message);
        self.history.truncate(&self.budget);
        let prompt = self.history.prompt_string();
        debug!(%prompt, "Prompt string");
        self.exchange(prompt).await
    }

    /// Ends the conversation and forgets its history.
    pub fn end(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.history.clear();
        info!("Conversation ended");
        self.record("session", "Conversation ended");
    }

    async fn exchange(&mut self, prompt: String) -> Result<Exchange, SessionError> {
        let response = self
            .client
            .get_response(&prompt, &self.overrides, self.response_timeout)
            .await?;
        let message = response.message;
        self.history.append(Turn::assistant(message.clone()));
        self.record("assistant", &message);

        let artifacts = annotate(&message, &self.image_base_url);
        if let Some(url) = &artifacts.image_url {
            self.record("image", url);
        }
        if let Some(summary) = &artifacts.executive_summary {
            self.record("summary", summary);
        }

        Ok(Exchange {
            prompt,
            response: message,
            artifacts,
        })
    }

    fn record(&mut self, kind: &str, text: &str) {
        if let Some(log) = self.log.as_mut() {
            log.record_or_warn(kind, text);
        }
    }
}
