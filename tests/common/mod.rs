#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pm_optimizer::{ChatClient, ChatResponse, ClientError, Overrides, ServiceSettings};

pub const IMAGE_BASE: &str = "https://uat-shell-e-chat.shell.com/api";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NewConversation,
    Upload(PathBuf),
    Response(String),
}

/// Scripted stand-in for the chat service.
pub struct FakeClient {
    calls: Arc<Mutex<Vec<Call>>>,
    replies: Mutex<VecDeque<String>>,
    upload_failures: Mutex<usize>,
    response_failures: Mutex<usize>,
    overrides: Arc<Mutex<Vec<Overrides>>>,
}

impl FakeClient {
    pub fn new(replies: &[&str]) -> (Self, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let client = Self {
            calls: calls.clone(),
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            upload_failures: Mutex::new(0),
            response_failures: Mutex::new(0),
            overrides: Arc::new(Mutex::new(Vec::new())),
        };
        (client, calls)
    }

    /// The first `n` uploads fail.
    pub fn failing_uploads(self, n: usize) -> Self {
        *self.upload_failures.lock().unwrap() = n;
        self
    }

    /// The first `n` response calls fail without consuming a scripted reply.
    pub fn failing_responses(self, n: usize) -> Self {
        *self.response_failures.lock().unwrap() = n;
        self
    }

    /// Overrides passed to each response call, in order.
    pub fn overrides_seen(&self) -> Arc<Mutex<Vec<Overrides>>> {
        self.overrides.clone()
    }
}

fn unavailable(body: &str) -> ClientError {
    ClientError::Status {
        url: "http://fake/chat/response".to_string(),
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        body: body.to_string(),
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    async fn new_conversation(&mut self) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::NewConversation);
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::Upload(path.to_path_buf()));
        let mut failures = self.upload_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ClientError::File {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }
        Ok(())
    }

    async fn get_response(
        &self,
        prompt: &str,
        overrides: &Overrides,
        _timeout: Duration,
    ) -> Result<ChatResponse, ClientError> {
        self.calls.lock().unwrap().push(Call::Response(prompt.to_string()));
        self.overrides.lock().unwrap().push(overrides.clone());
        let mut failures = self.response_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(unavailable("service busy"));
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(message) => Ok(ChatResponse { message }),
            None => Err(unavailable("no scripted reply")),
        }
    }
}

pub fn settings() -> ServiceSettings {
    let mut settings = ServiceSettings::direct("http://127.0.0.1:9");
    settings.image_base_url = IMAGE_BASE.to_string();
    settings.application_id = 47;
    settings
}

pub fn prompts_sent(calls: &Arc<Mutex<Vec<Call>>>) -> Vec<String> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            Call::Response(p) => Some(p.clone()),
            _ => None,
        })
        .collect()
}
