use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use minijinja::{context, Environment};
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::config::{Credentials, ServiceSettings};
use crate::constants;
use crate::error::ClientError;
use crate::prompts::Overrides;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// A reply from the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub message: String,
}

/// Conversation-level operations of the remote chat service.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a fresh conversation; later calls are scoped to it.
    async fn new_conversation(&mut self) -> Result<(), ClientError>;

    /// Attaches a data file to the current conversation.
    async fn upload_file(&self, path: &Path) -> Result<(), ClientError>;

    async fn get_response(
        &self,
        prompt: &str,
        overrides: &Overrides,
        timeout: Duration,
    ) -> Result<ChatResponse, ClientError>;
}

/// Path templates, relative to the service endpoint. `{{conversation_id}}` and
/// `{{app_id}}` are filled in per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth: String,
    pub new_conversation: String,
    pub temp_file: String,
    pub chat: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: "/auth/token".to_string(),
            new_conversation: "/chat/conversation?app_id={{app_id}}".to_string(),
            temp_file: "/chat/temp_file?conversation_id={{conversation_id}}&app_id={{app_id}}"
                .to_string(),
            chat: "/chat/response?conversation_id={{conversation_id}}&app_id={{app_id}}"
                .to_string(),
        }
    }
}

impl Endpoints {
    pub fn with_temp_file(mut self, template: impl Into<String>) -> Self {
        self.temp_file = template.into();
        self
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_pass: &'a str,
    client_secret: &'a str,
    app_id: u32,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ConversationResponse {
    conversation_id: String,
}

#[derive(Serialize)]
struct ResponseRequest<'a> {
    prompt: &'a str,
    overrides: &'a Overrides,
}

/// HTTP implementation of [`ChatClient`].
pub struct HttpChatClient {
    http: Client,
    endpoint: String,
    endpoints: Endpoints,
    subscription_key: String,
    access_token: String,
    application_id: u32,
    conversation_id: Option<String>,
    paths: Environment<'static>,
}

/// Builds an authenticated client. Bad credentials or an unreachable service fail here.
#[instrument(skip_all, fields(endpoint = %settings.endpoint))]
pub async fn connect(
    credentials: &Credentials,
    settings: &ServiceSettings,
) -> Result<HttpChatClient, ClientError> {
    let endpoints = Endpoints::default().with_temp_file(constants::TEMP_FILE_ENDPOINT);
    connect_with_endpoints(credentials, settings, endpoints).await
}

pub async fn connect_with_endpoints(
    credentials: &Credentials,
    settings: &ServiceSettings,
    endpoints: Endpoints,
) -> Result<HttpChatClient, ClientError> {
    let mut builder = Client::builder();
    if let Some(proxy) = &settings.proxy {
        debug!(%proxy, "Routing chat service traffic through proxy");
        builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(ClientError::Build)?);
    }
    let http = builder.build().map_err(ClientError::Build)?;

    let mut client = HttpChatClient {
        http,
        endpoint: settings.endpoint.trim_end_matches('/').to_string(),
        endpoints,
        subscription_key: credentials.subscription_key.clone(),
        access_token: String::new(),
        application_id: settings.application_id,
        conversation_id: None,
        paths: Environment::new(),
    };

    let url = client.url(&client.endpoints.auth.clone())?;
    let request = client
        .http
        .post(&url)
        .header(SUBSCRIPTION_KEY_HEADER, &client.subscription_key)
        .json(&TokenRequest {
            client_id: &credentials.client_id,
            client_pass: &credentials.client_pass,
            client_secret: &credentials.client_secret,
            app_id: settings.application_id,
        });
    let token: TokenResponse = send_json(request, &url).await?;
    client.access_token = token.access_token;
    info!(app_id = settings.application_id, "Authenticated with chat service");
    Ok(client)
}

impl HttpChatClient {
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    fn url(&self, template: &str) -> Result<String, ClientError> {
        let path = self
            .paths
            .render_str(
                template,
                context! {
                    conversation_id => self.conversation_id.as_deref().unwrap_or_default(),
                    app_id => self.application_id,
                },
            )
            .map_err(|source| ClientError::Endpoint {
                template: template.to_string(),
                source,
            })?;
        Ok(format!("{}{}", self.endpoint, path))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .bearer_auth(&self.access_token)
    }

    fn require_conversation(&self) -> Result<(), ClientError> {
        match self.conversation_id {
            Some(_) => Ok(()),
            None => Err(ClientError::NoConversation),
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    #[instrument(skip(self))]
    async fn new_conversation(&mut self) -> Result<(), ClientError> {
        let url = self.url(&self.endpoints.new_conversation)?;
        let created: ConversationResponse = send_json(self.post(&url), &url).await?;
        info!(conversation_id = %created.conversation_id, "Started new conversation");
        self.conversation_id = Some(created.conversation_id);
        Ok(())
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn upload_file(&self, path: &Path) -> Result<(), ClientError> {
        self.require_conversation()?;
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let size = bytes.len();
        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let url = self.url(&self.endpoints.temp_file)?;
        let response = self
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;
        check_status(response, &url).await?;
        info!(size, "Uploaded file");
        Ok(())
    }

    #[instrument(skip(self, prompt, overrides), fields(prompt_len = prompt.len()))]
    async fn get_response(
        &self,
        prompt: &str,
        overrides: &Overrides,
        timeout: Duration,
    ) -> Result<ChatResponse, ClientError> {
        self.require_conversation()?;
        let url = self.url(&self.endpoints.chat)?;
        let request = self
            .post(&url)
            .timeout(timeout)
            .json(&ResponseRequest { prompt, overrides });
        let response: ChatResponse = send_json(request, &url).await?;
        debug!(response = %response.message, "Received chat response");
        Ok(response)
    }
}

async fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    error!(%status, %body, %url, "Chat service request failed");
    Err(ClientError::Status {
        url: url.to_string(),
        status,
        body,
    })
}

async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, ClientError> {
    let response = request.send().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;
    check_status(response, url)
        .await?
        .json::<T>()
        .await
        .map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
}
