//! HTTP client for the workspace backend.

use color_eyre::eyre::{eyre, Report};
use color_eyre::Result;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::cache::FetchError;
use crate::config::Config;

use super::types::{Conversation, Document, EmailMessage};
use super::wire::{ApiConversation, ApiDocument, ApiEmailMessage, ApiListResponse};

/// The backend rejected the session token.
///
/// Carried inside the [`Report`] chain so callers can distinguish an expired
/// session from an ordinary request failure.
#[derive(Debug)]
pub struct Unauthorized;

impl std::fmt::Display for Unauthorized {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "the API rejected the session token")
  }
}

impl std::error::Error for Unauthorized {}

/// Convert a client error into the form the cache controller consumes.
pub fn to_fetch_error(error: Report) -> FetchError {
  if error.downcast_ref::<Unauthorized>().is_some() {
    FetchError::Unauthorized
  } else {
    FetchError::Failed(error.to_string())
  }
}

/// Backend API client wrapper.
#[derive(Clone)]
pub struct Client {
  http: reqwest::Client,
  base: Url,
  token: String,
}

impl Client {
  /// Create a client with the token from the environment.
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::api_token()?;
    Self::with_token(config, token)
  }

  /// Create a client with an explicit token.
  pub fn with_token(config: &Config, token: String) -> Result<Self> {
    // Url::join treats a base without a trailing slash as a file, which
    // would drop the last path segment
    let mut base_url = config.api.base_url.clone();
    if !base_url.ends_with('/') {
      base_url.push('/');
    }

    let base = Url::parse(&base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.api.base_url, e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base,
      token,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid API path {}: {}", path, e))
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let url = self.endpoint(path)?;
    let response = self
      .http
      .get(url.clone())
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    let response = check_status(response)?;
    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }

  /// List all documents in display order.
  pub async fn list_documents(&self) -> Result<Vec<Document>> {
    let response: ApiListResponse<ApiDocument> = self.get_json("documents").await?;
    Ok(
      response
        .items
        .into_iter()
        .map(ApiDocument::into_document)
        .collect(),
    )
  }

  /// List all AI conversations, most recent first.
  pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
    let response: ApiListResponse<ApiConversation> = self.get_json("conversations").await?;
    Ok(
      response
        .items
        .into_iter()
        .map(ApiConversation::into_conversation)
        .collect(),
    )
  }

  /// List mirrored Gmail messages.
  pub async fn list_emails(&self) -> Result<Vec<EmailMessage>> {
    let response: ApiListResponse<ApiEmailMessage> = self.get_json("emails").await?;
    Ok(
      response
        .items
        .into_iter()
        .map(ApiEmailMessage::into_email)
        .collect(),
    )
  }

  /// Delete a document. On success the caller applies the matching
  /// optimistic removal.
  pub async fn delete_document(&self, id: &str) -> Result<()> {
    let url = self.endpoint(&format!("documents/{}", id))?;
    let response = self
      .http
      .delete(url.clone())
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    check_status(response)?;
    Ok(())
  }

  /// Set or clear the star on an email.
  pub async fn set_email_starred(&self, id: &str, starred: bool) -> Result<()> {
    let url = self.endpoint(&format!("emails/{}/star", id))?;
    let body = serde_json::json!({ "starred": starred });
    let response = self
      .http
      .put(url.clone())
      .bearer_auth(&self.token)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    check_status(response)?;
    Ok(())
  }

  /// Start a new conversation; the returned entity is what the caller
  /// prepends optimistically.
  pub async fn create_conversation(&self, title: &str) -> Result<Conversation> {
    let url = self.endpoint("conversations")?;
    let body = serde_json::json!({ "title": title });
    let response = self
      .http
      .post(url.clone())
      .bearer_auth(&self.token)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    let response = check_status(response)?;
    let conversation: ApiConversation = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))?;
    Ok(conversation.into_conversation())
  }

  /// Append a message to a conversation.
  pub async fn append_message(&self, conversation_id: &str, content: &str) -> Result<()> {
    let url = self.endpoint(&format!("conversations/{}/messages", conversation_id))?;
    let body = serde_json::json!({ "content": content });
    let response = self
      .http
      .post(url.clone())
      .bearer_auth(&self.token)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    check_status(response)?;
    Ok(())
  }
}

fn check_status(response: Response) -> Result<Response> {
  if response.status() == StatusCode::UNAUTHORIZED {
    return Err(Report::new(Unauthorized));
  }
  if !response.status().is_success() {
    return Err(eyre!(
      "API returned status {} for {}",
      response.status(),
      response.url()
    ));
  }
  Ok(response)
}
