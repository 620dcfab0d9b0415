//! Persistence/auth collaborator
//!
//! [`DashApi`] lists every call the dashboard makes against the storage
//! backend. [`RestClient`] binds it to the REST API: each response is a JSON
//! envelope `{ status, message?, code?, data? }` and anything but
//! `status == "ok"` is an error. Calls after login carry the session id as a
//! `sid` query or path parameter. A 401 drops the stored session.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::document::EntitiesDoc;
use crate::entity::{EnumDecl, StreamDecl};
use crate::errors::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3001/mlndash-test";

/// Authenticated session returned by `/login`
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(alias = "session_id")]
    pub sid: String,
    pub username: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub phone_no: Option<String>,
}

/// One entry of a remote directory listing
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct DirEntry {
    pub dir: String,
    #[serde(default)]
    pub is_file: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub list: Vec<DirEntry>,
    #[serde(default)]
    pub cwd: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FileContent {
    pub filename: String,
    pub file_content: String,
    #[serde(default)]
    pub log: Option<Value>,
    #[serde(default)]
    pub alert_message: Option<String>,
}

/// Calls the dashboard makes against the persistence/auth backend
#[async_trait]
pub trait DashApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> ApiResult<Session>;

    async fn register(&self, registration: &Registration) -> ApiResult<()>;

    async fn logout(&self) -> ApiResult<()>;

    /// `false` without a stored session
    async fn is_logged_in(&self) -> ApiResult<bool>;

    async fn get_profile(&self) -> ApiResult<Profile>;

    async fn delete_account(&self) -> ApiResult<()>;

    async fn list_directory(&self) -> ApiResult<Listing>;

    async fn create_directory(&self, folder: &str) -> ApiResult<()>;

    async fn delete_file(&self, name: &str) -> ApiResult<()>;

    async fn get_file_content(&self, name: &str) -> ApiResult<FileContent>;

    /// Returns the new working directory when the server reports one
    async fn navigate_to_child_dir(&self, folder: &str) -> ApiResult<Option<String>>;

    async fn navigate_to_parent_dir(&self) -> ApiResult<Option<String>>;

    async fn get_all_streams(&self) -> ApiResult<Vec<StreamDecl>>;

    async fn get_all_enums(&self) -> ApiResult<Vec<EnumDecl>>;

    async fn get_all_queries(&self) -> ApiResult<Vec<Value>>;

    async fn create_entities(&self, entities: &EntitiesDoc) -> ApiResult<()>;

    async fn update_entities(&self, entities: &EntitiesDoc) -> ApiResult<()>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// REST binding of [`DashApi`]
#[derive(Debug)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let parsed =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parsed,
            session: RwLock::new(None),
        })
    }

    pub fn with_session(self, session: Option<Session>) -> Self {
        self.set_session(session);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    pub fn clear_session(&self) {
        self.set_session(None);
    }

    fn sid(&self) -> ApiResult<String> {
        self.session()
            .map(|s| s.sid)
            .ok_or(ApiError::NotLoggedIn)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and unwrap the envelope's `data`
    async fn call(&self, request: RequestBuilder) -> ApiResult<Option<Value>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let envelope = serde_json::from_str::<Envelope>(&body);

        if status == StatusCode::UNAUTHORIZED {
            warn!("Unauthorized response, clearing session");
            self.clear_session();
            let message = envelope
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "unauthorized".to_string());
            return Err(ApiError::Unauthorized(message));
        }

        let envelope = match envelope {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Rejected {
                    status: Some(status.as_u16()),
                    code: None,
                    message: format!("Request failed with status {}", status),
                })
            }
            Err(e) => return Err(ApiError::Decode(e.to_string())),
        };

        if !status.is_success() || envelope.status != "ok" {
            return Err(ApiError::Rejected {
                status: Some(status.as_u16()),
                code: envelope.code,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("Request failed with status {}", status)),
            });
        }
        Ok(envelope.data)
    }

    async fn data_field<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        key: &str,
    ) -> ApiResult<T> {
        let data = self.call(request).await?;
        let value = data
            .and_then(|mut d| d.get_mut(key).map(Value::take))
            .ok_or_else(|| ApiError::Decode(format!("missing data.{}", key)))?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let data = self
            .call(request)
            .await?
            .ok_or_else(|| ApiError::Decode("missing data".to_string()))?;
        serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn cwd(&self, request: RequestBuilder) -> ApiResult<Option<String>> {
        let data = self.call(request).await?;
        Ok(data
            .as_ref()
            .and_then(|d| d.get("cwd"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[async_trait]
impl DashApi for RestClient {
    async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        let request = self
            .client
            .post(self.endpoint(&["login"]))
            .json(&json!({ "username": username, "password": password }));
        let session: Session = self.data(request).await?;
        debug!(username = %session.username, "Logged in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn register(&self, registration: &Registration) -> ApiResult<()> {
        let request = self
            .client
            .post(self.endpoint(&["register"]))
            .json(registration);
        self.call(request).await.map(|_| ())
    }

    async fn logout(&self) -> ApiResult<()> {
        let sid = self.sid()?;
        let request = self
            .client
            .post(self.endpoint(&["logout"]))
            .query(&[("sid", sid.as_str())])
            .json(&json!({}));
        self.call(request).await?;
        self.clear_session();
        Ok(())
    }

    async fn is_logged_in(&self) -> ApiResult<bool> {
        let Ok(sid) = self.sid() else {
            return Ok(false);
        };
        let request = self
            .client
            .get(self.endpoint(&["authtest"]))
            .query(&[("sid", sid.as_str())]);
        match self.call(request).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_unauthorized() => Ok(false),
            Err(err) => {
                self.clear_session();
                Err(err)
            }
        }
    }

    async fn get_profile(&self) -> ApiResult<Profile> {
        let sid = self.sid()?;
        self.data(self.client.get(self.endpoint(&["user-profile", sid.as_str()])))
            .await
    }

    async fn delete_account(&self) -> ApiResult<()> {
        let sid = self.sid()?;
        let request = self
            .client
            .post(self.endpoint(&["delete"]))
            .query(&[("sid", sid.as_str())])
            .json(&json!({}));
        self.call(request).await?;
        self.clear_session();
        Ok(())
    }

    async fn list_directory(&self) -> ApiResult<Listing> {
        let sid = self.sid()?;
        self.data(self.client.get(self.endpoint(&["listdr", sid.as_str()])))
            .await
    }

    async fn create_directory(&self, folder: &str) -> ApiResult<()> {
        let sid = self.sid()?;
        let request = self
            .client
            .post(self.endpoint(&["createdr", folder, sid.as_str()]))
            .json(&json!({}));
        self.call(request).await.map(|_| ())
    }

    async fn delete_file(&self, name: &str) -> ApiResult<()> {
        let sid = self.sid()?;
        let request = self
            .client
            .delete(self.endpoint(&["files", name]))
            .query(&[("sid", sid.as_str())]);
        self.call(request).await.map(|_| ())
    }

    async fn get_file_content(&self, name: &str) -> ApiResult<FileContent> {
        let sid = self.sid()?;
        let request = self
            .client
            .get(self.endpoint(&["filecontent"]))
            .query(&[("sid", sid.as_str()), ("file", name)]);
        self.data(request).await
    }

    async fn navigate_to_child_dir(&self, folder: &str) -> ApiResult<Option<String>> {
        let sid = self.sid()?;
        self.cwd(self.client.get(self.endpoint(&["changedr", folder, sid.as_str()])))
            .await
    }

    async fn navigate_to_parent_dir(&self) -> ApiResult<Option<String>> {
        let sid = self.sid()?;
        self.cwd(self.client.get(self.endpoint(&["back", sid.as_str()])))
            .await
    }

    async fn get_all_streams(&self) -> ApiResult<Vec<StreamDecl>> {
        let sid = self.sid()?;
        let request = self
            .client
            .get(self.endpoint(&["files", "streams"]))
            .query(&[("sid", sid.as_str())]);
        self.data_field(request, "streams").await
    }

    async fn get_all_enums(&self) -> ApiResult<Vec<EnumDecl>> {
        let sid = self.sid()?;
        let request = self
            .client
            .get(self.endpoint(&["files", "enums"]))
            .query(&[("sid", sid.as_str())]);
        self.data_field(request, "enums").await
    }

    async fn get_all_queries(&self) -> ApiResult<Vec<Value>> {
        let sid = self.sid()?;
        let request = self
            .client
            .get(self.endpoint(&["files", "queries"]))
            .query(&[("sid", sid.as_str())]);
        self.data_field(request, "queries").await
    }

    async fn create_entities(&self, entities: &EntitiesDoc) -> ApiResult<()> {
        let sid = self.sid()?;
        let request = self
            .client
            .post(self.endpoint(&["files", "entities"]))
            .query(&[("sid", sid.as_str())])
            .json(&json!({ "entities": entities }));
        self.call(request).await?;
        debug!(entities = entities.len(), "Entities created");
        Ok(())
    }

    async fn update_entities(&self, entities: &EntitiesDoc) -> ApiResult<()> {
        let sid = self.sid()?;
        let request = self
            .client
            .patch(self.endpoint(&["files", "entities"]))
            .query(&[("sid", sid.as_str())])
            .json(&json!({ "entities": entities }));
        self.call(request).await?;
        debug!(entities = entities.len(), "Entities updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestClient {
        RestClient::new(DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client();
        assert_eq!(
            client.endpoint(&["changedr", "my dir", "abc"]).as_str(),
            "http://127.0.0.1:3001/mlndash-test/changedr/my%20dir/abc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = RestClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_session_roundtrip() {
        let client = client().with_session(Some(Session {
            sid: "s1".to_string(),
            username: "ada".to_string(),
        }));
        assert_eq!(client.sid().unwrap(), "s1");
        client.clear_session();
        assert!(matches!(client.sid(), Err(ApiError::NotLoggedIn)));
    }

    #[test]
    fn test_calls_without_session_fail_fast() {
        let client = client();
        assert!(!tokio_test::block_on(client.is_logged_in()).unwrap());
        assert!(matches!(
            tokio_test::block_on(client.list_directory()),
            Err(ApiError::NotLoggedIn)
        ));
    }

    #[test]
    fn test_session_accepts_login_payload() {
        let session: Session =
            serde_json::from_value(json!({ "session_id": "abc", "username": "ada" })).unwrap();
        assert_eq!(session.sid, "abc");
    }
}
