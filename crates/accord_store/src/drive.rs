//! Google Drive v3 REST client over blocking `reqwest`.
//!
//! Every call is awaited in place; there is no retry loop here. Failures are
//! turned into [`RemoteError`] through [`classify_remote_error`] using the
//! `{"error": {"code", "message", "errors": [{"reason"}]}}` body Drive sends.
//!
//! [`classify_remote_error`]: crate::error::classify_remote_error

use crate::error::{RemoteError, RemoteErrorKind};
use crate::remote::{NewFile, RemoteFile, RemoteMetadata, RemoteResult, RemoteStore};
use crate::token::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource};
use accord_ids::{FileId, FolderId};
use accord_protocol::defaults::DEFAULT_TOKEN_URI;
use accord_protocol::{mime, StoreConfig};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const FILES_PATH: &str = "/drive/v3/files";
const UPLOAD_PATH: &str = "/upload/drive/v3/files";
const UPLOAD_FIELDS: &str = "id,webViewLink,webContentLink,mimeType";
const METADATA_FIELDS: &str = "id,name,mimeType,parents,owners(emailAddress)";
const DRIVE_WEB_BASE: &str = "https://drive.google.com";

pub struct DriveStore {
    http: Client,
    api_base: String,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for DriveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveStore")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    web_content_link: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFolder {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Owner {
    #[serde(default)]
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    owners: Vec<Owner>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

impl DriveStore {
    pub fn new(api_base: impl Into<String>, tokens: Arc<dyn TokenSource>, timeout: Duration) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self::with_client(http, api_base, tokens))
    }

    /// Build the client from config: a static access token wins over a
    /// service-account key file.
    pub fn from_config(config: &StoreConfig) -> RemoteResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let tokens: Arc<dyn TokenSource> = match (&config.access_token, &config.credentials) {
            (Some(token), _) if !token.trim().is_empty() => Arc::new(StaticToken::new(token.trim())),
            (_, Some(path)) => {
                let key = ServiceAccountKey::from_file(path)?;
                let http = Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| RemoteError::transport(format!("cannot build HTTP client: {}", e)))?;
                Arc::new(ServiceAccountTokenSource::new(key, &config.scope, DEFAULT_TOKEN_URI, http))
            }
            _ => {
                return Err(RemoteError::new(
                    RemoteErrorKind::Unauthorized,
                    "no access token or service-account credentials configured",
                ))
            }
        };
        Self::new(&config.api_base, tokens, timeout)
    }

    pub fn with_client(http: Client, api_base: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn item_url(&self, item_id: &str) -> String {
        format!("{}{}/{}", self.api_base, FILES_PATH, item_id)
    }

    fn send(&self, request: RequestBuilder, what: &str) -> RemoteResult<Response> {
        let token = self.tokens.access_token()?;
        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| RemoteError::transport(format!("{} failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let error = error_from_body(status.as_u16(), &body);
        debug!("{} rejected ({}): {}", what, status.as_u16(), error.message);
        Err(error)
    }

    fn parse<T: DeserializeOwned>(response: Response, what: &str) -> RemoteResult<T> {
        let status = response.status().as_u16();
        response.json().map_err(|e| RemoteError {
            kind: RemoteErrorKind::Other,
            message: format!("unexpected {} response: {}", what, e),
            status: Some(status),
        })
    }
}

impl RemoteStore for DriveStore {
    fn create_file(&self, file: &NewFile<'_>) -> RemoteResult<RemoteFile> {
        let metadata = json!({
            "name": file.name,
            "parents": [file.parent.as_str()],
            "mimeType": file.target_mime,
        });
        let boundary = format!("accord-{}", Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, file.source_mime, file.binary);

        let request = self
            .http
            .post(self.url(UPLOAD_PATH))
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", UPLOAD_FIELDS),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let created: CreatedFile = Self::parse(self.send(request, "upload")?, "upload")?;
        let id = FileId::parse(&created.id)
            .map_err(|e| RemoteError::new(RemoteErrorKind::Other, e.to_string()))?;
        Ok(RemoteFile {
            view_link: created
                .web_view_link
                .unwrap_or_else(|| format!("{}/file/d/{}/view", DRIVE_WEB_BASE, id)),
            download_link: created
                .web_content_link
                .unwrap_or_else(|| format!("{}/uc?id={}&export=download", DRIVE_WEB_BASE, id)),
            mime_type: created.mime_type.unwrap_or_else(|| file.target_mime.to_string()),
            id,
        })
    }

    fn create_folder(&self, name: &str, parent: &FolderId) -> RemoteResult<FolderId> {
        let request = self
            .http
            .post(self.url(FILES_PATH))
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&json!({
                "name": name,
                "mimeType": mime::FOLDER,
                "parents": [parent.as_str()],
            }));
        let created: CreatedFolder = Self::parse(self.send(request, "folder create")?, "folder create")?;
        FolderId::parse(&created.id).map_err(|e| RemoteError::new(RemoteErrorKind::Other, e.to_string()))
    }

    fn get_metadata(&self, item_id: &str) -> RemoteResult<RemoteMetadata> {
        let request = self
            .http
            .get(self.item_url(item_id))
            .query(&[("supportsAllDrives", "true"), ("fields", METADATA_FIELDS)]);
        let meta: FileMetadata = Self::parse(self.send(request, "metadata")?, "metadata")?;
        Ok(RemoteMetadata {
            id: meta.id,
            name: meta.name,
            mime_type: meta.mime_type,
            parents: meta
                .parents
                .iter()
                .filter_map(|p| FolderId::parse(p).ok())
                .collect(),
            owners: meta.owners.into_iter().filter_map(|o| o.email_address).collect(),
        })
    }

    fn update_parents(&self, item_id: &str, add: &FolderId, remove: &[FolderId]) -> RemoteResult<()> {
        let remove = remove
            .iter()
            .filter(|p| *p != add)
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut query = vec![
            ("addParents", add.as_str()),
            ("supportsAllDrives", "true"),
            ("fields", "id,parents"),
        ];
        if !remove.is_empty() {
            query.push(("removeParents", remove.as_str()));
        }
        let request = self
            .http
            .patch(self.item_url(item_id))
            .query(&query)
            .json(&json!({}));
        self.send(request, "move")?;
        Ok(())
    }

    fn delete(&self, item_id: &str) -> RemoteResult<()> {
        let request = self
            .http
            .delete(self.item_url(item_id))
            .query(&[("supportsAllDrives", "true")]);
        self.send(request, "delete")?;
        Ok(())
    }

    fn transfer_ownership(&self, item_id: &str, new_owner: &str) -> RemoteResult<()> {
        let request = self
            .http
            .post(format!("{}/permissions", self.item_url(item_id)))
            .query(&[("transferOwnership", "true"), ("supportsAllDrives", "true")])
            .json(&json!({
                "role": "owner",
                "type": "user",
                "emailAddress": new_owner,
            }));
        self.send(request, "ownership transfer")?;
        Ok(())
    }
}

/// Body of a `multipart/related` upload: JSON metadata, then the media.
pub fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    media_mime: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_mime).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Classify a non-success response body.
pub fn error_from_body(status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope.error.errors.iter().find_map(|d| d.reason.as_deref());
            let message = if envelope.error.message.is_empty() {
                format!("HTTP {}", status)
            } else {
                envelope.error.message.clone()
            };
            RemoteError::from_response(status, reason, message)
        }
        Err(_) => {
            let message = if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            };
            RemoteError::from_response(status, None, message)
        }
    }
}
