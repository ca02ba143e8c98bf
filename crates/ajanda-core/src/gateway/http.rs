//! reqwest-backed gateway for the agenda backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{require_token, ListQuery, NotificationGateway, NotificationPage};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::models::{AuthSession, Credentials, NoteRecord, NotificationRecord, UserInfo};
use crate::util::{compact_text, normalize_text_option};

const LOGIN_PATH: &str = "Auth/GirisYap";
const LIST_PATH: &str = "Ajanda/getall";
const ADD_PATH: &str = "Ajanda/add";
const UPDATE_PATH: &str = "Ajanda/update";
const DELETE_PATH: &str = "Ajanda/delete";
const NOTE_ADD_PATH: &str = "AjandaNot/add";
const NOTE_GET_PATH: &str = "AjandaNot/getbyid";
const NOTE_UPDATE_PATH: &str = "AjandaNot/update";
const NOTE_DELETE_PATH: &str = "AjandaNot/delete";

#[derive(Debug, Clone)]
pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Envelope<T>> {
        tracing::debug!(endpoint = path, "Sending backend request");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Network(parse_api_error(status, &body)));
        }
        serde_json::from_str(&body).map_err(|error| {
            Error::Network(format!("malformed response from {path}: {error}"))
        })
    }

    /// Send a record-shaped body and accept any successful envelope.
    async fn send_ack(&self, request: RequestBuilder, path: &str, fallback: &str) -> Result<()> {
        self.send::<serde_json::Value>(request, path)
            .await?
            .into_result(fallback)
            .map(|_| ())
    }
}

#[async_trait]
impl NotificationGateway for HttpGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        let tenant = &self.config.tenant;
        let payload = LoginRequest {
            tax_id: &credentials.tax_id,
            username: &credentials.username,
            password: &credentials.password,
            database_name: &credentials.tax_id,
            period_year: tenant.period_year(),
            branch_name: tenant.branch_name(),
            api_username: tenant.api_username()?,
            api_password: tenant.api_password()?,
        };
        let request = self
            .client
            .post(self.config.endpoint(LOGIN_PATH))
            .json(&payload);
        let envelope = self.send::<LoginData>(request, LOGIN_PATH).await?;

        let message = envelope.message();
        let code = envelope.code();
        if !envelope.success {
            return Err(Error::AuthFailed {
                message: message.unwrap_or_else(|| "Login was refused".to_string()),
                code,
            });
        }
        let data = envelope.data.unwrap_or_default();
        let Some(token) = normalize_text_option(data.token) else {
            return Err(Error::AuthFailed {
                message: "Login response did not include a token".to_string(),
                code,
            });
        };
        Ok(AuthSession {
            token,
            expires_at: normalize_text_option(data.expires_at),
            user: data.user_info.unwrap_or_default(),
        })
    }

    async fn list_notifications(
        &self,
        token: &str,
        query: &ListQuery,
    ) -> Result<NotificationPage> {
        let request = authed(
            self.client
                .post(self.config.endpoint(LIST_PATH))
                .json(&ListRequest::from(query)),
            token,
        )?;
        let (records, total_count) = self
            .send::<Vec<NotificationRecord>>(request, LIST_PATH)
            .await?
            .into_result("Notifications could not be fetched")?;
        Ok(NotificationPage {
            records: records.unwrap_or_default(),
            total_count,
        })
    }

    async fn create_notification(
        &self,
        token: &str,
        record: &NotificationRecord,
    ) -> Result<Option<NotificationRecord>> {
        let request = authed(
            self.client.post(self.config.endpoint(ADD_PATH)).json(record),
            token,
        )?;
        let (created, _) = self
            .send::<NotificationRecord>(request, ADD_PATH)
            .await?
            .into_result("Notification could not be added")?;
        Ok(created)
    }

    async fn update_notification(&self, token: &str, record: &NotificationRecord) -> Result<()> {
        let request = authed(
            self.client.put(self.config.endpoint(UPDATE_PATH)).json(record),
            token,
        )?;
        self.send_ack(request, UPDATE_PATH, "Notification could not be updated")
            .await
    }

    async fn delete_notification(&self, token: &str, record: &NotificationRecord) -> Result<()> {
        let request = authed(
            self.client.post(self.config.endpoint(DELETE_PATH)).json(record),
            token,
        )?;
        self.send_ack(request, DELETE_PATH, "Notification could not be deleted")
            .await
    }

    async fn add_note(&self, token: &str, parent_id: i64, text: &str) -> Result<NoteRecord> {
        let request = authed(
            self.client
                .post(self.config.endpoint(NOTE_ADD_PATH))
                .json(&NoteRecord::new_for(parent_id, text)),
            token,
        )?;
        let (note, code) = self
            .send::<NoteRecord>(request, NOTE_ADD_PATH)
            .await?
            .into_result_with_code("Note could not be added")?;
        note.ok_or_else(|| {
            Error::remote_rejected(None, code, "Note add response did not include the note")
        })
    }

    async fn get_note(&self, token: &str, note_id: i64) -> Result<NoteRecord> {
        let path = format!("{NOTE_GET_PATH}/{note_id}");
        let request = authed(self.client.get(self.config.endpoint(&path)), token)?;
        let (note, _) = self
            .send::<NoteRecord>(request, NOTE_GET_PATH)
            .await?
            .into_result("Note could not be fetched")?;
        note.ok_or_else(|| Error::NotFound(format!("note {note_id}")))
    }

    async fn update_note(&self, token: &str, note: &NoteRecord) -> Result<()> {
        let request = authed(
            self.client
                .put(self.config.endpoint(NOTE_UPDATE_PATH))
                .json(note),
            token,
        )?;
        self.send_ack(request, NOTE_UPDATE_PATH, "Note could not be updated")
            .await
    }

    async fn delete_note(&self, token: &str, note: &NoteRecord) -> Result<()> {
        let request = authed(
            self.client
                .post(self.config.endpoint(NOTE_DELETE_PATH))
                .json(note),
            token,
        )?;
        self.send_ack(request, NOTE_DELETE_PATH, "Note could not be deleted")
            .await
    }
}

/// Common response envelope of every backend endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_detail: Option<String>,
    #[serde(default)]
    total_count: Option<i64>,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn message(&self) -> Option<String> {
        normalize_text_option(self.message.clone())
            .or_else(|| normalize_text_option(self.error_detail.clone()))
    }

    /// Codes arrive as either strings or numbers.
    fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) => normalize_text_option(Some(code.clone())),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn into_result(self, fallback: &str) -> Result<(Option<T>, i64)> {
        if !self.success {
            return Err(Error::remote_rejected(self.message(), self.code(), fallback));
        }
        Ok((self.data, self.total_count.unwrap_or(0)))
    }

    fn into_result_with_code(self, fallback: &str) -> Result<(Option<T>, Option<String>)> {
        let code = self.code();
        self.into_result(fallback).map(|(data, _)| (data, code))
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "vergiNumarasi")]
    tax_id: &'a str,
    #[serde(rename = "kullaniciAdi")]
    username: &'a str,
    #[serde(rename = "kullaniciSifre")]
    password: &'a str,
    #[serde(rename = "veritabaniAd")]
    database_name: &'a str,
    #[serde(rename = "donemYil")]
    period_year: String,
    #[serde(rename = "subeAd")]
    branch_name: String,
    #[serde(rename = "apiKullaniciAdi")]
    api_username: String,
    #[serde(rename = "apiKullaniciSifre")]
    api_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    user_info: Option<UserInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    order_by: &'a str,
    desc: bool,
    tarih_sutun_adi: &'a str,
    paging_options: PagingOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    baslangic_tarih: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bitis_tarih: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aranacak_kelime: Option<&'a str>,
}

impl<'a> From<&'a ListQuery> for ListRequest<'a> {
    fn from(query: &'a ListQuery) -> Self {
        Self {
            order_by: &query.sort_field,
            desc: query.descending,
            tarih_sutun_adi: &query.sort_field,
            paging_options: PagingOptions {
                page_number: query.page_number,
                page_size: query.page_size,
            },
            baslangic_tarih: query.start_date.as_deref(),
            bitis_tarih: query.end_date.as_deref(),
            aranacak_kelime: query.search.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PagingOptions {
    page_number: u32,
    page_size: u32,
}

fn authed(request: RequestBuilder, token: &str) -> Result<RequestBuilder> {
    Ok(request.bearer_auth(require_token(token)?))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        if let Some(message) = envelope.message() {
            return format!("{message} (HTTP {})", status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} (HTTP {})", status.as_u16())
    }
}
