//! Garmin Connect session login and activity upload
//!
//! Login goes through the classic CAS widget: posting the form sets a
//! `CASTGC` ticket cookie, and exchanging that ticket on Connect's post-auth
//! page fills the cookie jar with the session cookies uploads need.

use crate::error::{GarminError, Result};
use crate::models::{UploadReport, UploadResponse};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::USER_AGENT;
use reqwest::{multipart, Client, StatusCode, Url};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Ticket-granting cookie set by a successful SSO login
const TICKET_COOKIE: &str = "CASTGC";

/// Browser-like user agent; the login widget rejects obvious bots
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// File name the upload service expects for FIT data
const UPLOAD_FILE_NAME: &str = "activity.fit";

/// Uploads of long activities can take a while on slow links
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

const LOGIN_PATH: &str = "/sso/login";
const POST_AUTH_PATH: &str = "/post-auth/login";
const UPLOAD_PATH: &str = "/modern/proxy/upload-service/upload/.fit";

/// Unauthenticated entry point to Garmin Connect
#[derive(Debug, Clone)]
pub struct ConnectClient {
    sso_base: String,
    connect_base: String,
}

impl ConnectClient {
    /// Create a client for the given SSO and Connect base URLs
    pub fn new(sso_base: &str, connect_base: &str) -> Self {
        Self {
            sso_base: sso_base.trim_end_matches('/').to_string(),
            connect_base: connect_base.trim_end_matches('/').to_string(),
        }
    }

    fn login_url(&self) -> String {
        format!("{}{}", self.sso_base, LOGIN_PATH)
    }

    /// Query string identifying the Connect login widget
    fn login_params(&self) -> Vec<(&'static str, String)> {
        let post_auth = format!("{}{}", self.connect_base, POST_AUTH_PATH);
        let sso = format!("{}/sso", self.sso_base);
        vec![
            ("service", post_auth.clone()),
            ("webhost", self.connect_base.clone()),
            ("source", format!("{}/en-US/signin", self.connect_base)),
            ("redirectAfterAccountLoginUrl", post_auth.clone()),
            ("redirectAfterAccountCreationUrl", post_auth),
            ("gauthHost", sso),
            ("locale", "en_US".to_string()),
            ("id", "gauth-widget".to_string()),
            ("clientId", "GarminConnect".to_string()),
            ("rememberMeShown", "true".to_string()),
            ("rememberMeChecked", "false".to_string()),
            ("createAccountShown", "true".to_string()),
            ("openCreateAccount", "false".to_string()),
            ("usernameShown", "false".to_string()),
            ("displayNameShown", "false".to_string()),
            ("consumeServiceTicket", "false".to_string()),
            ("initialFocus", "true".to_string()),
            ("embedWidget", "false".to_string()),
            ("generateExtraServiceTicket", "false".to_string()),
        ]
    }

    /// Log in and return an authenticated session.
    ///
    /// Every call starts from an empty cookie jar, so a failed login leaves
    /// nothing behind.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GarminError::Http)?;

        let form_data = [
            ("username", username),
            ("password", password),
            ("embed", "true"),
            ("lt", "e1s1"),
            ("_eventId", "submit"),
            ("displayNameRequired", "false"),
        ];

        tracing::info!("Logging in to Garmin Connect");
        tracing::debug!(username, "Submitting SSO login form");

        let login_url = self.login_url();
        let response = client
            .post(&login_url)
            .query(&self.login_params())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .form(&form_data)
            .send()
            .await
            .map_err(|e| GarminError::auth(format!("login request failed: {}", e)))?;

        let from_response = response
            .cookies()
            .find(|c| c.name() == TICKET_COOKIE)
            .map(|c| c.value().to_string());

        let ticket = match from_response {
            Some(ticket) => ticket,
            None => {
                let url = Url::parse(&login_url)
                    .map_err(|e| GarminError::config(format!("invalid login URL: {}", e)))?;
                jar.cookies(&url)
                    .and_then(|header| header.to_str().ok().map(str::to_string))
                    .and_then(|header| find_cookie(&header, TICKET_COOKIE))
                    .ok_or_else(|| {
                        GarminError::auth("no CASTGC cookie in login response; check username and password")
                    })?
            }
        };

        tracing::debug!("Got SSO ticket, exchanging for session cookies");

        let post_auth_url = format!("{}{}", self.connect_base, POST_AUTH_PATH);
        let response = client
            .get(&post_auth_url)
            .query(&[("ticket", ticket.as_str())])
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| GarminError::auth(format!("post-auth request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GarminError::auth(format!(
                "post-auth returned {}: {}",
                status, body
            )));
        }

        tracing::info!("Authenticated with Garmin Connect");

        Ok(Session {
            client,
            connect_base: self.connect_base.clone(),
        })
    }
}

/// Authenticated Garmin Connect session.
///
/// Holds the cookie-bearing HTTP client for the lifetime of the process.
/// Uploads borrow the session and leave it usable whatever their outcome.
#[derive(Debug)]
pub struct Session {
    client: Client,
    connect_base: String,
}

impl Session {
    fn upload_url(&self) -> String {
        format!("{}{}", self.connect_base, UPLOAD_PATH)
    }

    /// Upload an activity file from disk
    pub async fn upload(&self, file_path: &Path) -> Result<UploadReport> {
        let file_bytes = tokio::fs::read(file_path).await?;
        tracing::info!(file = %file_path.display(), bytes = file_bytes.len(), "Uploading activity");
        self.upload_bytes(file_bytes).await
    }

    /// Upload FIT content already in memory
    pub async fn upload_bytes(&self, file_bytes: Vec<u8>) -> Result<UploadReport> {
        let part = multipart::Part::bytes(file_bytes)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/octet-stream")
            .map_err(|e| GarminError::upload(format!("Invalid MIME type: {}", e)))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("NK", "NT");

        let response = self
            .client
            .post(self.upload_url())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header("NK", "NT")
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GarminError::upload(e.to_string()))?;

        // Rejections such as duplicates come back as 409 with a normal JSON body
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GarminError::upload(e.to_string()))?;

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            GarminError::upload(format!(
                "unexpected response ({}): {}: {}",
                status,
                e,
                truncate(&body, 200)
            ))
        })?;

        Ok(UploadReport::from(parsed))
    }
}

/// Find a cookie value in a `name=value; name2=value2` header
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Truncate string to max length
fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Settings;

    fn client_for(settings: &Settings) -> ConnectClient {
        ConnectClient::new(&settings.sso_base_url, &settings.connect_base_url)
    }

    #[test]
    fn test_default_hosts() {
        let client = client_for(&Settings::new("alice").unwrap());
        assert_eq!(client.login_url(), "https://sso.garmin.com/sso/login");
        assert_eq!(client.connect_base, "https://connect.garmin.com");
    }

    #[test]
    fn test_custom_domain() {
        let client = client_for(&Settings::new("alice").unwrap().with_domain("garmin.cn"));
        assert_eq!(client.login_url(), "https://sso.garmin.cn/sso/login");
        assert_eq!(client.connect_base, "https://connect.garmin.cn");
    }

    #[test]
    fn test_base_urls_trim_slash() {
        let client = ConnectClient::new("http://127.0.0.1:1/", "http://127.0.0.1:2/");
        assert_eq!(client.login_url(), "http://127.0.0.1:1/sso/login");
        assert_eq!(client.connect_base, "http://127.0.0.1:2");
    }

    #[test]
    fn test_login_params_point_back_to_connect() {
        let client = client_for(&Settings::new("alice").unwrap());
        let params = client.login_params();
        let service = params.iter().find(|(k, _)| *k == "service").unwrap();
        assert_eq!(service.1, "https://connect.garmin.com/post-auth/login");
        assert!(params.iter().any(|(k, v)| *k == "id" && v == "gauth-widget"));
    }

    #[test]
    fn test_find_cookie() {
        let header = "SESSION=abc; CASTGC=TGT-123-xyz; other=1";
        assert_eq!(find_cookie(header, "CASTGC"), Some("TGT-123-xyz".to_string()));
        assert_eq!(find_cookie(header, "missing"), None);
        assert_eq!(find_cookie("", "CASTGC"), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("very long string here", 9), "very long");
    }
}
