/// API module for talking to the ChemData analytics backend
///
/// This module provides an explicit login session, the dataset and
/// statistics endpoints, and the remote preference endpoints.

use crate::types::{
    DatasetInfo, DatasetList, DatasetStatistics, PreferenceUpdate, StatisticsOverview, StoredPreferences, UserInfo,
    UserProfile,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use log::debug;
use std::io::Read;
use std::time::Duration;

const USER_AGENT: &str = concat!("chemdata/", env!("CARGO_PKG_VERSION"));

const LOGIN_PATH: &str = "/api/v1/auth/login/";
const LOGOUT_PATH: &str = "/api/v1/auth/logout/";
const PROFILE_PATH: &str = "/api/v1/auth/profile/";
const PREFERENCES_PATH: &str = "/api/v1/auth/preferences/";
const DATASETS_PATH: &str = "/api/v1/analytics/csv/datasets/";
const STATISTICS_PATH: &str = "/api/v1/analytics/csv/statistics/";
const UPLOAD_PATH: &str = "/api/v1/analytics/csv/upload/";

/// Largest CSV file the backend accepts
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Credentials for one logged-in user
///
/// Created only by a successful login; every authenticated request reads its
/// `Authorization` header from here.
#[derive(Debug, Clone)]
pub struct Session {
    base_url: String,
    user: UserInfo,
    authorization: String,
}

impl Session {
    /// POST the credentials to the login endpoint and keep them for Basic auth
    pub fn login(agent: &ureq::Agent, base_url: &str, username: &str, password: &str) -> Result<Session, String> {
        let base_url = base_url.trim_end_matches('/').to_string();
        debug!("logging in to {} as {}", base_url, username);

        let body = serde_json::json!({ "username": username, "password": password }).to_string();
        let resp = agent
            .post(&format!("{}{}", base_url, LOGIN_PATH))
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|e| request_error(e, "Login failed"))?;

        #[derive(serde::Deserialize)]
        struct LoginResponse {
            user: UserInfo,
        }
        let login: LoginResponse = read_json(resp)?;

        debug!("logged in as user {} (id {})", login.user.username, login.user.id);
        Ok(Session { base_url, user: login.user, authorization: basic_authorization(username, password) })
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Reject files the backend would refuse before sending them
pub fn check_upload(file_name: &str, size: usize) -> Result<(), String> {
    if !file_name.ends_with(".csv") {
        return Err(format!("Only CSV files can be uploaded: {}", file_name));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(format!(
            "{} is {} bytes; uploads are limited to {} MB",
            file_name,
            size,
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }
    Ok(())
}

/// A boundary that does not occur in `contents`
fn multipart_boundary(contents: &[u8]) -> String {
    let seed = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut attempt = 0u32;
    loop {
        let boundary = format!("----chemdata-{:x}-{}", seed, attempt);
        if !contents.windows(boundary.len()).any(|w| w == boundary.as_bytes()) {
            return boundary;
        }
        attempt += 1;
    }
}

/// `multipart/form-data` body with a single file part
pub fn multipart_body(boundary: &str, field: &str, file_name: &str, mime: &str, contents: &[u8]) -> Vec<u8> {
    let file_name = file_name.replace(['"', '\r', '\n'], "_");
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n", field, file_name).as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// `Basic <base64(username:password)>`
pub fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", B64.encode(format!("{}:{}", username, password)))
}

/// Build the HTTP agent shared by all requests
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).user_agent(USER_AGENT).build()
}

/// Authenticated backend client
pub struct ApiClient {
    agent: ureq::Agent,
    session: Session,
}

impl ApiClient {
    /// Log in and return a client bound to the new session
    pub fn login(base_url: &str, username: &str, password: &str, timeout: Duration) -> Result<Self, String> {
        let agent = build_agent(timeout);
        let session = Session::login(&agent, base_url, username, password)?;
        Ok(Self { agent, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// End the session on the backend. The client is consumed either way.
    pub fn logout(self) -> Result<(), String> {
        self.request("POST", LOGOUT_PATH)
            .call()
            .map_err(|e| request_error(e, "Logout failed"))?;
        debug!("logged out {}", self.session.user.username);
        Ok(())
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.session.base_url, path);
        debug!("{} {}", method, url);
        self.agent.request(method, &url).set("Authorization", &self.session.authorization)
    }

    pub fn profile(&self) -> Result<UserProfile, String> {
        let resp = self.request("GET", PROFILE_PATH).call().map_err(|e| request_error(e, "Failed to fetch profile"))?;
        read_json(resp)
    }

    pub fn preferences(&self) -> Result<StoredPreferences, String> {
        let resp = self
            .request("GET", PREFERENCES_PATH)
            .call()
            .map_err(|e| request_error(e, "Failed to fetch preferences"))?;
        read_json(resp)
    }

    /// PATCH only the fields set in `update`; returns the merged preferences
    pub fn update_preferences(&self, update: &PreferenceUpdate) -> Result<StoredPreferences, String> {
        let body = serde_json::to_string(update).map_err(|e| format!("Failed to encode preferences: {}", e))?;
        let resp = self
            .request("PATCH", PREFERENCES_PATH)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|e| request_error(e, "Failed to update preferences"))?;
        read_json(resp)
    }

    /// All datasets the user uploaded, newest first
    pub fn list_datasets(&self) -> Result<Vec<DatasetInfo>, String> {
        let resp =
            self.request("GET", DATASETS_PATH).call().map_err(|e| request_error(e, "Failed to fetch datasets"))?;
        let list: DatasetList = read_json(resp)?;
        debug!("backend reports {} datasets", list.count);
        Ok(list.datasets)
    }

    pub fn dataset(&self, id: u64) -> Result<DatasetInfo, String> {
        let resp = self
            .request("GET", &format!("{}{}/", DATASETS_PATH, id))
            .call()
            .map_err(|e| request_error(e, "Failed to fetch dataset"))?;
        read_json(resp)
    }

    /// Delete a dataset; returns the backend's confirmation message
    pub fn delete_dataset(&self, id: u64) -> Result<String, String> {
        let resp = self
            .request("DELETE", &format!("{}{}/", DATASETS_PATH, id))
            .call()
            .map_err(|e| request_error(e, "Failed to delete dataset"))?;

        #[derive(serde::Deserialize)]
        struct DeleteResponse {
            #[serde(default)]
            message: String,
        }
        let confirmation: DeleteResponse = read_json(resp)?;
        Ok(confirmation.message)
    }

    /// Upload a CSV file; the backend processes it before answering
    pub fn upload_csv(&self, file_name: &str, contents: &[u8]) -> Result<DatasetInfo, String> {
        check_upload(file_name, contents.len())?;
        let boundary = multipart_boundary(contents);
        let body = multipart_body(&boundary, "file", file_name, "text/csv", contents);
        debug!("uploading {} ({} bytes)", file_name, contents.len());

        let resp = self
            .request("POST", UPLOAD_PATH)
            .set("Content-Type", &format!("multipart/form-data; boundary={}", boundary))
            .send_bytes(&body)
            .map_err(|e| request_error(e, "Upload failed"))?;

        #[derive(serde::Deserialize)]
        struct UploadResponse {
            dataset_id: u64,
            file_name: String,
            #[serde(default)]
            status: String,
            #[serde(default)]
            row_count: Option<usize>,
            #[serde(default)]
            statistics: Option<DatasetStatistics>,
        }
        let uploaded: UploadResponse = read_json(resp)?;
        Ok(DatasetInfo {
            id: uploaded.dataset_id,
            file_name: uploaded.file_name,
            uploaded_at: String::new(),
            row_count: uploaded.row_count,
            status: uploaded.status,
            statistics: uploaded.statistics,
            uploaded_by_username: self.session.user.username.clone(),
        })
    }

    /// Statistics of every completed dataset, newest first
    pub fn statistics(&self) -> Result<StatisticsOverview, String> {
        let resp = self
            .request("GET", STATISTICS_PATH)
            .call()
            .map_err(|e| request_error(e, "No statistics available"))?;
        read_json(resp)
    }

    /// The backend-rendered PDF report for a dataset
    pub fn dataset_pdf(&self, id: u64) -> Result<Vec<u8>, String> {
        let resp = self
            .request("GET", &format!("{}{}/pdf/", DATASETS_PATH, id))
            .call()
            .map_err(|e| request_error(e, "Failed to generate PDF"))?;
        let len = resp.header("Content-Length").and_then(|s| s.parse::<usize>().ok()).unwrap_or(0);
        let mut data: Vec<u8> = Vec::with_capacity(len);
        resp.into_reader().read_to_end(&mut data).map_err(|e| format!("Failed to read PDF: {}", e))?;
        debug!("downloaded {} byte PDF for dataset {}", data.len(), id);
        Ok(data)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(resp: ureq::Response) -> Result<T, String> {
    let body = resp.into_string().map_err(|e| format!("Failed to read response: {}", e))?;
    serde_json::from_str(&body).map_err(|e| format!("Unexpected response from backend: {}", e))
}

/// Turn a failed request into a message, preferring what the backend said
fn request_error(err: ureq::Error, fallback: &str) -> String {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            match backend_message(&body) {
                Some(msg) => msg,
                None => format!("{} (HTTP {})", fallback, code),
            }
        }
        ureq::Error::Transport(t) => format!("{}: {}", fallback, t),
    }
}

/// The `error`, `details` or `detail` field of a JSON error body
pub fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "details", "detail"].iter().find_map(|key| match value.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Null | serde_json::Value::String(_) => None,
        other => Some(other.to_string()),
    })
}


#[cfg(test)]
mod tests {
    use super::test_server::serve;
    use super::*;
    use crate::types::SortOrder;

    const LOGIN_OK: &str = r#"{"message":"Login successful","user":{"id":7,"username":"alice","email":"a@example.com"}}"#;

    #[test]
    fn test_basic_authorization_encoding() {
        assert_eq!(basic_authorization("alice", "secret"), "Basic YWxpY2U6c2VjcmV0");
    }

    #[test]
    fn test_backend_message_prefers_error_then_details() {
        assert_eq!(backend_message(r#"{"error":"Invalid credentials"}"#).as_deref(), Some("Invalid credentials"));
        assert_eq!(backend_message(r#"{"details":"Missing column"}"#).as_deref(), Some("Missing column"));
        assert_eq!(
            backend_message(r#"{"error":"Upload failed","details":"bad row"}"#).as_deref(),
            Some("Upload failed")
        );
        assert_eq!(backend_message("<html>oops</html>"), None);
        assert_eq!(backend_message(r#"{"message":"ok"}"#), None);
    }

    #[test]
    fn test_login_keeps_credentials_for_later_requests() {
        let (url, handle) = serve(vec![
            (200, LOGIN_OK.to_string()),
            (200, r#"{"items_per_page":25,"default_sort_column":"type","default_sort_order":"desc"}"#.to_string()),
        ]);

        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();
        assert_eq!(client.session().user().username, "alice");

        let prefs = client.preferences().unwrap();
        assert_eq!(prefs.items_per_page, 25);
        assert_eq!(prefs.default_sort_order, SortOrder::Desc);

        let requests = handle.join().unwrap();
        assert!(requests[0].starts_with("POST /api/v1/auth/login/"));
        assert!(requests[0].contains(r#""username":"alice""#));
        assert!(requests[1].starts_with("GET /api/v1/auth/preferences/"));
        assert!(requests[1].to_lowercase().contains("authorization: basic ywxpy2u6c2vjcmv0"));
    }

    #[test]
    fn test_login_failure_reports_backend_error() {
        let (url, handle) = serve(vec![(401, r#"{"error":"Invalid credentials"}"#.to_string())]);
        let err = ApiClient::login(&url, "alice", "wrong", Duration::from_secs(5)).err().unwrap();
        assert_eq!(err, "Invalid credentials");
        handle.join().unwrap();
    }

    #[test]
    fn test_update_preferences_sends_only_set_fields() {
        let (url, handle) = serve(vec![
            (200, LOGIN_OK.to_string()),
            (200, r#"{"items_per_page":50,"default_sort_column":"","default_sort_order":"asc"}"#.to_string()),
        ]);
        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();
        let merged = client.update_preferences(&PreferenceUpdate::items_per_page(50)).unwrap();
        assert_eq!(merged.items_per_page, 50);

        let requests = handle.join().unwrap();
        assert!(requests[1].starts_with("PATCH /api/v1/auth/preferences/"));
        assert!(requests[1].ends_with(r#"{"items_per_page":50}"#));
    }

    #[test]
    fn test_list_datasets_and_missing_dataset() {
        let (url, handle) = serve(vec![
            (200, LOGIN_OK.to_string()),
            (
                200,
                r#"{"count":1,"datasets":[{"id":3,"file_name":"plant.csv","status":"completed","row_count":12}]}"#
                    .to_string(),
            ),
            (404, r#"{"detail":"Not found."}"#.to_string()),
        ]);
        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();

        let datasets = client.list_datasets().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].file_name, "plant.csv");
        assert_eq!(datasets[0].row_count, Some(12));

        assert_eq!(client.dataset(99).err().unwrap(), "Not found.");

        let requests = handle.join().unwrap();
        assert!(requests[2].starts_with("GET /api/v1/analytics/csv/datasets/99/"));
    }

    #[test]
    fn test_logout_consumes_client() {
        let (url, handle) = serve(vec![(200, LOGIN_OK.to_string()), (200, r#"{"message":"bye"}"#.to_string())]);
        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();
        client.logout().unwrap();
        let requests = handle.join().unwrap();
        assert!(requests[1].starts_with("POST /api/v1/auth/logout/"));
    }

    #[test]
    fn test_upload_sends_multipart_file() {
        let (url, handle) = serve(vec![
            (200, LOGIN_OK.to_string()),
            (
                201,
                r#"{"message":"CSV uploaded and processed successfully.","dataset_id":9,"file_name":"plant.csv",
                    "status":"completed","row_count":2,"statistics":{"total_equipment_count":2,"by_type":{}}}"#
                    .to_string(),
            ),
        ]);
        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();

        let csv = b"Equipment Name,Type\nPump-1,Pump\nValve-1,Valve\n";
        let info = client.upload_csv("plant.csv", csv).unwrap();
        assert_eq!(info.id, 9);
        assert_eq!(info.row_count, Some(2));
        assert!(info.is_completed());
        assert_eq!(info.uploaded_by_username, "alice");
        assert_eq!(info.statistics.map(|s| s.total_equipment_count), Some(2));

        let requests = handle.join().unwrap();
        let upload = &requests[1];
        assert!(upload.starts_with("POST /api/v1/analytics/csv/upload/"));
        assert!(upload.to_lowercase().contains("content-type: multipart/form-data; boundary=----chemdata-"));
        assert!(upload.contains("Content-Disposition: form-data; name=\"file\"; filename=\"plant.csv\""));
        assert!(upload.contains("Content-Type: text/csv\r\n\r\nEquipment Name,Type\nPump-1,Pump\n"));
        assert!(upload.trim_end().ends_with("--"));
    }

    #[test]
    fn test_upload_rejection_reports_backend_error() {
        let (url, handle) = serve(vec![
            (200, LOGIN_OK.to_string()),
            (400, r#"{"error":"CSV processing failed.","details":"Missing column: Type","dataset_id":4}"#.to_string()),
        ]);
        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();
        let err = client.upload_csv("plant.csv", b"Equipment Name\nPump-1\n").unwrap_err();
        assert_eq!(err, "CSV processing failed.");
        handle.join().unwrap();
    }

    #[test]
    fn test_check_upload_limits() {
        assert!(check_upload("plant.csv", 10).is_ok());
        assert!(check_upload("plant.xlsx", 10).unwrap_err().contains("Only CSV"));
        assert!(check_upload("plant.csv", MAX_UPLOAD_BYTES + 1).unwrap_err().contains("10 MB"));
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("XYZ", "file", "a\"b.csv", "text/csv", b"x,y\n");
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a_b.csv\"\r\n\
             Content-Type: text/csv\r\n\r\nx,y\n\r\n--XYZ--\r\n"
        );
    }

    #[test]
    fn test_statistics_and_pdf_download() {
        let (url, handle) = serve(vec![
            (200, LOGIN_OK.to_string()),
            (
                200,
                r#"{"total_datasets":1,"total_equipment_count":4,"datasets":[{"id":5,"file_name":"plant.csv",
                    "status":"completed","statistics":{"total_equipment_count":4,"by_type":{}}}]}"#
                    .to_string(),
            ),
            (200, "%PDF-1.4 fake".to_string()),
        ]);
        let client = ApiClient::login(&url, "alice", "secret", Duration::from_secs(5)).unwrap();

        let overview = client.statistics().unwrap();
        assert_eq!(overview.latest().map(|d| d.id), Some(5));

        let pdf = client.dataset_pdf(5).unwrap();
        assert_eq!(pdf, b"%PDF-1.4 fake");

        let requests = handle.join().unwrap();
        assert!(requests[1].starts_with("GET /api/v1/analytics/csv/statistics/"));
        assert!(requests[2].starts_with("GET /api/v1/analytics/csv/datasets/5/pdf/"));
    }
}
