//! ScreenScraper implementation of the metadata API.
//!
//! The service returns HTTP 200 for almost everything and signals errors
//! with French text in the body, so classification is string-based and
//! ordering matters. Credentials travel as query parameters and are
//! redacted from every error message that could embed a URL.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::api::{
    GameRecord, LocalizedValue, LookupQuery, MediaPayload, MediaRecord, MetadataAPI,
    RegionalValue, ServerInfo, UserInfo,
};
use crate::credentials::Credentials;
use crate::error::ScrapeError;

use tokio::time::Duration;

const BASE_URL: &str = "https://api.screenscraper.fr/api2";

/// Maximum number of retries for transient errors.
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration before the first retry (doubles each attempt).
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Hard timeout for media file downloads.
const MEDIA_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the ScreenScraper API.
///
/// Concurrency and request pacing are controlled externally by the rate
/// limiter; this client only performs requests and bounded retries.
pub struct ScreenScraperClient {
    http: reqwest::Client,
    creds: Credentials,
}

impl ScreenScraperClient {
    /// Build a client with the given overall request timeout.
    pub fn new(creds: Credentials, http_timeout: Duration) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(http_timeout)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self { http, creds })
    }

    fn base_params(&self) -> HashMap<&'static str, String> {
        let mut params = HashMap::new();
        params.insert("devid", self.creds.dev_id.clone());
        params.insert("devpassword", self.creds.dev_password.clone());
        params.insert("softname", self.creds.soft_name.clone());
        params.insert("output", "json".to_string());
        if let Some(ref id) = self.creds.user_id {
            params.insert("ssid", id.clone());
        }
        if let Some(ref pw) = self.creds.user_password {
            params.insert("sspassword", pw.clone());
        }
        params
    }

    /// Perform a GET with bounded retries and backoff for transient errors.
    async fn get_with_retries(
        &self,
        url: &str,
        params: &HashMap<&'static str, String>,
    ) -> Result<String, ScrapeError> {
        let mut last_error: Option<ScrapeError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff with a small deterministic jitter so
                // parallel workers don't retry in lockstep.
                let backoff = INITIAL_BACKOFF * 2u32.pow(attempt - 1);
                let jitter = Duration::from_millis((attempt as u64 * 137) % 400);
                log::debug!(
                    "Retrying request (attempt {}/{}) after {:?}",
                    attempt + 1,
                    MAX_RETRIES + 1,
                    backoff + jitter,
                );
                tokio::time::sleep(backoff + jitter).await;
            }

            match self.get_once(url, params).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() => {
                    log::debug!("Transient error: {}", redact_credentials(&e.to_string()));
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ScrapeError::transient("all retries exhausted")))
    }

    async fn get_once(
        &self,
        url: &str,
        params: &HashMap<&'static str, String>,
    ) -> Result<String, ScrapeError> {
        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ScrapeError::transient(redact_credentials(&e.to_string())))?;

        // CDN/proxy layers sometimes return an HTML error page with 200.
        if looks_like_html_error(&text) {
            return Err(ScrapeError::transient(
                "server returned an HTML error page instead of JSON",
            ));
        }

        Ok(text)
    }
}

/// Map HTTP status codes onto the error taxonomy.
fn classify_status(status: reqwest::StatusCode) -> Option<ScrapeError> {
    match status.as_u16() {
        200 => None,
        400 => Some(ScrapeError::BadRequest("malformed request".to_string())),
        401 | 403 => Some(ScrapeError::InvalidCredentials(
            "credentials rejected".to_string(),
        )),
        423 => Some(ScrapeError::ApiLocked("API is locked".to_string())),
        426 => Some(ScrapeError::Blacklisted),
        429 => Some(ScrapeError::RateLimited),
        430 | 431 => Some(ScrapeError::QuotaExceeded { used: 0, max: 0 }),
        s if status.is_server_error() => {
            Some(ScrapeError::ServerBusy(format!("server returned HTTP {s}")))
        }
        s => Some(ScrapeError::transient(format!("unexpected HTTP {s}"))),
    }
}

fn classify_transport_error(e: &reqwest::Error) -> ScrapeError {
    ScrapeError::transient(redact_credentials(&e.to_string()))
}

/// Inspect a 200 body for the service's French error sentinels. Ordering
/// matters: the fatal conditions also contain "Erreur".
fn classify_body(text: &str) -> Option<ScrapeError> {
    if text.is_empty() {
        return Some(ScrapeError::transient("empty response from API"));
    }
    if text.contains("API fermé") || text.contains("API closed") {
        return Some(ScrapeError::ApiLocked(
            "metadata API is temporarily closed".to_string(),
        ));
    }
    if text.contains("Le quota de scrape journalier") {
        return Some(ScrapeError::QuotaExceeded { used: 0, max: 0 });
    }
    if text.contains("blacklist") {
        return Some(ScrapeError::Blacklisted);
    }
    if text.contains("Erreur de login") || text.contains("Identifiants") {
        return Some(ScrapeError::InvalidCredentials(
            "invalid developer or user credentials".to_string(),
        ));
    }
    if text.contains("non trouvé") {
        return Some(ScrapeError::NotFound);
    }
    if text.contains("Champ crc, md5 ou sha1") || text.contains("Erreur dans le nom du fichier") {
        return Some(ScrapeError::BadRequest(
            "rejected hash or name fields".to_string(),
        ));
    }
    if text.contains("Erreur") {
        // Other errors are retried rather than treated as missing games.
        return Some(ScrapeError::transient(format!(
            "service error: {}",
            &text[..text.len().min(200)]
        )));
    }
    None
}

fn looks_like_html_error(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") || trimmed.starts_with("<HTML")
}

/// Redact credential query parameters from messages that may contain URLs.
fn redact_credentials(msg: &str) -> String {
    let mut result = msg.to_string();
    for param in &["devpassword", "sspassword", "devid", "ssid"] {
        let prefix = format!("{}=", param);
        while let Some(start) = result.find(&prefix) {
            let value_start = start + prefix.len();
            let value_end = result[value_start..]
                .find(|c: char| c == '&' || c.is_whitespace() || c == '"' || c == '\'')
                .map(|i| value_start + i)
                .unwrap_or(result.len());
            result.replace_range(value_start..value_end, "[REDACTED]");
        }
    }
    result
}

#[async_trait]
impl MetadataAPI for ScreenScraperClient {
    async fn lookup_game(&self, query: &LookupQuery) -> Result<GameRecord, ScrapeError> {
        let mut params = self.base_params();
        params.insert("romtype", "rom".to_string());
        params.insert("systemeid", query.system_id.to_string());
        params.insert("romnom", query.rom_name.clone());
        params.insert("romtaille", query.rom_size.to_string());
        if let Some(ref crc) = query.crc32 {
            params.insert("crc", crc.to_uppercase());
        }
        if let Some(ref md5) = query.md5 {
            params.insert("md5", md5.clone());
        }
        if let Some(ref sha1) = query.sha1 {
            params.insert("sha1", sha1.clone());
        }
        if let Some(ref serial) = query.serial {
            params.insert("serialnum", serial.clone());
        }

        let text = self
            .get_with_retries(&format!("{BASE_URL}/jeuInfos.php"), &params)
            .await?;

        if let Some(err) = classify_body(&text) {
            return Err(err);
        }

        let response: wire::JeuInfosResponse = serde_json::from_str(&text).map_err(|e| {
            ScrapeError::transient(format!(
                "failed to parse game info: {e}. Response: {}",
                &text[..text.len().min(200)]
            ))
        })?;

        Ok(response.response.jeu.into_record())
    }

    async fn download_media(
        &self,
        _system_id: u32,
        _game_id: u64,
        media: &MediaRecord,
    ) -> Result<MediaPayload, ScrapeError> {
        let resp = tokio::time::timeout(MEDIA_TIMEOUT, self.http.get(&media.url).send())
            .await
            .map_err(|_| {
                ScrapeError::transient(format!(
                    "media download timed out after {}s",
                    MEDIA_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| classify_transport_error(&e))?;

        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = tokio::time::timeout(MEDIA_TIMEOUT, resp.bytes())
            .await
            .map_err(|_| ScrapeError::transient("media body read timed out"))?
            .map_err(|e| classify_transport_error(&e))?
            .to_vec();

        // Small textual sentinels in an otherwise binary stream.
        if bytes.len() < 32 {
            match std::str::from_utf8(&bytes).map(str::trim) {
                Ok("NOMEDIA") => return Ok(MediaPayload::NoMedia),
                Ok("CRCOK") | Ok("MD5OK") | Ok("SHA1OK") => {
                    return Ok(MediaPayload::HashUnchanged);
                }
                _ => {}
            }
        }

        Ok(MediaPayload::Data {
            bytes,
            content_type,
        })
    }

    async fn user_info(&self) -> Result<UserInfo, ScrapeError> {
        let params = self.base_params();
        let text = self
            .get_with_retries(&format!("{BASE_URL}/ssuserInfos.php"), &params)
            .await?;

        if let Some(err) = classify_body(&text) {
            return Err(err);
        }

        let response: wire::UserInfosResponse = serde_json::from_str(&text).map_err(|e| {
            ScrapeError::transient(format!(
                "failed to parse user info: {e}. Response: {}",
                &text[..text.len().min(200)]
            ))
        })?;

        Ok(response.response.ssuser.into_user_info())
    }

    async fn server_info(&self) -> Result<ServerInfo, ScrapeError> {
        let params = self.base_params();
        let text = self
            .get_with_retries(&format!("{BASE_URL}/ssinfraInfos.php"), &params)
            .await?;

        if let Some(err) = classify_body(&text) {
            // A closed API is still a meaningful health answer.
            if matches!(err, ScrapeError::ApiLocked(_)) {
                return Ok(ServerInfo {
                    api_open: false,
                    threads_in_use: None,
                });
            }
            return Err(err);
        }

        let threads_in_use = serde_json::from_str::<wire::InfraResponse>(&text)
            .ok()
            .and_then(|r| r.response.serveurs.and_then(|s| s.threadsactifs));

        Ok(ServerInfo {
            api_open: true,
            threads_in_use,
        })
    }
}

/// Wire-format structures for the service's JSON. Numeric fields arrive as
/// strings as often as numbers, so everything goes through tolerant
/// deserializers.
mod wire {
    use super::*;

    fn de_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        de_opt_u32(deserializer).map(|v| v.unwrap_or(0))
    }

    fn de_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value.and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }))
    }

    fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(0))
    }

    #[derive(Deserialize)]
    pub(super) struct JeuInfosResponse {
        pub response: JeuResponse,
    }

    #[derive(Deserialize)]
    pub(super) struct JeuResponse {
        pub jeu: Jeu,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct Jeu {
        #[serde(deserialize_with = "de_u64")]
        pub id: u64,
        pub noms: Vec<TextRegion>,
        pub synopsis: Vec<TextLangue>,
        pub dates: Vec<TextRegion>,
        pub developpeur: Option<TextOnly>,
        pub editeur: Option<TextOnly>,
        pub genres: Vec<Genre>,
        pub joueurs: Option<TextOnly>,
        pub note: Option<TextOnly>,
        pub medias: Vec<Media>,
    }

    impl Jeu {
        pub fn into_record(self) -> GameRecord {
            // Ratings arrive as a 0-20 score.
            let rating = self
                .note
                .as_ref()
                .and_then(|n| n.text.trim().parse::<f32>().ok())
                .map(|n| (n / 20.0).clamp(0.0, 1.0));

            let mut genres: Vec<LocalizedValue> = Vec::new();
            for genre in &self.genres {
                for name in &genre.noms {
                    match genres
                        .iter_mut()
                        .find(|g| g.language == name.langue)
                    {
                        Some(existing) => {
                            existing.value.push_str(", ");
                            existing.value.push_str(&name.text);
                        }
                        None => genres.push(LocalizedValue {
                            language: name.langue.clone(),
                            value: name.text.clone(),
                        }),
                    }
                }
            }

            GameRecord {
                id: self.id,
                names: self
                    .noms
                    .into_iter()
                    .map(|n| RegionalValue {
                        region: n.region,
                        value: n.text,
                    })
                    .collect(),
                synopses: self
                    .synopsis
                    .into_iter()
                    .map(|s| LocalizedValue {
                        language: s.langue,
                        value: s.text,
                    })
                    .collect(),
                release_dates: self
                    .dates
                    .into_iter()
                    .map(|d| RegionalValue {
                        region: d.region,
                        value: d.text,
                    })
                    .collect(),
                developer: self.developpeur.map(|d| d.text),
                publisher: self.editeur.map(|e| e.text),
                genres,
                players: self.joueurs.map(|j| j.text),
                rating,
                media: self
                    .medias
                    .into_iter()
                    .map(|m| MediaRecord {
                        kind: m.r#type,
                        region: m.region,
                        url: m.url,
                        format: m.format,
                    })
                    .collect(),
            }
        }
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct TextRegion {
        pub region: Option<String>,
        pub text: String,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct TextLangue {
        pub langue: Option<String>,
        pub text: String,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct TextOnly {
        pub text: String,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct Genre {
        pub noms: Vec<TextLangue>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct Media {
        pub r#type: String,
        pub region: Option<String>,
        pub url: String,
        pub format: String,
    }

    #[derive(Deserialize)]
    pub(super) struct UserInfosResponse {
        pub response: UserResponse,
    }

    #[derive(Deserialize)]
    pub(super) struct UserResponse {
        pub ssuser: SsUser,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct SsUser {
        #[serde(deserialize_with = "de_u32")]
        pub maxthreads: u32,
        #[serde(deserialize_with = "de_u32")]
        pub maxrequestspermin: u32,
        #[serde(deserialize_with = "de_u32")]
        pub requeststoday: u32,
        #[serde(deserialize_with = "de_u32")]
        pub maxrequestsperday: u32,
    }

    impl SsUser {
        pub fn into_user_info(self) -> UserInfo {
            UserInfo {
                // Anonymous accounts report zeros; fall back to the
                // service's public minimums.
                max_threads: if self.maxthreads == 0 { 1 } else { self.maxthreads },
                max_requests_per_minute: if self.maxrequestspermin == 0 {
                    60
                } else {
                    self.maxrequestspermin
                },
                requests_today: self.requeststoday,
                max_requests_per_day: self.maxrequestsperday,
            }
        }
    }

    #[derive(Deserialize)]
    pub(super) struct InfraResponse {
        pub response: InfraInner,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct InfraInner {
        pub serveurs: Option<Serveurs>,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    pub(super) struct Serveurs {
        #[serde(deserialize_with = "de_opt_u32")]
        pub threadsactifs: Option<u32>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_hides_every_credential_param() {
        let msg = "GET https://api.example/x?devid=alice&devpassword=s3cret&ssid=bob&sspassword=hunter2&crc=AB failed";
        let redacted = redact_credentials(msg);
        assert!(!redacted.contains("s3cret"));
        assert!(!redacted.contains("hunter2"));
        assert!(!redacted.contains("alice"));
        assert!(redacted.contains("crc=AB"));
    }

    #[test]
    fn body_classification_ordering() {
        assert!(matches!(
            classify_body("Erreur : API fermé pour maintenance"),
            Some(ScrapeError::ApiLocked(_))
        ));
        assert!(matches!(
            classify_body("Le quota de scrape journalier est atteint"),
            Some(ScrapeError::QuotaExceeded { .. })
        ));
        assert!(matches!(
            classify_body("Erreur : Jeu non trouvé !"),
            Some(ScrapeError::NotFound)
        ));
        assert!(matches!(
            classify_body("Erreur de login : Identifiants incorrects"),
            Some(ScrapeError::InvalidCredentials(_))
        ));
        assert!(matches!(
            classify_body("Erreur inconnue du serveur"),
            Some(ScrapeError::Transient(_))
        ));
        assert!(classify_body("{\"response\":{}}").is_none());
    }

    #[test]
    fn status_classification() {
        use reqwest::StatusCode;
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(ScrapeError::InvalidCredentials(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(ScrapeError::RateLimited)
        ));
        assert!(matches!(
            classify_status(StatusCode::from_u16(426).unwrap()),
            Some(ScrapeError::Blacklisted)
        ));
        assert!(matches!(
            classify_status(StatusCode::from_u16(430).unwrap()),
            Some(ScrapeError::QuotaExceeded { .. })
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            Some(ScrapeError::ServerBusy(_))
        ));
    }

    #[test]
    fn jeu_json_maps_to_record() {
        let json = r#"{
            "response": {
                "jeu": {
                    "id": "3",
                    "noms": [
                        {"region": "us", "text": "Sonic The Hedgehog"},
                        {"region": "jp", "text": "Sonic"}
                    ],
                    "synopsis": [{"langue": "en", "text": "Fast blue hedgehog."}],
                    "dates": [{"region": "us", "text": "1991-06-23"}],
                    "developpeur": {"text": "Sonic Team"},
                    "editeur": {"text": "Sega"},
                    "genres": [{"noms": [{"langue": "en", "text": "Platform"}]}],
                    "joueurs": {"text": "1"},
                    "note": {"text": "16"},
                    "medias": [
                        {"type": "box-2D", "region": "us", "url": "http://x/box.png", "format": "png"}
                    ]
                }
            }
        }"#;
        let response: wire::JeuInfosResponse = serde_json::from_str(json).unwrap();
        let record = response.response.jeu.into_record();
        assert_eq!(record.id, 3);
        assert_eq!(
            record.name_for_regions(&[rom_scout_core::Region::Usa]),
            Some("Sonic The Hedgehog")
        );
        assert_eq!(record.developer.as_deref(), Some("Sonic Team"));
        assert_eq!(record.rating, Some(0.8));
        assert_eq!(record.media.len(), 1);
        assert_eq!(record.media[0].kind, "box-2D");
    }

    #[test]
    fn user_info_tolerates_string_numbers_and_zero_defaults() {
        let json = r#"{"response": {"ssuser": {
            "maxthreads": "4",
            "maxrequestspermin": 120,
            "requeststoday": "37",
            "maxrequestsperday": "100000"
        }}}"#;
        let response: wire::UserInfosResponse = serde_json::from_str(json).unwrap();
        let info = response.response.ssuser.into_user_info();
        assert_eq!(info.max_threads, 4);
        assert_eq!(info.max_requests_per_minute, 120);
        assert_eq!(info.requests_today, 37);

        let empty: wire::UserInfosResponse =
            serde_json::from_str(r#"{"response": {"ssuser": {}}}"#).unwrap();
        let info = empty.response.ssuser.into_user_info();
        assert_eq!(info.max_threads, 1);
        assert_eq!(info.max_requests_per_minute, 60);
    }
}
