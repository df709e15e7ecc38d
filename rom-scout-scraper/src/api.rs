//! Abstract metadata service interface.
//!
//! The orchestrator only ever talks to this trait; the production
//! implementation lives in [`crate::client`] and tests substitute scripted
//! fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rom_scout_core::Region;
use rom_scout_frontend::MediaKind;

use crate::error::ScrapeError;

/// A value tagged with the region it applies to (game names, release
/// dates).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionalValue {
    pub region: Option<String>,
    pub value: String,
}

/// A value tagged with a language (synopses, genres).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalizedValue {
    pub language: Option<String>,
    pub value: String,
}

/// One downloadable media variant of a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    /// Service media-type identifier (e.g. "box-2D").
    pub kind: String,
    pub region: Option<String>,
    pub url: String,
    /// File extension reported by the service; may be empty.
    pub format: String,
}

/// A game as returned by the metadata service, reduced to the fields the
/// pipeline consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub id: u64,
    pub names: Vec<RegionalValue>,
    pub synopses: Vec<LocalizedValue>,
    pub release_dates: Vec<RegionalValue>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genres: Vec<LocalizedValue>,
    pub players: Option<String>,
    /// Normalized rating in 0.0..=1.0.
    pub rating: Option<f32>,
    pub media: Vec<MediaRecord>,
}

impl GameRecord {
    /// Name for the first preferred region with data, falling back to any.
    pub fn name_for_regions(&self, regions: &[Region]) -> Option<&str> {
        pick_regional(&self.names, regions)
    }

    /// Release date for the first preferred region with data.
    pub fn date_for_regions(&self, regions: &[Region]) -> Option<&str> {
        pick_regional(&self.release_dates, regions)
    }

    /// Synopsis in the given language, falling back to English, then any.
    pub fn synopsis_for_language(&self, language: &str) -> Option<&str> {
        pick_localized(&self.synopses, language)
    }

    /// Genre in the given language, falling back to English, then any.
    pub fn genre_for_language(&self, language: &str) -> Option<&str> {
        pick_localized(&self.genres, language)
    }

    /// Resolve the media record for a kind, walking the preferred regions
    /// in order, then any region; the kind's fallback service type is
    /// consulted the same way.
    pub fn media_for(&self, kind: MediaKind, regions: &[Region]) -> Option<&MediaRecord> {
        self.media_of_type(kind.api_type(), regions).or_else(|| {
            kind.api_type_fallback()
                .and_then(|fb| self.media_of_type(fb, regions))
        })
    }

    fn media_of_type(&self, api_type: &str, regions: &[Region]) -> Option<&MediaRecord> {
        let of_type: Vec<&MediaRecord> = self.media.iter().filter(|m| m.kind == api_type).collect();
        for region in regions {
            let code = region.api_code();
            if let Some(found) = of_type.iter().find(|m| m.region.as_deref() == Some(code)) {
                return Some(found);
            }
        }
        of_type.first().copied()
    }
}

fn pick_regional<'a>(values: &'a [RegionalValue], regions: &[Region]) -> Option<&'a str> {
    for region in regions {
        let code = region.api_code();
        if let Some(found) = values.iter().find(|v| v.region.as_deref() == Some(code)) {
            return Some(&found.value);
        }
    }
    values.first().map(|v| v.value.as_str())
}

fn pick_localized<'a>(values: &'a [LocalizedValue], language: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|v| v.language.as_deref() == Some(language))
        .or_else(|| values.iter().find(|v| v.language.as_deref() == Some("en")))
        .or_else(|| values.first())
        .map(|v| v.value.as_str())
}

/// Result of a media download.
#[derive(Debug, Clone)]
pub enum MediaPayload {
    /// Actual media bytes; content type as reported by the server.
    Data {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    /// The service has no media of this kind for the game.
    NoMedia,
    /// The service reports the media is unchanged from what the client
    /// already has (CRC handshake).
    HashUnchanged,
}

/// Account limits and usage returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub max_threads: u32,
    pub max_requests_per_minute: u32,
    pub requests_today: u32,
    pub max_requests_per_day: u32,
}

/// Service health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub api_open: bool,
    pub threads_in_use: Option<u32>,
}

/// Everything the service needs to identify a ROM.
#[derive(Debug, Clone, Default)]
pub struct LookupQuery {
    pub system_id: u32,
    pub rom_name: String,
    pub rom_size: u64,
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub serial: Option<String>,
}

impl LookupQuery {
    /// Canonical parameter list: every present field as a key/value pair,
    /// sorted by key. This is the identity used for caching and
    /// single-flight deduplication.
    pub fn canonical_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("romnom".into(), self.rom_name.clone()),
            ("romtaille".into(), self.rom_size.to_string()),
            ("systemeid".into(), self.system_id.to_string()),
        ];
        if let Some(ref crc) = self.crc32 {
            params.push(("crc".into(), crc.to_lowercase()));
        }
        if let Some(ref md5) = self.md5 {
            params.push(("md5".into(), md5.to_lowercase()));
        }
        if let Some(ref sha1) = self.sha1 {
            params.push(("sha1".into(), sha1.to_lowercase()));
        }
        if let Some(ref serial) = self.serial {
            params.push(("serialnum".into(), serial.clone()));
        }
        params.sort();
        params
    }
}

/// Abstract remote catalog.
#[async_trait]
pub trait MetadataAPI: Send + Sync {
    /// Look up a game. `Err(ScrapeError::NotFound)` means the service does
    /// not know this ROM; other errors follow the crate-wide taxonomy.
    async fn lookup_game(&self, query: &LookupQuery) -> Result<GameRecord, ScrapeError>;

    /// Download one media variant previously resolved from a
    /// [`GameRecord`].
    async fn download_media(
        &self,
        system_id: u32,
        game_id: u64,
        media: &MediaRecord,
    ) -> Result<MediaPayload, ScrapeError>;

    /// Account limits; called once at startup to size the worker pool.
    async fn user_info(&self) -> Result<UserInfo, ScrapeError>;

    /// Service health snapshot.
    async fn server_info(&self) -> Result<ServerInfo, ScrapeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_names() -> GameRecord {
        GameRecord {
            names: vec![
                RegionalValue { region: Some("jp".into()), value: "Rockman".into() },
                RegionalValue { region: Some("us".into()), value: "Mega Man".into() },
            ],
            media: vec![
                MediaRecord {
                    kind: "box-2D".into(),
                    region: Some("jp".into()),
                    url: "http://example/jp.png".into(),
                    format: "png".into(),
                },
                MediaRecord {
                    kind: "box-2D".into(),
                    region: Some("us".into()),
                    url: "http://example/us.png".into(),
                    format: "png".into(),
                },
                MediaRecord {
                    kind: "wheel".into(),
                    region: None,
                    url: "http://example/wheel.png".into(),
                    format: "png".into(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn name_prefers_region_order() {
        let record = record_with_names();
        assert_eq!(
            record.name_for_regions(&[Region::Usa, Region::Japan]),
            Some("Mega Man")
        );
        assert_eq!(
            record.name_for_regions(&[Region::Japan]),
            Some("Rockman")
        );
        // Unmatched region falls back to the first entry.
        assert_eq!(record.name_for_regions(&[Region::Europe]), Some("Rockman"));
    }

    #[test]
    fn media_resolution_walks_regions_then_any() {
        let record = record_with_names();
        let media = record
            .media_for(MediaKind::Cover, &[Region::Usa, Region::Japan])
            .unwrap();
        assert_eq!(media.url, "http://example/us.png");

        let media = record.media_for(MediaKind::Cover, &[Region::Europe]).unwrap();
        assert_eq!(media.url, "http://example/jp.png");
    }

    #[test]
    fn media_fallback_type_is_consulted() {
        let record = record_with_names();
        // No wheel-hd in the record, so the marquee resolves via "wheel".
        let media = record.media_for(MediaKind::Marquee, &[Region::Usa]).unwrap();
        assert_eq!(media.url, "http://example/wheel.png");
    }

    #[test]
    fn canonical_params_are_sorted_and_complete() {
        let query = LookupQuery {
            system_id: 1,
            rom_name: "Sonic.md".into(),
            rom_size: 524288,
            crc32: Some("F9394E97".into()),
            md5: None,
            sha1: Some("abc".into()),
            serial: Some("GM 00001009-00".into()),
        };
        let params = query.canonical_params();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(params.contains(&("crc".into(), "f9394e97".into())));
    }
}
