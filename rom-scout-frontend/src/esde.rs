//! ES-DE gamelist generation and media tree writes.
//!
//! The generator merges newly scraped entries into any existing
//! `gamelist.xml`, keyed by normalized base name, and rewrites the file
//! atomically with entries ordered by name so repeated runs are
//! byte-identical. Media files land in fixed per-kind subdirectories.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::FrontendError;
use crate::media_types::MediaKind;

/// One `<game>` element of a gamelist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamelistEntry {
    /// ROM path relative to the system directory (e.g. "./Game.md").
    pub path: String,
    pub name: String,
    pub desc: Option<String>,
    /// Normalized rating in 0.0..=1.0.
    pub rating: Option<f32>,
    /// Release date; any of YYYYMMDD, YYYY-MM-DD or the ES-DE timestamp
    /// form are accepted and normalized on write.
    pub release_date: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub players: Option<String>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub marquee: Option<String>,
    pub video: Option<String>,
    pub fanart: Option<String>,
}

impl GamelistEntry {
    /// Key used to merge against existing entries.
    pub fn merge_key(&self) -> String {
        if self.path.is_empty() {
            normalize_base_name(&self.name)
        } else {
            normalize_base_name(&self.path)
        }
    }
}

/// Normalize an entry path or name into the merge/media key: leading "./"
/// and the extension stripped, lowercased.
pub fn normalize_base_name(path_or_name: &str) -> String {
    let trimmed = path_or_name.trim().trim_start_matches("./");
    let file = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    let stem = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem,
        _ => file,
    };
    stem.to_lowercase()
}

/// Outcome of a media write under the overwrite policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaWriteOutcome {
    /// Bytes were written to a fresh (or overwritten) destination.
    Written,
    /// A non-empty destination already existed and `overwrite` was off.
    SkippedExisting,
}

/// Candidate extensions checked when testing whether media already exists.
fn candidate_extensions(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Video => &["mp4", "avi", "webm"],
        _ => &["png", "jpg", "jpeg"],
    }
}

/// ES-DE output writer.
pub struct EsDeGenerator {
    gamelist_path: PathBuf,
    media_dir: PathBuf,
    overwrite: bool,
}

impl EsDeGenerator {
    pub fn new(gamelist_path: PathBuf, media_dir: PathBuf, overwrite: bool) -> Self {
        Self {
            gamelist_path,
            media_dir,
            overwrite,
        }
    }

    pub fn gamelist_path(&self) -> &Path {
        &self.gamelist_path
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Merge-keys of entries already present in the target gamelist.
    ///
    /// A missing file yields an empty set; a corrupt file is logged and
    /// treated as empty so a damaged catalog never blocks a scrape.
    pub fn existing_entry_names(&self) -> std::collections::HashSet<String> {
        if !self.gamelist_path.exists() {
            return Default::default();
        }
        match read_gamelist(&self.gamelist_path) {
            Ok(entries) => entries.iter().map(|e| e.merge_key()).collect(),
            Err(e) => {
                log::warn!(
                    "Could not read existing gamelist {}: {}",
                    self.gamelist_path.display(),
                    e,
                );
                Default::default()
            }
        }
    }

    /// Destination path for a media file.
    pub fn media_dest(&self, kind: MediaKind, base_name: &str, ext: &str) -> PathBuf {
        self.media_dir
            .join(kind.subdir())
            .join(format!("{}.{}", base_name, ext))
    }

    /// True when a non-empty media file for this kind and base name exists.
    pub fn media_exists(&self, kind: MediaKind, base_name: &str) -> bool {
        candidate_extensions(kind).iter().any(|ext| {
            self.media_dest(kind, base_name, ext)
                .metadata()
                .map(|m| m.len() > 0)
                .unwrap_or(false)
        })
    }

    /// Write media bytes under the overwrite policy, atomically.
    pub fn write_media(
        &self,
        kind: MediaKind,
        base_name: &str,
        ext: &str,
        bytes: &[u8],
    ) -> Result<(MediaWriteOutcome, PathBuf), FrontendError> {
        let dest = self.media_dest(kind, base_name, ext);
        if !self.overwrite {
            if let Ok(meta) = dest.metadata() {
                if meta.len() > 0 {
                    return Ok((MediaWriteOutcome::SkippedExisting, dest));
                }
            }
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&dest, bytes)?;
        Ok((MediaWriteOutcome::Written, dest))
    }

    /// Merge new entries into the existing gamelist and write it out.
    ///
    /// New entries replace existing ones with the same merge key; everything
    /// else is retained. The output is ordered by `name` (then path) so the
    /// file is deterministic. Returns the total entry count written.
    pub fn merge_and_write(&self, new_entries: Vec<GamelistEntry>) -> Result<usize, FrontendError> {
        let mut merged: HashMap<String, GamelistEntry> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        if self.gamelist_path.exists() {
            match read_gamelist(&self.gamelist_path) {
                Ok(existing) => {
                    for entry in existing {
                        let key = entry.merge_key();
                        if !merged.contains_key(&key) {
                            order.push(key.clone());
                        }
                        merged.insert(key, entry);
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Existing gamelist {} is unreadable, rewriting it: {}",
                        self.gamelist_path.display(),
                        e,
                    );
                }
            }
        }

        for entry in new_entries {
            let key = entry.merge_key();
            if !merged.contains_key(&key) {
                order.push(key.clone());
            }
            merged.insert(key, entry);
        }

        let mut entries: Vec<&GamelistEntry> = merged.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));

        let xml = render_gamelist(&entries);
        if let Some(parent) = self.gamelist_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&self.gamelist_path, xml.as_bytes())?;
        Ok(entries.len())
    }
}

/// Write bytes to a temporary file in the destination directory, then
/// rename over the target. Readers never observe a partial file.
fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("out");
    let tmp = dir.join(format!(".{}.tmp-{}", file_name, std::process::id()));

    let result = (|| {
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, dest)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a gamelist file into entries. Unknown elements are ignored.
pub fn read_gamelist(path: &Path) -> Result<Vec<GamelistEntry>, FrontendError> {
    let file = std::fs::File::open(path)?;
    read_gamelist_from(std::io::BufReader::new(file))
}

fn read_gamelist_from<R: BufRead>(reader: R) -> Result<Vec<GamelistEntry>, FrontendError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<GamelistEntry> = None;
    let mut current_tag = String::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "game" {
                    current = Some(GamelistEntry::default());
                } else {
                    current_tag = tag;
                }
            }
            Event::Text(ref e) => {
                if let Some(ref mut entry) = current {
                    let text = e.unescape()?.to_string();
                    match current_tag.as_str() {
                        "path" => entry.path = text,
                        "name" => entry.name = text,
                        "desc" => entry.desc = Some(text),
                        "rating" => entry.rating = text.parse().ok(),
                        "releasedate" => entry.release_date = Some(text),
                        "developer" => entry.developer = Some(text),
                        "publisher" => entry.publisher = Some(text),
                        "genre" => entry.genre = Some(text),
                        "players" => entry.players = Some(text),
                        "image" => entry.image = Some(text),
                        "thumbnail" => entry.thumbnail = Some(text),
                        "marquee" => entry.marquee = Some(text),
                        "video" => entry.video = Some(text),
                        "fanart" => entry.fanart = Some(text),
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "game" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                } else {
                    current_tag.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn render_gamelist(entries: &[&GamelistEntry]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\"?>\n");
    xml.push_str("<gameList>\n");

    for entry in entries {
        xml.push_str("  <game>\n");
        write_tag(&mut xml, "path", &entry.path);
        write_tag(&mut xml, "name", &entry.name);
        write_opt_tag(&mut xml, "desc", &entry.desc);
        if let Some(rating) = entry.rating {
            write_tag(&mut xml, "rating", &format!("{:.2}", rating));
        }
        if let Some(ref date) = entry.release_date {
            write_tag(&mut xml, "releasedate", &format_esde_date(date));
        }
        write_opt_tag(&mut xml, "developer", &entry.developer);
        write_opt_tag(&mut xml, "publisher", &entry.publisher);
        write_opt_tag(&mut xml, "genre", &entry.genre);
        write_opt_tag(&mut xml, "players", &entry.players);
        write_opt_tag(&mut xml, "image", &entry.image);
        write_opt_tag(&mut xml, "thumbnail", &entry.thumbnail);
        write_opt_tag(&mut xml, "marquee", &entry.marquee);
        write_opt_tag(&mut xml, "video", &entry.video);
        write_opt_tag(&mut xml, "fanart", &entry.fanart);
        xml.push_str("  </game>\n");
    }

    xml.push_str("</gameList>\n");
    xml
}

fn write_tag(xml: &mut String, tag: &str, value: &str) {
    xml.push_str("    <");
    xml.push_str(tag);
    xml.push('>');
    xml.push_str(&escape_xml(value));
    xml.push_str("</");
    xml.push_str(tag);
    xml.push_str(">\n");
}

fn write_opt_tag(xml: &mut String, tag: &str, value: &Option<String>) {
    if let Some(v) = value {
        write_tag(xml, tag, v);
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Convert YYYY-MM-DD or YYYYMMDD dates to ES-DE's YYYYMMDDTHHMMSS format.
/// Values already in that format pass through unchanged.
fn format_esde_date(date: &str) -> String {
    if date.len() == 15 && date.as_bytes().get(8) == Some(&b'T') {
        return date.to_string();
    }
    let cleaned: String = date.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.len() >= 8 {
        format!("{}T000000", &cleaned[..8])
    } else {
        format!("{}T000000", cleaned)
    }
}

#[cfg(test)]
#[path = "tests/esde_tests.rs"]
mod tests;
