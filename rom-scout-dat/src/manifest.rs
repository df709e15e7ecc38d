//! Logiqx XML manifest parser.
//!
//! Reads the `<datafile>` documents produced by No-Intro, Redump and
//! compatible tools into owned records. Unknown elements and attributes are
//! ignored; game order is preserved.

use std::io::BufRead;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// A parsed ROM manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub header: ManifestHeader,
    pub games: Vec<Game>,
}

/// Manifest header block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestHeader {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// A single game entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub name: String,
    pub is_bios: bool,
    pub serial: Option<String>,
    pub header_tag: Option<String>,
    pub roms: Vec<Rom>,
}

impl Game {
    /// True when the scraper should consider this game at all: BIOS images
    /// and entries without any ROM are never scraped.
    pub fn is_scrape_candidate(&self) -> bool {
        !self.is_bios && !self.roms.is_empty()
    }

    /// The ROM used for metadata lookups (the first one; multi-rom games
    /// are looked up by their primary dump).
    pub fn primary_rom(&self) -> Option<&Rom> {
        self.roms.first()
    }

    /// Entry name without the file extension, used to key catalog entries
    /// and media files.
    pub fn base_name(&self) -> &str {
        self.name.as_str()
    }
}

/// Dump status recorded in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RomStatus {
    Verified,
    NoDump,
    BadDump,
    #[default]
    None,
}

impl RomStatus {
    fn from_attr(value: &str) -> Self {
        match value {
            "verified" | "good" => Self::Verified,
            "nodump" => Self::NoDump,
            "baddump" => Self::BadDump,
            _ => Self::None,
        }
    }
}

/// A single ROM file within a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rom {
    pub name: String,
    pub size: u64,
    /// CRC32 checksum (lowercase hex)
    pub crc32: Option<String>,
    /// MD5 checksum (lowercase hex)
    pub md5: Option<String>,
    /// SHA1 checksum (lowercase hex)
    pub sha1: Option<String>,
    pub status: RomStatus,
    pub serial: Option<String>,
    pub header_tag: Option<String>,
}

/// Marker recognized in game names as an alternative to the `isbios`
/// attribute.
const BIOS_MARKER: &str = "[BIOS]";

/// Parse a manifest from a reader. Failure is fatal for the run.
pub fn parse_manifest<R: BufRead>(reader: R) -> Result<Manifest, ManifestError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut manifest = Manifest {
        header: ManifestHeader::default(),
        games: Vec::new(),
    };

    let mut in_header = false;
    let mut current_tag = String::new();
    let mut current_game: Option<Game> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag_name.as_str() {
                    "header" => in_header = true,
                    "game" | "machine" => current_game = Some(parse_game_attributes(e)?),
                    "rom" => {
                        // Some writers emit <rom ...></rom> instead of the
                        // self-closing form.
                        if let Some(ref mut game) = current_game {
                            game.roms.push(parse_rom_attributes(e)?);
                        }
                    }
                    _ => current_tag = tag_name,
                }
            }
            Event::Empty(ref e) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag_name == "rom" {
                    if let Some(ref mut game) = current_game {
                        game.roms.push(parse_rom_attributes(e)?);
                    }
                }
            }
            Event::Text(ref e) => {
                if in_header {
                    let text = e.unescape()?.to_string();
                    match current_tag.as_str() {
                        "name" => manifest.header.name = text,
                        "description" => manifest.header.description = text,
                        "version" => manifest.header.version = text,
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag_name.as_str() {
                    "header" => in_header = false,
                    "game" | "machine" => {
                        if let Some(game) = current_game.take() {
                            manifest.games.push(game);
                        }
                    }
                    _ => current_tag.clear(),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if manifest.header.name.is_empty() && manifest.games.is_empty() {
        return Err(ManifestError::invalid(
            "No header or games found in manifest",
        ));
    }

    Ok(manifest)
}

/// Parse a manifest from a file path.
pub fn parse_manifest_file(path: &Path) -> Result<Manifest, ManifestError> {
    let file = std::fs::File::open(path)?;
    parse_manifest(std::io::BufReader::new(file))
}

fn parse_game_attributes(e: &BytesStart<'_>) -> Result<Game, ManifestError> {
    let mut game = Game {
        name: String::new(),
        is_bios: false,
        serial: None,
        header_tag: None,
        roms: Vec::new(),
    };

    for attr in e.attributes() {
        let attr = attr?;
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"name" => game.name = value,
            b"isbios" => game.is_bios = value.eq_ignore_ascii_case("yes"),
            b"serial" => game.serial = Some(value),
            b"header" => game.header_tag = Some(value),
            _ => {}
        }
    }

    // Older manifests mark BIOS images only in the name.
    if game.name.contains(BIOS_MARKER) {
        game.is_bios = true;
    }

    Ok(game)
}

fn parse_rom_attributes(e: &BytesStart<'_>) -> Result<Rom, ManifestError> {
    let mut rom = Rom::default();

    for attr in e.attributes() {
        let attr = attr?;
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"name" => rom.name = value,
            b"size" => {
                rom.size = value
                    .parse()
                    .map_err(|_| ManifestError::invalid(format!("Invalid ROM size: {value}")))?;
            }
            b"crc" => rom.crc32 = Some(value.to_lowercase()),
            b"md5" => rom.md5 = Some(value.to_lowercase()),
            b"sha1" => rom.sha1 = Some(value.to_lowercase()),
            b"status" => rom.status = RomStatus::from_attr(&value),
            b"serial" => rom.serial = Some(value),
            b"header" => rom.header_tag = Some(value),
            _ => {}
        }
    }

    Ok(rom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DAT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE datafile SYSTEM "http://www.logiqx.com/Dats/datafile.dtd">
<datafile>
    <header>
        <name>Sega - Mega Drive - Genesis</name>
        <description>Sega - Mega Drive - Genesis (20240101-000000)</description>
        <version>20240101-000000</version>
    </header>
    <game name="[BIOS] Mega-CD Boot ROM (Japan)">
        <rom name="[BIOS] Mega-CD Boot ROM (Japan).md" size="131072" crc="9D2DA8F2"/>
    </game>
    <game name="Sonic The Hedgehog (USA, Europe)">
        <rom name="Sonic The Hedgehog (USA, Europe).md" size="524288" crc="F9394E97" md5="1BC674BE034E43C96B86487AC69D9293" sha1="6DDB7DE1E17E7F6CdF0E2E86F9A44A2DC6A1C31F" serial="GM 00001009-00" status="verified"/>
    </game>
    <game name="Streets of Rage 2 (USA)" isbios="no">
        <rom name="Streets of Rage 2 (USA).md" size="1048576" crc="E01FA526"/>
    </game>
</datafile>"#;

    #[test]
    fn parses_header_and_games_in_order() {
        let manifest = parse_manifest(SAMPLE_DAT.as_bytes()).unwrap();
        assert_eq!(manifest.header.name, "Sega - Mega Drive - Genesis");
        assert_eq!(manifest.header.version, "20240101-000000");
        assert_eq!(manifest.games.len(), 3);
        assert_eq!(manifest.games[0].name, "[BIOS] Mega-CD Boot ROM (Japan)");
        assert_eq!(manifest.games[1].name, "Sonic The Hedgehog (USA, Europe)");
        assert_eq!(manifest.games[2].name, "Streets of Rage 2 (USA)");
    }

    #[test]
    fn bios_marker_in_name_sets_is_bios() {
        let manifest = parse_manifest(SAMPLE_DAT.as_bytes()).unwrap();
        assert!(manifest.games[0].is_bios);
        assert!(!manifest.games[0].is_scrape_candidate());
        assert!(manifest.games[1].is_scrape_candidate());
    }

    #[test]
    fn rom_fields_are_normalized() {
        let manifest = parse_manifest(SAMPLE_DAT.as_bytes()).unwrap();
        let rom = manifest.games[1].primary_rom().unwrap();
        assert_eq!(rom.size, 524288);
        assert_eq!(rom.crc32.as_deref(), Some("f9394e97"));
        assert_eq!(rom.md5.as_deref(), Some("1bc674be034e43c96b86487ac69d9293"));
        assert_eq!(rom.serial.as_deref(), Some("GM 00001009-00"));
        assert_eq!(rom.status, RomStatus::Verified);
    }

    #[test]
    fn isbios_attribute_is_recognized() {
        let xml = r#"<datafile>
            <header><name>t</name><version>1</version></header>
            <game name="System Boot" isbios="yes">
                <rom name="boot.bin" size="1024" crc="deadbeef"/>
            </game>
        </datafile>"#;
        let manifest = parse_manifest(xml.as_bytes()).unwrap();
        assert!(manifest.games[0].is_bios);
    }

    #[test]
    fn unknown_attributes_are_tolerated() {
        let xml = r#"<datafile>
            <header><name>t</name><version>1</version></header>
            <game name="Game" cloneof="Other" weird="x">
                <rom name="game.bin" size="16" crc="00000000" mystery="y"/>
            </game>
        </datafile>"#;
        let manifest = parse_manifest(xml.as_bytes()).unwrap();
        assert_eq!(manifest.games.len(), 1);
        assert_eq!(manifest.games[0].roms.len(), 1);
    }

    #[test]
    fn empty_game_is_not_a_candidate() {
        let xml = r#"<datafile>
            <header><name>t</name><version>1</version></header>
            <game name="Empty Shell"></game>
        </datafile>"#;
        let manifest = parse_manifest(xml.as_bytes()).unwrap();
        assert!(!manifest.games[0].is_scrape_candidate());
    }

    #[test]
    fn empty_document_is_an_error() {
        let result = parse_manifest(r#"<?xml version="1.0"?><datafile></datafile>"#.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn invalid_size_is_an_error() {
        let xml = r#"<datafile>
            <header><name>t</name><version>1</version></header>
            <game name="Game"><rom name="g.bin" size="huge" crc="00000000"/></game>
        </datafile>"#;
        assert!(parse_manifest(xml.as_bytes()).is_err());
    }

    #[test]
    fn walking_games_round_trips_name_and_rom_tuples() {
        let manifest = parse_manifest(SAMPLE_DAT.as_bytes()).unwrap();
        let tuples: Vec<(String, Vec<(String, u64)>)> = manifest
            .games
            .iter()
            .map(|g| {
                (
                    g.name.clone(),
                    g.roms.iter().map(|r| (r.name.clone(), r.size)).collect(),
                )
            })
            .collect();
        assert_eq!(tuples.len(), 3);
        assert_eq!(tuples[1].1[0].1, 524288);
        assert!(tuples[2].1[0].0.starts_with("Streets of Rage 2"));
    }
}
