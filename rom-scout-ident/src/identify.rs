//! Identification orchestrator.
//!
//! Routes a path through the right probe (ZIP, CHD, loose file, directory),
//! computes the requested hashes and runs the platform header parsers.
//! Parsers are selected by file extension first; a failed magic check is a
//! miss, never an error.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::Serialize;

use rom_scout_core::{HashKind, IdentifyError, PlatformFacts, ReadSeek};

use crate::chd_probe;
use crate::hasher::{self, HashSelection};
use crate::zip_probe::ZipProbe;

/// How much work to spend on hashing and containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashMode {
    /// Hash files up to the size limit; read archive metadata only.
    #[default]
    Default,
    /// Same as Default (kept distinct so callers can tighten it later
    /// without changing call sites).
    Fast,
    /// Hash everything, decompressing archive members.
    Slow,
}

/// Default hash-size ceiling: 128 MiB covers every cartridge dump while
/// keeping disc images out of the hash path.
pub const DEFAULT_MAX_HASH_SIZE: u64 = 128 * 1024 * 1024;

/// Options controlling identification.
#[derive(Debug, Clone, Copy)]
pub struct IdentifyOptions {
    pub hash_mode: HashMode,
    /// Files larger than this are not hashed in Default/Fast modes.
    pub max_hash_size: u64,
}

impl Default for IdentifyOptions {
    fn default() -> Self {
        Self {
            hash_mode: HashMode::Default,
            max_hash_size: DEFAULT_MAX_HASH_SIZE,
        }
    }
}

/// One identified file or archive member.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyItem {
    pub name: String,
    pub size: u64,
    pub hashes: BTreeMap<HashKind, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<PlatformFacts>,
}

/// Identification result for one input path.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyResult {
    pub path: PathBuf,
    pub items: Vec<IdentifyItem>,
}

/// Identify a file, archive or directory.
///
/// Items are sorted by name so repeated runs produce identical output.
pub fn identify(path: &Path, options: &IdentifyOptions) -> Result<IdentifyResult, IdentifyError> {
    let metadata = std::fs::metadata(path).map_err(|e| IdentifyError::io(path, e))?;

    let mut items = if metadata.is_dir() {
        identify_dir(path, options)?
    } else {
        identify_file(path, metadata.len(), options)?
    };

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(IdentifyResult {
        path: path.to_path_buf(),
        items,
    })
}

fn identify_dir(path: &Path, options: &IdentifyOptions) -> Result<Vec<IdentifyItem>, IdentifyError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| IdentifyError::io(path, e))?
        .flatten()
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut items = Vec::new();
    for entry in entries {
        let metadata = std::fs::metadata(&entry).map_err(|e| IdentifyError::io(&entry, e))?;
        if metadata.is_dir() {
            items.extend(identify_dir(&entry, options)?);
        } else {
            items.extend(identify_file(&entry, metadata.len(), options)?);
        }
    }
    Ok(items)
}

fn identify_file(
    path: &Path,
    size: u64,
    options: &IdentifyOptions,
) -> Result<Vec<IdentifyItem>, IdentifyError> {
    let ext = extension_of(path);
    match ext.as_str() {
        "zip" => identify_zip(path, options),
        "chd" => identify_chd(path, size),
        _ => identify_loose(path, size, &ext, options),
    }
}

fn identify_loose(
    path: &Path,
    size: u64,
    ext: &str,
    options: &IdentifyOptions,
) -> Result<Vec<IdentifyItem>, IdentifyError> {
    let limit = match options.hash_mode {
        HashMode::Slow => None,
        HashMode::Default | HashMode::Fast => Some(options.max_hash_size),
    };
    let hashes = hasher::hash_file(path, HashSelection::all(), limit)?;

    let file = std::fs::File::open(path).map_err(|e| IdentifyError::io(path, e))?;
    let mut reader = std::io::BufReader::new(file);
    let facts = parse_header(&mut reader, ext).map_err(|e| IdentifyError::io(path, e))?;

    Ok(vec![IdentifyItem {
        name: file_name_of(path),
        size,
        hashes,
        facts,
    }])
}

fn identify_zip(path: &Path, options: &IdentifyOptions) -> Result<Vec<IdentifyItem>, IdentifyError> {
    let file = std::fs::File::open(path).map_err(|e| IdentifyError::io(path, e))?;
    let mut probe = ZipProbe::open(std::io::BufReader::new(file))?;
    let members = probe.members()?;

    let mut items = Vec::with_capacity(members.len());
    for member in members {
        match options.hash_mode {
            HashMode::Default | HashMode::Fast => {
                // Central directory only: CRC32 is already there.
                let mut hashes = BTreeMap::new();
                hashes.insert(HashKind::Crc32, member.crc32.clone());
                items.push(IdentifyItem {
                    name: member.name,
                    size: member.size,
                    hashes,
                    facts: None,
                });
            }
            HashMode::Slow => {
                let data = probe.read_member(&member.name)?;
                let hashes = hasher::hash_reader(Cursor::new(&data), HashSelection::all())
                    .map_err(|e| IdentifyError::io(path, e))?;
                let member_ext = extension_of(Path::new(&member.name));
                let facts = parse_header(&mut Cursor::new(&data), &member_ext)
                    .map_err(|e| IdentifyError::io(path, e))?;
                items.push(IdentifyItem {
                    name: member.name,
                    size: member.size,
                    hashes,
                    facts,
                });
            }
        }
    }
    Ok(items)
}

fn identify_chd(path: &Path, size: u64) -> Result<Vec<IdentifyItem>, IdentifyError> {
    let file = std::fs::File::open(path).map_err(|e| IdentifyError::io(path, e))?;
    let mut reader = std::io::BufReader::new(file);
    let info = chd_probe::probe(&mut reader)?;

    let mut hashes = BTreeMap::new();
    hashes.insert(HashKind::Sha1, info.sha1);

    Ok(vec![IdentifyItem {
        name: file_name_of(path),
        size,
        hashes,
        facts: None,
    }])
}

type ParserFn = fn(&mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>>;

/// Parsers to try for a file extension, in order. First match wins.
fn parsers_for_extension(ext: &str) -> &'static [ParserFn] {
    match ext {
        "nes" => &[rom_scout_nintendo::nes::parse],
        "sfc" | "smc" => &[rom_scout_nintendo::snes::parse],
        "z64" | "v64" | "n64" => &[rom_scout_nintendo::n64::parse],
        "gb" | "gbc" => &[rom_scout_nintendo::gameboy::parse],
        "gba" => &[rom_scout_nintendo::gba::parse],
        "nds" | "dsi" | "ids" => &[rom_scout_nintendo::ds::parse],
        "md" | "gen" | "smd" => &[rom_scout_sega::megadrive::parse],
        "xbe" => &[rom_scout_microsoft::xbox::parse],
        "iso" => &[
            rom_scout_sony::disc::parse,
            rom_scout_sega::saturn::parse,
            rom_scout_sega::dreamcast::parse,
        ],
        "bin" | "img" => &[
            rom_scout_sega::megadrive::parse,
            rom_scout_sony::disc::parse,
            rom_scout_sega::saturn::parse,
            rom_scout_sega::dreamcast::parse,
        ],
        "cdi" | "gdi" => &[rom_scout_sega::dreamcast::parse],
        _ => &[],
    }
}

/// Run the extension-selected parsers until one validates.
fn parse_header(
    reader: &mut dyn ReadSeek,
    ext: &str,
) -> std::io::Result<Option<PlatformFacts>> {
    for parser in parsers_for_extension(ext) {
        if let Some(facts) = parser(reader)? {
            return Ok(Some(facts));
        }
    }
    Ok(None)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("?")
        .to_string()
}

#[cfg(test)]
#[path = "tests/identify_tests.rs"]
mod tests;
