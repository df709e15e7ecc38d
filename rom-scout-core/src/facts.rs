use serde::{Deserialize, Serialize};

use crate::platform::Platform;
use crate::region::Region;

/// Game Boy Color support declared in the cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CgbSupport {
    /// DMG-only cartridge.
    None,
    /// Runs on both DMG and CGB.
    Enhanced,
    /// CGB-exclusive cartridge.
    Required,
}

/// Nintendo 64 ROM byte orders, named after their conventional extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum N64Format {
    /// Big-endian (native).
    Z64,
    /// Byte-swapped (16-bit pairs swapped).
    V64,
    /// Little-endian (32-bit words reversed).
    N64,
}

/// Header facts extracted by the per-platform parsers.
///
/// One variant per platform family, carrying only the fields that platform's
/// header defines. Callers pattern-match; the accessor methods below cover
/// the fields shared across platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformFacts {
    /// iNES / NES 2.0 header. The format carries no title or serial; PRG/CHR
    /// sizes are the identifying extras.
    Nes {
        prg_rom_size: u32,
        chr_rom_size: u32,
        mapper: u16,
        nes2: bool,
    },
    Snes {
        title: String,
        region: Option<Region>,
        maker_code: Option<String>,
        /// Map mode byte; bit 0 distinguishes LoROM (0) from HiROM (1).
        map_mode: u8,
        version: u8,
    },
    N64 {
        title: String,
        game_code: String,
        region: Option<Region>,
        version: u8,
        format: N64Format,
    },
    #[serde(rename = "gb")]
    GameBoy {
        title: String,
        licensee: Option<String>,
        cgb: CgbSupport,
    },
    Gba {
        title: String,
        game_code: String,
        maker: Option<String>,
        version: u8,
    },
    MegaDrive {
        domestic_title: String,
        overseas_title: String,
        serial: String,
        regions: Vec<Region>,
        /// True when the source file was SMD-interleaved and was
        /// de-interleaved before parsing.
        interleaved: bool,
    },
    #[serde(rename = "nds")]
    Ds {
        title: String,
        game_code: String,
        maker: Option<String>,
    },
    /// ISO-9660 disc platforms (PS1/PS2/PSP, Saturn, Dreamcast): serial and
    /// title come from SYSTEM.CNF or the IP.BIN boot header.
    Disc {
        system: Platform,
        serial: Option<String>,
        title: Option<String>,
        version: Option<String>,
        disc_no: Option<u8>,
    },
    Xbox {
        title: String,
        title_id: u32,
    },
}

impl PlatformFacts {
    /// The platform this header belongs to.
    pub fn platform(&self) -> Platform {
        match self {
            Self::Nes { .. } => Platform::Nes,
            Self::Snes { .. } => Platform::Snes,
            Self::N64 { .. } => Platform::N64,
            Self::GameBoy { .. } => Platform::GameBoy,
            Self::Gba { .. } => Platform::Gba,
            Self::MegaDrive { .. } => Platform::MegaDrive,
            Self::Ds { .. } => Platform::Ds,
            Self::Disc { system, .. } => *system,
            Self::Xbox { .. } => Platform::Xbox,
        }
    }

    /// Internal title, where the header defines one.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Nes { .. } => None,
            Self::Snes { title, .. }
            | Self::N64 { title, .. }
            | Self::GameBoy { title, .. }
            | Self::Gba { title, .. }
            | Self::Ds { title, .. }
            | Self::Xbox { title, .. } => Some(title.as_str()),
            Self::MegaDrive { overseas_title, domestic_title, .. } => {
                if !overseas_title.is_empty() {
                    Some(overseas_title.as_str())
                } else if !domestic_title.is_empty() {
                    Some(domestic_title.as_str())
                } else {
                    None
                }
            }
            Self::Disc { title, .. } => title.as_deref(),
        }
    }

    /// Serial number or game code suitable for metadata lookups.
    pub fn serial(&self) -> Option<&str> {
        match self {
            Self::Nes { .. } | Self::Snes { .. } | Self::GameBoy { .. } => None,
            Self::N64 { game_code, .. } | Self::Gba { game_code, .. } | Self::Ds { game_code, .. } => {
                Some(game_code.as_str())
            }
            Self::MegaDrive { serial, .. } => {
                if serial.is_empty() { None } else { Some(serial.as_str()) }
            }
            Self::Disc { serial, .. } => serial.as_deref(),
            Self::Xbox { .. } => None,
        }
    }

    /// Primary region, where the header declares one.
    pub fn region(&self) -> Option<Region> {
        match self {
            Self::Snes { region, .. } | Self::N64 { region, .. } => *region,
            Self::MegaDrive { regions, .. } => regions.first().copied(),
            _ => None,
        }
    }

    /// Maker / licensee / publisher code, where the header declares one.
    pub fn maker(&self) -> Option<&str> {
        match self {
            Self::Snes { maker_code, .. } => maker_code.as_deref(),
            Self::GameBoy { licensee, .. } => licensee.as_deref(),
            Self::Gba { maker, .. } | Self::Ds { maker, .. } => maker.as_deref(),
            _ => None,
        }
    }

    /// Version or revision, where the header declares one.
    pub fn version(&self) -> Option<String> {
        match self {
            Self::Snes { version, .. } | Self::N64 { version, .. } | Self::Gba { version, .. } => {
                Some(format!("1.{}", version))
            }
            Self::Disc { version, .. } => version.clone(),
            _ => None,
        }
    }

    /// Disc number for multi-disc releases.
    pub fn disc_no(&self) -> Option<u8> {
        match self {
            Self::Disc { disc_no, .. } => *disc_no,
            _ => None,
        }
    }
}
