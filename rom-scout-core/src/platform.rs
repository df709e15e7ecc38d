/// Platform identifiers for all systems the scraper and identifier support.
///
/// This enum centralizes console identity — short names, display names,
/// manufacturer, aliases, file extensions and the remote system id — in one
/// place, replacing ad-hoc string matching throughout the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    // Nintendo
    Nes,
    Snes,
    N64,
    GameBoy,
    Gba,
    Ds,

    // Sega
    MegaDrive,
    Saturn,
    Dreamcast,

    // Sony
    Ps1,
    Ps2,
    Psp,

    // Microsoft
    Xbox,
}

/// All platform variants in registration order.
const ALL_PLATFORMS: &[Platform] = &[
    Platform::Nes,
    Platform::Snes,
    Platform::N64,
    Platform::GameBoy,
    Platform::Gba,
    Platform::Ds,
    Platform::MegaDrive,
    Platform::Saturn,
    Platform::Dreamcast,
    Platform::Ps1,
    Platform::Ps2,
    Platform::Psp,
    Platform::Xbox,
];

impl Platform {
    /// Canonical short name used for CLI arguments and folder paths.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Nes => "nes",
            Self::Snes => "snes",
            Self::N64 => "n64",
            Self::GameBoy => "gb",
            Self::Gba => "gba",
            Self::Ds => "nds",
            Self::MegaDrive => "megadrive",
            Self::Saturn => "saturn",
            Self::Dreamcast => "dreamcast",
            Self::Ps1 => "ps1",
            Self::Ps2 => "ps2",
            Self::Psp => "psp",
            Self::Xbox => "xbox",
        }
    }

    /// Full display name for the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nes => "Nintendo Entertainment System",
            Self::Snes => "Super Nintendo Entertainment System",
            Self::N64 => "Nintendo 64",
            Self::GameBoy => "Game Boy / Game Boy Color",
            Self::Gba => "Game Boy Advance",
            Self::Ds => "Nintendo DS",
            Self::MegaDrive => "Sega Mega Drive / Genesis",
            Self::Saturn => "Sega Saturn",
            Self::Dreamcast => "Sega Dreamcast",
            Self::Ps1 => "Sony PlayStation",
            Self::Ps2 => "Sony PlayStation 2",
            Self::Psp => "Sony PlayStation Portable",
            Self::Xbox => "Microsoft Xbox",
        }
    }

    /// Console manufacturer.
    pub fn manufacturer(&self) -> &'static str {
        match self {
            Self::Nes | Self::Snes | Self::N64 | Self::GameBoy | Self::Gba | Self::Ds => "Nintendo",
            Self::MegaDrive | Self::Saturn | Self::Dreamcast => "Sega",
            Self::Ps1 | Self::Ps2 | Self::Psp => "Sony",
            Self::Xbox => "Microsoft",
        }
    }

    /// All accepted names for this platform (case-insensitive matching).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Nes => &["nes", "famicom", "fc"],
            Self::Snes => &["snes", "sfc", "super famicom", "super nintendo"],
            Self::N64 => &["n64", "nintendo 64", "nintendo64"],
            Self::GameBoy => &["gb", "gbc", "gameboy", "game boy"],
            Self::Gba => &["gba", "game boy advance", "gameboy advance"],
            Self::Ds => &["nds", "ds", "nintendo ds"],
            Self::MegaDrive => &["megadrive", "mega drive", "genesis", "md", "gen"],
            Self::Saturn => &["saturn", "sega saturn"],
            Self::Dreamcast => &["dreamcast", "dc"],
            Self::Ps1 => &["ps1", "psx", "playstation", "playstation1"],
            Self::Ps2 => &["ps2", "playstation2", "playstation 2"],
            Self::Psp => &["psp", "playstation portable"],
            Self::Xbox => &["xbox", "xbox1", "ogxbox"],
        }
    }

    /// File extensions commonly associated with this platform (lowercase).
    ///
    /// Container extensions (`zip`, `chd`) are handled by the probes and are
    /// deliberately absent here.
    pub fn file_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Nes => &["nes"],
            Self::Snes => &["sfc", "smc"],
            Self::N64 => &["z64", "v64", "n64"],
            Self::GameBoy => &["gb", "gbc"],
            Self::Gba => &["gba"],
            Self::Ds => &["nds", "dsi", "ids"],
            Self::MegaDrive => &["md", "gen", "smd", "bin"],
            Self::Saturn => &["iso", "bin", "img"],
            Self::Dreamcast => &["gdi", "cdi", "iso", "bin"],
            Self::Ps1 => &["iso", "bin", "img"],
            Self::Ps2 => &["iso", "bin", "img"],
            Self::Psp => &["iso", "cso"],
            Self::Xbox => &["iso", "xbe"],
        }
    }

    /// True for platforms whose games ship as disc images rather than
    /// cartridge dumps.
    pub fn is_disc_based(&self) -> bool {
        matches!(
            self,
            Self::Saturn | Self::Dreamcast | Self::Ps1 | Self::Ps2 | Self::Psp | Self::Xbox
        )
    }

    /// Numeric system id used by the remote metadata service.
    pub fn system_id(&self) -> u32 {
        match self {
            Self::MegaDrive => 1,
            Self::Nes => 3,
            Self::Snes => 4,
            Self::GameBoy => 9,
            Self::Gba => 12,
            Self::N64 => 14,
            Self::Ds => 15,
            Self::Saturn => 22,
            Self::Dreamcast => 23,
            Self::Xbox => 32,
            Self::Ps1 => 57,
            Self::Ps2 => 58,
            Self::Psp => 61,
        }
    }

    /// All supported platform variants.
    pub fn all() -> &'static [Platform] {
        ALL_PLATFORMS
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error returned when a string cannot be parsed into a `Platform`.
#[derive(Debug, Clone)]
pub struct PlatformParseError(pub String);

impl std::fmt::Display for PlatformParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown platform: '{}'", self.0)
    }
}

impl std::error::Error for PlatformParseError {}

impl std::str::FromStr for Platform {
    type Err = PlatformParseError;

    /// Parse a platform from any recognized name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        for &platform in ALL_PLATFORMS {
            if platform.short_name() == lower {
                return Ok(platform);
            }
            for alias in platform.aliases() {
                if *alias == lower {
                    return Ok(platform);
                }
            }
        }
        // Numeric system ids are accepted too (the CLI allows --system <id>).
        if let Ok(id) = lower.parse::<u32>() {
            for &platform in ALL_PLATFORMS {
                if platform.system_id() == id {
                    return Ok(platform);
                }
            }
        }
        Err(PlatformParseError(s.to_string()))
    }
}
