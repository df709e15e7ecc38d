use serde::{Deserialize, Serialize};

/// Geographic regions for ROM releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Japan
    Japan,
    /// USA / North America
    Usa,
    /// Europe (PAL regions)
    Europe,
    /// Korea
    Korea,
    /// China
    China,
    /// Brazil
    Brazil,
    /// Australia
    Australia,
    /// World / Region-free
    World,
    /// Unknown region
    Unknown,
}

impl Region {
    /// Returns the standard abbreviation for this region.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Japan => "JPN",
            Self::Usa => "USA",
            Self::Europe => "EUR",
            Self::Korea => "KOR",
            Self::China => "CHN",
            Self::Brazil => "BRA",
            Self::Australia => "AUS",
            Self::World => "WLD",
            Self::Unknown => "UNK",
        }
    }

    /// Returns the full name of this region.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Japan => "Japan",
            Self::Usa => "USA",
            Self::Europe => "Europe",
            Self::Korea => "Korea",
            Self::China => "China",
            Self::Brazil => "Brazil",
            Self::Australia => "Australia",
            Self::World => "World",
            Self::Unknown => "Unknown",
        }
    }

    /// Region code used by the remote metadata service for name/media
    /// selection.
    pub fn api_code(&self) -> &'static str {
        match self {
            Self::Japan => "jp",
            Self::Usa => "us",
            Self::Europe => "eu",
            Self::Korea => "kr",
            Self::China => "cn",
            Self::Brazil => "br",
            Self::Australia => "au",
            Self::World => "wor",
            Self::Unknown => "wor",
        }
    }

    /// Parse an API region code (e.g. from a `--regions` argument).
    pub fn from_api_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "jp" | "jpn" => Some(Self::Japan),
            "us" | "usa" => Some(Self::Usa),
            "eu" | "eur" => Some(Self::Europe),
            "kr" | "kor" => Some(Self::Korea),
            "cn" | "chn" => Some(Self::China),
            "br" | "bra" => Some(Self::Brazil),
            "au" | "aus" => Some(Self::Australia),
            "wor" | "world" => Some(Self::World),
            _ => None,
        }
    }

    /// Attempt to parse a region from a code character (common in serial
    /// numbers and cartridge headers).
    pub fn from_code_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'J' => Some(Self::Japan),
            'U' | 'E' => Some(Self::Usa), // E is sometimes used for "English/USA"
            'P' => Some(Self::Europe),    // PAL
            'K' => Some(Self::Korea),
            'C' => Some(Self::China),
            'B' => Some(Self::Brazil),
            'A' => Some(Self::Australia),
            'W' => Some(Self::World),
            _ => None,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_codes_round_trip() {
        for region in [Region::Japan, Region::Usa, Region::Europe, Region::World] {
            assert_eq!(Region::from_api_code(region.api_code()), Some(region));
        }
    }

    #[test]
    fn code_chars() {
        assert_eq!(Region::from_code_char('j'), Some(Region::Japan));
        assert_eq!(Region::from_code_char('P'), Some(Region::Europe));
        assert_eq!(Region::from_code_char('?'), None);
    }
}
