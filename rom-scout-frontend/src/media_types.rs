use serde::{Deserialize, Serialize};

/// Media kinds the scraper can download for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// In-game screenshot
    Screenshot,
    /// Title screen capture
    TitleScreen,
    /// Front box art (2D)
    Cover,
    /// Back box art (2D)
    BackCover,
    /// 3D rendered box art
    Cover3D,
    /// Logo / marquee / wheel image
    Marquee,
    /// Fan-created artwork
    Fanart,
    /// Gameplay or promotional video
    Video,
    /// Physical media image (cartridge/disc)
    PhysicalMedia,
}

/// All media kinds, in the default download order.
const ALL_KINDS: &[MediaKind] = &[
    MediaKind::Screenshot,
    MediaKind::TitleScreen,
    MediaKind::Cover,
    MediaKind::Cover3D,
    MediaKind::Marquee,
    MediaKind::Fanart,
    MediaKind::Video,
    MediaKind::PhysicalMedia,
    MediaKind::BackCover,
];

impl MediaKind {
    /// Every kind (the CLI default selects all of them).
    pub fn all() -> &'static [MediaKind] {
        ALL_KINDS
    }

    /// Subdirectory name inside the media tree (matches the ES-DE layout).
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshots",
            Self::TitleScreen => "titlescreens",
            Self::Cover => "covers",
            Self::BackCover => "backcovers",
            Self::Cover3D => "3dboxes",
            Self::Marquee => "marquees",
            Self::Fanart => "fanart",
            Self::Video => "videos",
            Self::PhysicalMedia => "physicalmedia",
        }
    }

    /// File extension when the service does not report one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Video => "mp4",
            _ => "png",
        }
    }

    /// Media type identifier used by the remote metadata service.
    pub fn api_type(&self) -> &'static str {
        match self {
            Self::Screenshot => "ss",
            Self::TitleScreen => "sstitle",
            Self::Cover => "box-2D",
            Self::BackCover => "box-2D-back",
            Self::Cover3D => "box-3D",
            Self::Marquee => "wheel-hd",
            Self::Fanart => "fanart",
            Self::Video => "video-normalized",
            Self::PhysicalMedia => "support-2D",
        }
    }

    /// Fallback service media type if the primary isn't available.
    pub fn api_type_fallback(&self) -> Option<&'static str> {
        match self {
            Self::Marquee => Some("wheel"),
            Self::Video => Some("video"),
            _ => None,
        }
    }

    /// Parse one CLI name (the subdir form, singular also accepted).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "screenshots" | "screenshot" => Some(Self::Screenshot),
            "titlescreens" | "titlescreen" => Some(Self::TitleScreen),
            "covers" | "cover" => Some(Self::Cover),
            "backcovers" | "backcover" => Some(Self::BackCover),
            "3dboxes" | "3dbox" | "cover3d" => Some(Self::Cover3D),
            "marquees" | "marquee" => Some(Self::Marquee),
            "fanart" => Some(Self::Fanart),
            "videos" | "video" => Some(Self::Video),
            "physicalmedia" => Some(Self::PhysicalMedia),
            _ => None,
        }
    }

    /// Parse a comma-separated selection, preserving order and dropping
    /// duplicates. Unknown names are returned as errors.
    pub fn parse_list(names: &[String]) -> Result<Vec<Self>, String> {
        let mut kinds = Vec::new();
        for name in names {
            let kind = Self::from_name(name).ok_or_else(|| format!("unknown media kind '{name}'"))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.subdir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for &kind in MediaKind::all() {
            assert_eq!(MediaKind::from_name(kind.subdir()), Some(kind));
        }
    }

    #[test]
    fn parse_list_rejects_unknown() {
        let err = MediaKind::parse_list(&["covers".into(), "sculptures".into()]).unwrap_err();
        assert!(err.contains("sculptures"));
    }

    #[test]
    fn parse_list_dedups_preserving_order() {
        let kinds = MediaKind::parse_list(&[
            "videos".into(),
            "covers".into(),
            "videos".into(),
        ])
        .unwrap();
        assert_eq!(kinds, vec![MediaKind::Video, MediaKind::Cover]);
    }

    #[test]
    fn video_extension_differs() {
        assert_eq!(MediaKind::Video.default_extension(), "mp4");
        assert_eq!(MediaKind::Cover.default_extension(), "png");
    }
}
