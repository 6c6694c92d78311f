//! Format preferences: the ranked (format, encoding, media) combinations a user
//! is willing to snatch.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "FLAC")]
    Flac,
    #[serde(rename = "MP3")]
    Mp3,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Flac => "FLAC",
            Format::Mp3 => "MP3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "24bit Lossless")]
    Lossless24Bit,
    #[serde(rename = "Lossless")]
    Lossless,
    #[serde(rename = "320")]
    Mp3320,
    #[serde(rename = "V0 (VBR)")]
    Mp3V0,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Lossless24Bit => "24bit Lossless",
            Encoding::Lossless => "Lossless",
            Encoding::Mp3320 => "320",
            Encoding::Mp3V0 => "V0 (VBR)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Media {
    /// No media constraint.
    #[serde(rename = "ANY")]
    Any,
    Cassette,
    #[serde(rename = "CD")]
    Cd,
    #[serde(rename = "SACD")]
    Sacd,
    Vinyl,
    #[serde(rename = "WEB")]
    Web,
}

impl Media {
    pub fn as_str(&self) -> &'static str {
        match self {
            Media::Any => "ANY",
            Media::Cassette => "Cassette",
            Media::Cd => "CD",
            Media::Sacd => "SACD",
            Media::Vinyl => "Vinyl",
            Media::Web => "WEB",
        }
    }

    /// Parse a media name as the catalog reports it. `ANY` is never reported.
    pub fn from_catalog(s: &str) -> Option<Self> {
        [
            Media::Cassette,
            Media::Cd,
            Media::Sacd,
            Media::Vinyl,
            Media::Web,
        ]
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }
}

/// Allowed values for the CD log constraint, as understood by the catalog:
/// -1 (log below 100%), 0 (no log), 1 (has a log), 100 (100% log).
pub const ALLOWED_LOG_VALUES: [i32; 4] = [-1, 0, 1, 100];

/// Extra constraints that only apply to CD rips. Unset fields are "don't care".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CdOnlyExtras {
    #[serde(default)]
    pub log: Option<i32>,
    #[serde(default)]
    pub has_cue: Option<bool>,
}

/// One entry of the ranked preference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatPreference {
    pub format: Format,
    pub encoding: Encoding,
    pub media: Media,
    #[serde(default)]
    pub cd_only_extras: Option<CdOnlyExtras>,
}

impl FormatPreference {
    pub fn new(format: Format, encoding: Encoding, media: Media) -> Self {
        Self {
            format,
            encoding,
            media,
            cd_only_extras: None,
        }
    }

    pub fn with_cd_extras(mut self, log: Option<i32>, has_cue: Option<bool>) -> Self {
        self.cd_only_extras = Some(CdOnlyExtras { log, has_cue });
        self
    }
}

impl fmt::Display for FormatPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.format.as_str(),
            self.encoding.as_str(),
            self.media.as_str()
        )?;
        if let Some(extras) = &self.cd_only_extras {
            if let Some(log) = extras.log {
                write!(f, " / log={}", log)?;
            }
            if extras.has_cue == Some(true) {
                write!(f, " / cue")?;
            }
        }
        Ok(())
    }
}
