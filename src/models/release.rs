use serde::{Deserialize, Serialize};

use super::format::{Encoding, Format, Media};

/// A catalog torrent that satisfied one of the format preferences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRelease {
    pub release_id: u64,
    pub group_id: u64,
    /// Zero-based index into the preference list that produced this hit.
    pub matched_preference_rank: usize,
    pub size_bytes: u64,
    pub seeders: u32,
    pub has_freeleech_token: bool,
    pub log_score: Option<i32>,
    pub has_cue: Option<bool>,
    pub media: Media,
    pub format: Format,
    pub encoding: Encoding,
    pub artist_name: String,
    pub group_name: String,
}

impl CandidateRelease {
    pub fn display_size(&self) -> String {
        format!("{:#}", byte_unit::Byte::from(self.size_bytes))
    }
}

/// Release types understood by the catalog's browse endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseType {
    Album = 1,
    Soundtrack = 3,
    Ep = 5,
    Anthology = 6,
    Compilation = 7,
    Single = 9,
    LiveAlbum = 11,
    Remix = 13,
    Bootleg = 14,
    Interview = 15,
    Mixtape = 16,
    Demo = 17,
    ConcertRecording = 18,
    DjMix = 19,
    Unknown = 21,
}

impl ReleaseType {
    pub fn catalog_id(&self) -> u32 {
        *self as u32
    }

    /// Map a registry release-group primary/secondary type name.
    pub fn from_registry_type(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "album" => Some(ReleaseType::Album),
            "soundtrack" => Some(ReleaseType::Soundtrack),
            "ep" => Some(ReleaseType::Ep),
            "compilation" => Some(ReleaseType::Compilation),
            "single" => Some(ReleaseType::Single),
            "live" => Some(ReleaseType::LiveAlbum),
            "remix" => Some(ReleaseType::Remix),
            "interview" => Some(ReleaseType::Interview),
            "mixtape/street" => Some(ReleaseType::Mixtape),
            "demo" => Some(ReleaseType::Demo),
            "dj-mix" => Some(ReleaseType::DjMix),
            "other" => Some(ReleaseType::Unknown),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_type_from_registry() {
        assert_eq!(ReleaseType::from_registry_type("Album"), Some(ReleaseType::Album));
        assert_eq!(ReleaseType::from_registry_type("EP"), Some(ReleaseType::Ep));
        assert_eq!(ReleaseType::Ep.catalog_id(), 5);
        assert_eq!(ReleaseType::from_registry_type("Broadcast"), None);
    }
}
