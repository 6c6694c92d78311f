use std::collections::HashSet;

use serde::Serialize;

/// Torrents and groups the user has already snatched or is seeding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorSnatches {
    pub torrent_ids: HashSet<u64>,
    pub group_ids: HashSet<u64>,
    /// Lower-cased (artist, release name) pairs.
    pub names: HashSet<(String, String)>,
}

impl PriorSnatches {
    pub fn insert(&mut self, torrent_id: u64, group_id: u64, artist: &str, release: &str) {
        self.torrent_ids.insert(torrent_id);
        self.group_ids.insert(group_id);
        self.names
            .insert((artist.to_lowercase(), release.to_lowercase()));
    }

    pub fn contains_release(&self, torrent_id: u64, group_id: u64) -> bool {
        self.torrent_ids.contains(&torrent_id) || self.group_ids.contains(&group_id)
    }

    pub fn contains_name(&self, artist: &str, release: &str) -> bool {
        self.names
            .contains(&(artist.to_lowercase(), release.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.torrent_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.torrent_ids.is_empty()
    }
}

/// Account state fetched once at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserDetails {
    pub user_id: u64,
    pub uploaded_bytes: u64,
    pub downloaded_bytes: u64,
    pub ratio: f64,
    pub available_tokens: u32,
    pub prior_snatches: PriorSnatches,
}
