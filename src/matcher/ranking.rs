//! Filtering browse hits against a preference, and picking one winner.

use crate::models::{CandidateRelease, FormatPreference, Media};
use crate::services::{BrowseGroup, BrowseTorrent};

/// Does this torrent satisfy every constraint of the preference?
///
/// The catalog applies the same filters server side, but browse results are grouped
/// and a group carries every edition it has, so hits are checked again here.
pub fn satisfies(torrent: &BrowseTorrent, preference: &FormatPreference) -> bool {
    if !torrent.format.eq_ignore_ascii_case(preference.format.as_str())
        || !torrent
            .encoding
            .eq_ignore_ascii_case(preference.encoding.as_str())
    {
        return false;
    }

    let media = match Media::from_catalog(&torrent.media) {
        Some(media) => media,
        None => return false,
    };
    if preference.media != Media::Any && preference.media != media {
        return false;
    }

    if media == Media::Cd {
        if let Some(extras) = &preference.cd_only_extras {
            let log_ok = match extras.log {
                None => true,
                Some(100) => torrent.has_log && torrent.log_score == 100,
                Some(1) => torrent.has_log,
                Some(0) => !torrent.has_log,
                Some(-1) => torrent.has_log && torrent.log_score < 100,
                Some(_) => false,
            };
            if !log_ok {
                return false;
            }
            if extras.has_cue == Some(true) && !torrent.has_cue {
                return false;
            }
        }
    }
    true
}

pub fn to_candidate(
    group: &BrowseGroup,
    torrent: &BrowseTorrent,
    preference: &FormatPreference,
    rank: usize,
) -> Option<CandidateRelease> {
    let media = Media::from_catalog(&torrent.media)?;
    Some(CandidateRelease {
        release_id: torrent.torrent_id,
        group_id: group.group_id,
        matched_preference_rank: rank,
        size_bytes: torrent.size,
        seeders: torrent.seeders,
        has_freeleech_token: torrent.can_use_token,
        log_score: torrent.has_log.then_some(torrent.log_score),
        has_cue: (media == Media::Cd).then_some(torrent.has_cue),
        media,
        format: preference.format,
        encoding: preference.encoding,
        artist_name: group.artist.clone(),
        group_name: group.group_name.clone(),
    })
}

/// Pick the winner among hits of a single rank, in the order the catalog returned them.
///
/// With tokens enabled the largest token-eligible hit wins, otherwise the best seeded.
/// Equal keys keep the earliest hit.
pub fn pick_best(hits: Vec<CandidateRelease>, tokens_enabled: bool) -> Option<CandidateRelease> {
    if tokens_enabled {
        let best_token = hits
            .iter()
            .enumerate()
            .filter(|(_, c)| c.has_freeleech_token)
            .fold(None::<(usize, u64)>, |best, (i, c)| match best {
                Some((_, size)) if size >= c.size_bytes => best,
                _ => Some((i, c.size_bytes)),
            });
        if let Some((index, _)) = best_token {
            return hits.into_iter().nth(index);
        }
    }

    let best_seeded = hits
        .iter()
        .enumerate()
        .fold(None::<(usize, u32)>, |best, (i, c)| match best {
            Some((_, seeders)) if seeders >= c.seeders => best,
            _ => Some((i, c.seeders)),
        });
    best_seeded.and_then(|(index, _)| hits.into_iter().nth(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Encoding, Format};

    fn torrent(id: u64, media: &str, encoding: &str) -> BrowseTorrent {
        BrowseTorrent {
            torrent_id: id,
            media: media.to_string(),
            format: "FLAC".to_string(),
            encoding: encoding.to_string(),
            size: 100,
            seeders: 1,
            has_log: false,
            log_score: 0,
            has_cue: false,
            can_use_token: true,
        }
    }

    fn candidate(id: u64, size: u64, seeders: u32, token: bool) -> CandidateRelease {
        CandidateRelease {
            release_id: id,
            group_id: 1,
            matched_preference_rank: 0,
            size_bytes: size,
            seeders,
            has_freeleech_token: token,
            log_score: None,
            has_cue: None,
            media: Media::Web,
            format: Format::Flac,
            encoding: Encoding::Lossless,
            artist_name: "a".to_string(),
            group_name: "g".to_string(),
        }
    }

    fn ids(c: Option<CandidateRelease>) -> Option<u64> {
        c.map(|c| c.release_id)
    }

    #[test]
    fn test_satisfies_format_and_media() {
        let web = FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Web);
        assert!(satisfies(&torrent(1, "WEB", "Lossless"), &web));
        assert!(!satisfies(&torrent(1, "CD", "Lossless"), &web));
        assert!(!satisfies(&torrent(1, "WEB", "24bit Lossless"), &web));

        let any = FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Any);
        assert!(satisfies(&torrent(1, "Vinyl", "Lossless"), &any));
        assert!(!satisfies(&torrent(1, "DVD", "Lossless"), &any));
    }

    #[test]
    fn test_satisfies_cd_log_and_cue() {
        let pref = FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Cd)
            .with_cd_extras(Some(100), Some(true));

        let mut perfect = torrent(1, "CD", "Lossless");
        perfect.has_log = true;
        perfect.log_score = 100;
        perfect.has_cue = true;
        assert!(satisfies(&perfect, &pref));

        let mut no_cue = perfect.clone();
        no_cue.has_cue = false;
        assert!(!satisfies(&no_cue, &pref));

        let mut bad_log = perfect.clone();
        bad_log.log_score = 80;
        assert!(!satisfies(&bad_log, &pref));

        let below_100 = FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Cd)
            .with_cd_extras(Some(-1), None);
        assert!(satisfies(&bad_log, &below_100));
        assert!(!satisfies(&perfect, &below_100));

        let no_log = FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Cd)
            .with_cd_extras(Some(0), None);
        assert!(satisfies(&torrent(2, "CD", "Lossless"), &no_log));
        assert!(!satisfies(&perfect, &no_log));
    }

    #[test]
    fn test_candidate_fields() {
        let group = BrowseGroup {
            group_id: 7,
            group_name: "Geogaddi".to_string(),
            artist: "Boards of Canada".to_string(),
            release_type: None,
            torrents: vec![],
        };
        let mut cd = torrent(3, "CD", "Lossless");
        cd.has_log = true;
        cd.log_score = 100;
        let pref = FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Any);

        let candidate = to_candidate(&group, &cd, &pref, 2).unwrap();
        assert_eq!(candidate.group_id, 7);
        assert_eq!(candidate.matched_preference_rank, 2);
        assert_eq!(candidate.media, Media::Cd);
        assert_eq!(candidate.log_score, Some(100));
        assert_eq!(candidate.has_cue, Some(false));

        let web = to_candidate(&group, &torrent(4, "WEB", "Lossless"), &pref, 0).unwrap();
        assert_eq!(web.log_score, None);
        assert_eq!(web.has_cue, None);
    }

    #[test]
    fn test_pick_most_seeded() {
        let hits = vec![
            candidate(1, 100, 5, false),
            candidate(2, 100, 9, false),
            candidate(3, 100, 9, false),
        ];
        assert_eq!(ids(pick_best(hits, false)), Some(2));
    }

    #[test]
    fn test_pick_largest_token_eligible() {
        let hits = vec![
            candidate(1, 900, 50, false),
            candidate(2, 300, 1, true),
            candidate(3, 500, 1, true),
            candidate(4, 500, 1, true),
        ];
        assert_eq!(ids(pick_best(hits.clone(), true)), Some(3));
        assert_eq!(ids(pick_best(hits, false)), Some(1));
    }

    #[test]
    fn test_tokens_enabled_without_eligible_hits_falls_back_to_seeders() {
        let hits = vec![candidate(1, 900, 2, false), candidate(2, 300, 8, false)];
        assert_eq!(ids(pick_best(hits, true)), Some(2));
    }

    #[test]
    fn test_pick_from_nothing() {
        assert_eq!(pick_best(vec![], true), None);
    }
}
