use crate::config::SearchConfig;
use crate::models::{EnrichedRecommendation, FormatPreference, Media};
use crate::services::BrowseQuery;

/// Build the catalog browse query for one preference rank.
///
/// Returns `None` for a recommendation with nothing to search for (an unresolved track).
pub fn browse_query(
    enriched: &EnrichedRecommendation,
    preference: &FormatPreference,
    search: &SearchConfig,
) -> Option<BrowseQuery> {
    let group_name = enriched.search_title()?;

    let mut query = BrowseQuery::default();
    query.push("artistname", enriched.artist());
    query.push("groupname", group_name);
    query.push("format", preference.format.as_str());
    query.push("encoding", preference.encoding.as_str());
    if preference.media != Media::Any {
        query.push("media", preference.media.as_str());
    }

    if let Some(extras) = &preference.cd_only_extras {
        if let Some(log) = extras.log {
            query.push("haslog", log);
        }
        if extras.has_cue == Some(true) {
            query.push("hascue", 1);
        }
    }

    if search.use_release_type {
        if let Some(release_type) = enriched.release_type {
            query.push("releasetype", release_type.catalog_id());
        }
    }
    if search.use_first_release_year {
        if let Some(year) = enriched.release_year {
            query.push("year", year);
        }
    }
    if search.use_record_label {
        if let Some(label) = &enriched.record_label {
            query.push("recordlabel", label);
        }
    }
    if search.use_catalog_number {
        if let Some(catalog_number) = &enriched.catalog_number {
            query.push("cataloguenumber", catalog_number);
        }
    }

    query.push("group_results", 1);
    query.push("order_by", "seeders");
    query.push("order_way", "desc");
    Some(query)
}
