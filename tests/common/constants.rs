//! Shared constants for integration tests
//!
//! Artist, release and torrent data used across the test suite.

// ============================================================================
// Recommendations
// ============================================================================

pub const BOC: &str = "Boards of Canada";

pub const MHTRTC: &str = "Music Has the Right to Children";

pub const GEOGADDI: &str = "Geogaddi";

/// Track that first appeared on Music Has the Right to Children
pub const ROYGBIV: &str = "Roygbiv";

pub const UNKNOWN_TRACK: &str = "Untitled Demo 4";

// ============================================================================
// Registry
// ============================================================================

pub const MHTRTC_MBID: &str = "mb-mhtrtc";

pub const GEOGADDI_MBID: &str = "mb-geogaddi";

pub const BOC_ARTIST_MBID: &str = "arid-boc";

// ============================================================================
// Catalog
// ============================================================================

pub const MHTRTC_GROUP_ID: u64 = 501;

pub const GEOGADDI_GROUP_ID: u64 = 502;

/// The only WEB edition of Music Has the Right to Children
pub const MHTRTC_WEB_ID: u64 = 1001;

/// A second WEB edition, only used by token tie-break tests
pub const MHTRTC_WEB_TOKEN_ID: u64 = 1004;

pub const MHTRTC_CD_ID: u64 = 1002;

pub const MHTRTC_CD_2_ID: u64 = 1003;

pub const GEOGADDI_CD_ID: u64 = 2001;

pub const GB: u64 = 1_000_000_000;
