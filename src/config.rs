//! Application-level configuration constants.

// Content source
pub const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const SHEET_AURORE: &str = "page1_je_mappelle_aurore";
pub const SHEET_TOPOGRAPHY: &str = "page2_topographie_etrange";
pub const SHEET_RELICS: &str = "page3_reliques_reve";
pub const SHEET_MEMORIES: &str = "page4_memoires_mont_songe";
pub const ALL_SHEETS: [&str; 4] = [
    SHEET_AURORE,
    SHEET_TOPOGRAPHY,
    SHEET_RELICS,
    SHEET_MEMORIES,
];

// Cache behavior: short TTL while developing, longer in release builds.
pub const CACHE_TTL_MS: f64 = if cfg!(debug_assertions) {
    2.0 * 60.0 * 1000.0
} else {
    5.0 * 60.0 * 1000.0
};
pub const CACHE_SWEEP_INTERVAL_MS: u32 = 5 * 60 * 1000;
pub const FETCH_TIMEOUT_MS: u32 = 10_000;

// Drag bounds: keep at least this much of a figure reachable on screen,
// with some extra vertical room below the fold.
pub const DRAG_KEEPIN_PX: f64 = 50.0;
pub const DRAG_BOUNDS_HEIGHT_FACTOR: f64 = 1.1;

// Ambient effects
pub const NUM_FLIES: usize = 5;
pub const FLY_TICK_MS: u32 = 250;
pub const TYPE_SPEED_MS: u32 = 50;
pub const TYPE_START_DELAY_MS: u32 = 300;
pub const TRAIL_INTERVAL_MS: u32 = 50;
pub const TRAIL_LIFETIME_MS: u32 = 1_000;
pub const LOGO_GLOW_MS: u32 = 400;

// Audio
pub const SFX_FILES: [&str; 3] = ["audio/1.m4a", "audio/2.m4a", "audio/3.m4a"];
pub const CONTACT_ADDRESS: &str = "contact@auroredelune.art";

/// Spreadsheet API key baked in at build time; `None` degrades to empty data.
pub fn sheets_api_key() -> Option<&'static str> {
    option_env!("AURORE_SHEETS_API_KEY")
}

/// Spreadsheet identifier baked in at build time.
pub fn spreadsheet_id() -> Option<&'static str> {
    option_env!("AURORE_SPREADSHEET_ID")
}

/// Base path the site is served under; prefixes relative asset references.
pub fn asset_base() -> &'static str {
    option_env!("AURORE_BASE_URL").unwrap_or("/")
}

/// Prefix a site-relative asset path with the configured base.
pub fn asset_url(path: &str) -> String {
    format!("{}{}", asset_base(), path.trim_start_matches('/'))
}
