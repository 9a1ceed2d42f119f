/// Game configuration constants.
///
/// This module defines the main gameplay parameters such as the starting clock
/// and the rating parameters applied when a game completes.
pub const DEFAULT_CLOCK_SECONDS: f64 = 600.0; // 10 minutes per side.

/// Maximum rating adjustment for a single game (Elo K-factor).
pub const ELO_K_FACTOR: f64 = 32.0;

/// Rating given to accounts that have never played.
pub const DEFAULT_RATING: i32 = 1200;

/// How long a completed session stays readable for reconnect snapshots (in seconds).
pub const COMPLETED_SESSION_RETENTION_SECS: u64 = 3600;

/// How often the reaper scans the session store (in seconds).
pub const REAPER_INTERVAL_SECS: u64 = 60;
