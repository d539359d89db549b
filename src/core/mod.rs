pub mod config;
pub mod part_catalog;

// Per-frame rendering and scan progression
pub mod overlay_renderer;
pub mod scan_sequencer;

// Classification run once a scan completes
pub mod skin_tone;
pub mod body_type;

pub mod session_reporter;
pub mod scan_session;
