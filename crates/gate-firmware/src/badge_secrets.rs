//! Authorized badge ID, baked in at build time from `GATE_BADGE_UID`.
//!
//! See `build.rs`: the value is taken from the environment or `.env` and
//! falls back to the factory badge.

pub const AUTHORIZED_BADGE: &str = env!("GATE_BADGE_UID");
