//! Bakes the authorized badge ID into the firmware.
//!
//! `GATE_BADGE_UID` is read from the environment or a `.env` file next to
//! this crate. Each token is parsed as a hex byte and re-rendered as two
//! uppercase digits, so `"7 b6 e 17"` becomes `"07 B6 0E 17"` and compares
//! directly against a normalized card UID at runtime. Anything that is not
//! a list of 1 to 10 hex bytes fails the build.

const DEFAULT_BADGE_UID: &str = "77 B6 0E 17";
const MAX_UID_LEN: usize = 10;

fn normalize_badge(raw: &str) -> Result<String, String> {
    let bytes = raw
        .split_whitespace()
        .map(|token| {
            if token.len() > 2 {
                return Err(format!("`{token}` is not a single hex byte"));
            }
            u8::from_str_radix(token, 16).map_err(|_| format!("`{token}` is not a hex byte"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if bytes.is_empty() {
        return Err("no bytes given".into());
    }
    if bytes.len() > MAX_UID_LEN {
        return Err(format!("{} bytes given, at most {MAX_UID_LEN} allowed", bytes.len()));
    }

    Ok(bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" "))
}

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=GATE_BADGE_UID");

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            println!("cargo:warning=could not load .env: {e}");
        }
    }

    let raw = std::env::var("GATE_BADGE_UID").unwrap_or_else(|_| DEFAULT_BADGE_UID.into());
    let badge = match normalize_badge(&raw) {
        Ok(badge) => badge,
        Err(reason) => panic!("GATE_BADGE_UID={raw:?} is invalid: {reason}"),
    };
    println!("cargo:rustc-env=GATE_BADGE_UID={badge}");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
