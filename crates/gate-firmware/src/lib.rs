//! ESP32-S3 firmware-specific modules for the parking gate
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: ESP32 peripheral initialization, the MFRC522 reader adapter, and
//! the build-time badge configuration.

#![no_std]

pub mod badge_secrets;
pub mod hardware;
pub mod reader;
