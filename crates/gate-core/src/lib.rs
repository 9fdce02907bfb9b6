//! Hardware-independent core library for the parking gate controller
//!
//! This crate contains all platform-agnostic logic for the gate: the
//! controller state machine, ranging conversion, badge normalization, the
//! screen model, peripheral trait definitions, and the character display
//! driver.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod badge;
pub mod config;
pub mod controller;
pub mod display;
pub mod gate;
pub mod ranging;
pub mod sensors;
