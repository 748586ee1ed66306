//! Qtfaststart - Move the moov atom of MP4/QuickTime files to the front
//!
//! This library crate exposes the configuration and file driver for
//! integration testing. The container logic lives in `qtfaststart-media`.

pub mod config;
pub mod driver;
