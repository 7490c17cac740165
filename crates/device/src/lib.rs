//! Device deployment over adb
//!
//! A typed, deliberately thin layer over the adb CLI plus the two tasks
//! built on it: deploy and uninstall.

pub mod adb;
pub mod deploy;

pub use adb::{Adb, Device, DeviceState};
pub use deploy::{deploy, remote_path, uninstall, Deployment};
