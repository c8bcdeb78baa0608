//! Automation toolkit for the Odyssey dance troupe: signed attendance QR
//! codes, attendance CSV intake, Google Forms management and attendance
//! emails.

pub mod config;
pub mod logging;
pub mod services;
