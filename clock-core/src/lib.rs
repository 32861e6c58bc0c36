#![no_std]

// Shared logic for the weather clock.
//
// Every acquisition engine and the display rotation live here as plain state
// machines driven by `poll`, so the firmware and the host emulator run the
// exact same cycle against their own collaborators.
pub mod backoff;
pub mod config;
pub mod connectivity;
pub mod cycle;
pub mod display;
pub mod error;
pub mod status;
pub mod telemetry;
pub mod text;
pub mod time;
pub mod time_sync;
pub mod weather;
