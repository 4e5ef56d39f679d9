pub mod config;
pub mod patterns;
pub mod run;
pub mod waveform;
