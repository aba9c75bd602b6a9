//! Risk inference server: configuration and HTTP surface

pub mod api;
pub mod config;
