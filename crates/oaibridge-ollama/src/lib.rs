#![doc = include_str!("../README.md")]

pub mod client;
pub mod ndjson;
pub mod wire;

pub use client::OllamaClient;
