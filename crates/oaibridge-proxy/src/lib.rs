#![doc = include_str!("../README.md")]

pub mod assemble;
pub mod error;
pub mod models;
pub mod server;
pub mod stream;
pub mod transcode;

pub use error::ApiError;
pub use server::{create_router, serve};
