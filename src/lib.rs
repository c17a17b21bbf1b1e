// ai-completion - Local chat cache and completion request layer
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod request;
pub mod utils;
