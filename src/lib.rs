#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod delta;
pub mod discovery;
pub mod explorer;
pub mod html;
pub mod http;
pub mod locator;
pub mod logging;
pub mod metrics;
pub mod mirrors;
pub mod model;
pub mod render;
pub mod server;
pub mod source;
pub mod storage;
pub mod summarize;
pub mod tracked;
