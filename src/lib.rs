#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod criteria;
pub mod error;
pub mod export;
pub mod formats;
pub mod harvest;
pub mod logging;
pub mod parse;
