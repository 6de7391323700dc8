pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod parser;
pub mod portal;
pub mod scraper;
pub mod signals;
pub mod utils;
