pub mod bot;
pub mod config;
pub mod core;
pub mod feed;
pub mod models;
pub mod notify;
pub mod strategies;
#[cfg(test)]
pub mod test_helpers;
pub mod trading;
