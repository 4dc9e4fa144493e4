pub mod breach;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod intel;
pub mod models;
pub mod pipeline;
pub mod probes;
pub mod queue;
pub mod risk;
pub mod utils;

#[cfg(test)]
mod test_support;
