pub mod config;
pub mod console;
pub mod devices;
pub mod error;
pub mod export;
pub mod subintervals;
pub mod tb_rust_client;
pub mod telemetry_table;
