pub mod config;
pub mod leads;
pub mod period;
pub mod table;
pub mod tools;
pub mod utils;
