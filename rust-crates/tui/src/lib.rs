pub mod casino_client;
pub mod client;
pub mod ui;
