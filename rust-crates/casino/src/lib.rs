pub mod app;

pub mod account;

pub mod dice;

pub mod engine;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
