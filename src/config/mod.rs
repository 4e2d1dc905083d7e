//! Configuration loaded from `.pwstore.toml`.

pub mod settings;

pub use settings::Settings;
