pub mod settings;

pub use settings::{Settings, CONFIG_ENV};
