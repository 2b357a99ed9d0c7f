pub mod adb;
pub mod args;
pub mod config;
pub mod game_automation;
pub mod template_matching;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use adb::AdbBackend;
pub use config::AppConfig;
pub use game_automation::{ScreenStateEngine, TemplateRegistry};
