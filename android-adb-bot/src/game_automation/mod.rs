// Game automation module
// Screen checks, input dispatch and the playbooks that drive an app through
// its screens, one engine per device.

pub mod dispatcher;
pub mod error;
pub mod fsm;
pub mod playbook;
pub mod templates;
pub mod types;

// Re-export the main types for easy access
pub use dispatcher::{ActionDispatcher, Joystick, point_on_circle};
pub use error::{AutomationError, AutomationResult};
pub use fsm::ScreenStateEngine;
pub use playbook::PlaybookKind;
pub use templates::{Component, Template, TemplateId, TemplateRegistry};
pub use types::{CancelToken, ClickOptions, PollConfig, ScreenState, SessionStatus, Timings};

#[cfg(test)]
mod tests;
