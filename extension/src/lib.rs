// The four execution contexts of the extension scaffold, running over
// the simulated host: background coordinator, page agent (content
// script), page-world bridge, and popup controller.

pub mod background;
pub mod content;
pub mod injected;
pub mod manifest;
pub mod popup;

pub use background::{BackgroundService, InstallDetails, PERIODIC_ALARM};
pub use content::{ContentScript, BADGE_ID, HIGHLIGHT_CLASS};
pub use injected::{BridgePageInfo, PageBridge};
pub use manifest::Manifest;
pub use popup::PopupController;
