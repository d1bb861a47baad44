// Simulated browser host. Everything the four extension contexts touch
// that a real browser would provide: key-value storage, the message bus,
// alarms, notifications, and the page document.

pub mod alarms;
pub mod bus;
pub mod notify;
pub mod page;
pub mod store;

pub use alarms::{Alarm, Alarms};
pub use bus::{BusError, ContextId, MessageBus, Subscriber, DEFAULT_DEADLINE};
pub use notify::{Notification, Notifications};
pub use page::{Element, Mutation, PageDocument};
pub use store::LocalStore;
