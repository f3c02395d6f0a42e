//! Application Services

mod notification_dispatcher;

pub use notification_dispatcher::{
    ContextHandle, NotificationDispatcher, NotificationError, Registration, WaveSignal,
};
