// Messaging module - commands in, notifications out

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{create_notification_channel, NotificationConsumer, NotificationProducer};
pub use command::Command;
pub use notification::Notification;
