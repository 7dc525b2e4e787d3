//! Alert notification: channels and the dispatch loop

mod channel;
mod notifier;

pub use channel::{
    ChannelError, LogChannel, NotificationChannel, SmtpChannel, WebhookChannel,
    channel_from_config,
};
pub use notifier::{Notifier, NotifyReport};
