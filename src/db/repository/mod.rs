pub mod channel_subscription;
pub mod reminder_grant;
pub mod workspace;

pub use channel_subscription::ChannelSubscriptionRepository;
pub use reminder_grant::ReminderGrantRepository;
pub use workspace::WorkspaceRepository;
