//! Database models, one file per table.
//! Everything is re-exported at `crate::db::models`.

pub mod channel_subscription;
pub mod reminder_grant;
pub mod workspace;

pub use self::channel_subscription::*;
pub use self::reminder_grant::*;
pub use self::workspace::*;
