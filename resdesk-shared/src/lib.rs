pub mod models;
pub mod pii;

pub use models::notification::{Notification, NotificationLevel};
pub use pii::{mask_email, Masked};
