pub mod alert;
pub mod notification;
pub mod quote;
pub mod user;

pub use alert::{Alert, AlertStatus, Decision, Frequency, Operator, SkipReason};
pub use notification::{ChannelKind, DispatchOutcome, TriggerEvent};
pub use quote::{CacheEntry, PriceQuote};
pub use user::{Owner, Recipient, User};
