pub mod alerts;
pub mod report;
pub mod snapshot;
pub mod telegram;

pub use alerts::{AlertDispatcher, AlertedSet};
pub use snapshot::SnapshotWriter;
pub use telegram::{ChatSender, TelegramNotifier};
