//! In-memory stores backing the relay endpoints.

pub mod call_history;
pub mod mailboxes;

pub use call_history::CallHistoryRepository;
pub use mailboxes::MailboxRepository;
