pub mod account;
pub mod attachment;

pub use account::MailAccount;
pub use attachment::StagedAttachment;
