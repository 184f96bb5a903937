pub mod conversation;
pub mod locale;
pub mod message;
