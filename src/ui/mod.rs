//! User-facing text and Discord embeds.

pub mod embeds;
pub mod messages;
