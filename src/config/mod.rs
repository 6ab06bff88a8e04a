pub mod bot;

pub use bot::{BotConfig, ChannelTarget, ResponseMode, SharedBotConfig, TlsPaths};
