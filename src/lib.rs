// Gatekeep: a Telegram moderation bot
//
// This is the library root. Signals come from `toxicity` and `spam`, the
// `moderation` engine turns them into a verdict, and `enforcement` acts on
// it through the chat platform `telegram` provides.

pub mod config;
pub mod enforcement;
pub mod moderation;
pub mod output;
pub mod spam;
pub mod telegram;
pub mod toxicity;
