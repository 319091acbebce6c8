#![forbid(unsafe_code)]

mod command;
mod frame;
mod parse;

pub use command::{Command, Expiry, SetCondition, SetOptions};
pub use frame::Frame;
pub use parse::Parse;
