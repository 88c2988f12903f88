//! Result reporting for the command line tool

pub mod hook;
pub mod reporter;

pub use hook::GoodHook;
pub use reporter::{OutputPaths, Reporter};
