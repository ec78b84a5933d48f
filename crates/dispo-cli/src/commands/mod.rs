pub mod common;
pub mod completions;
pub mod history;
pub mod list;
pub mod remote;
pub mod reset;
pub mod submit;
pub mod sync;
pub mod watch;
