mod api;
mod cancel;
mod query;
mod reader;
mod resolver;
mod service;
mod store;
mod watcher;
#[cfg(windows)]
mod win;

pub use api::*;
pub use cancel::*;
pub use query::*;
pub use reader::*;
pub use resolver::*;
pub use service::*;
pub use store::*;
pub use watcher::*;
#[cfg(windows)]
pub use win::*;
