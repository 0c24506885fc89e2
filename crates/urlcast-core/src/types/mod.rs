//! Core types for urlcast

mod event;
mod message;
mod object_url;

pub use event::*;
pub use message::*;
pub use object_url::*;
