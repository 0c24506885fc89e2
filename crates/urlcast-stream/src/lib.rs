//! Urlcast Stream - publishing to and tailing a partitioned stream
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐     ┌──────────────┐
//! │ StreamProducer │     │  StreamTail  │
//! │ - one record   │     │ - group      │
//! │ - typed result │     │   cursor     │
//! └───────┬────────┘     └──────┬───────┘
//!         └──────────┬──────────┘
//!           ┌────────┴─────────┐
//!           │   StreamClient   │  (trait)
//!           └────────┬─────────┘
//!           ┌────────┴─────────┐
//!           │  HttpStreamClient│  signed REST
//!           └──────────────────┘
//! ```

mod client;
mod error;
mod http;
pub mod model;
mod producer;
mod tail;

pub use client::StreamClient;
pub use error::{StreamError, StreamResult};
pub use http::HttpStreamClient;
pub use producer::StreamProducer;
pub use tail::StreamTail;
