//! Guest-facing surfaces over the session pipeline.
//!
//! - [`http`] — JSON API consumed by the embedded chat widget
//! - [`cli`] — terminal chat for local testing

pub mod cli;
pub mod http;
