//! Riad concierge — a multi-tenant guesthouse chat concierge.
//!
//! Each guest session is bound to one property (tenant). The property's
//! facts are interpolated into a persona template to form the system
//! instruction, which accompanies every message sent to the hosted model.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;

pub mod persona;
pub mod session;
pub mod startup;
pub mod tenants;

pub mod adapters;
