//! `foreman-notify` — structured outcome notifications and their delivery.
//!
//! A [`Notification`] is free text plus titled field-groups ([`Embed`]s).
//! Task reports render one from a template, then hand it to the [`Manager`],
//! which tries every configured [`Carrier`]. Delivery failures are logged
//! and never fatal — the scheduler keeps running whether or not anyone
//! hears about it.

pub mod carrier;
pub mod carriers;
pub mod manager;
pub mod notification;

pub use carrier::{find_carrier, Carrier, CarrierError, CarrierFactory};
pub use manager::Manager;
pub use notification::{substitute, Embed, Field, Level, Notification};
