//! # Poizon Order Bot
//!
//! A Telegram bot that takes clothing orders from the Poizon marketplace:
//! it converts yuan prices to roubles, keeps a per-customer cart, walks the
//! customer through checkout and lets them browse a curated catalog.

pub mod bot;
pub mod callback;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod localization;
pub mod pricing;
pub mod store;
pub mod telegram;
