//! Dersimiz client core.
//!
//! Headless services behind the Dersimiz tutoring marketplace app: session
//! and locale state, the onboarding wizard, the availability editor, the
//! location picker, and thin wrappers over the REST API for chat, discovery,
//! notifications, support, subscriptions and profile management.

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod api;
pub mod availability;
pub mod chat;
pub mod config;
pub mod discovery;
pub mod error;
pub mod i18n;
pub mod legal;
pub mod locale;
pub mod locations;
pub mod model;
pub mod notifications;
pub mod onboarding;
pub mod poller;
pub mod profile;
pub mod session;
pub mod storage;
pub mod subscription;
pub mod support;
pub mod tutor;

#[cfg(test)]
pub(crate) mod testing;
