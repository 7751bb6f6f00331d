//! Route modules, one per resource.

pub mod books;
pub mod checkout;
pub mod contact;
pub mod dashboard;
pub mod genres;
pub mod health;
pub mod home;
pub mod metrics;
pub mod newsletter;
pub mod orders;
pub mod podcasts;
pub mod users;
pub mod webhook;
