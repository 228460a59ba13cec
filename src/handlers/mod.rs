pub mod api;
pub mod history;
pub mod proxy;
pub mod repositories;
pub mod search;
