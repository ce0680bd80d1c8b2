//! Client-side data access for HR administration records: a deduplicating
//! response cache, request-fenced async queries, debounced inputs, durable
//! UI state and virtualized list windows, plus the terminal client built on
//! them.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod event;
pub mod logging;
pub mod persist;
pub mod query;
pub mod ui;
pub mod virtual_list;
