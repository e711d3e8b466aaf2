//! Durable storage for the conversion history

pub mod history;

pub use history::HistoryStore;
