// src/lib.rs — Library root for Scrutineer

pub mod api;
pub mod cli;
pub mod core;
pub mod infra;
pub mod memory;
pub mod provider;
pub mod rag;
pub mod tools;
pub mod util;
