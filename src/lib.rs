// src/lib.rs

//! LeadShark enrichment library

pub mod cache;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
