// src/handlers/mod.rs

pub mod tbs;
