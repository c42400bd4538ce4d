// src/models/mod.rs

pub mod assignment;
pub mod comment;
pub mod result;
pub mod survey;
pub mod user;
