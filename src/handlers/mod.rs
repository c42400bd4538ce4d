// src/handlers/mod.rs

pub mod admin;
pub mod assignment;
pub mod auth;
pub mod comment;
pub mod profile;
pub mod result;
pub mod survey;
