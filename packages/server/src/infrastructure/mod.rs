//! Infrastructure layer: concrete implementations of the domain interfaces.

pub mod broadcast;
pub mod dto;
pub mod repository;
pub mod seed;
