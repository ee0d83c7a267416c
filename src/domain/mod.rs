pub mod blocked;
pub mod board;
pub mod entity;
pub mod geometry;
pub mod occupancy;
pub mod rules;
pub mod tile;
