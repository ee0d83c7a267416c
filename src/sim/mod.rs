pub mod event;
pub mod feedback;
pub mod level;
pub mod sequence;
pub mod step;
pub mod world;
