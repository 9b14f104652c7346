pub mod app;
pub mod render;
pub mod stack;
pub mod tail;
