pub mod conversation;
pub mod render;
