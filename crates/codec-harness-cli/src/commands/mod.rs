pub mod encode;
pub mod plugins;
