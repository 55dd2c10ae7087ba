pub mod logs;
pub mod pages;
