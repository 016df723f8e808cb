pub mod backend;
pub mod webdriver;
