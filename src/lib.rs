pub mod app;
pub mod cli;
pub mod demo;
pub mod operator;
pub mod recipients;
pub mod session;
pub mod shutdown;
