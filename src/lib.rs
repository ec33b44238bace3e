pub mod config;
pub mod input;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod session;

#[cfg(test)]
mod testing;
