mod counter_store;
mod database;
mod redis;
mod state_builder;

pub use counter_store::{CounterStore, build_counter_store};
pub use state_builder::build_app_state;
