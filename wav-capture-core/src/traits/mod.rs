pub mod capture_provider;
pub mod recorder_listener;
pub mod timer_listener;
