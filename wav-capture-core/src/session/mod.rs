pub mod pause_gate;
pub mod recorder;
