pub mod clock;
pub mod delivery;
pub mod rate_gate;
