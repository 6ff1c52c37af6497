pub mod daily_state;
pub mod risk_gate;
pub mod risk_manager;
pub mod settings;
pub mod store;
pub mod suspensions;
