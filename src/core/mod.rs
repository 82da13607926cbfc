pub mod state_machine;
pub mod reconnect;
pub mod poll_loop;
