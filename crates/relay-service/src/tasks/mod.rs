//! Background tasks for the relay service.

pub mod sweeper;

pub use sweeper::run_signal_sweeper;
