//! Main-loop runtime.
//!
//! [`LoopController`] owns two loops running on their own threads: the event
//! loop polls the context and feeds the event dispatcher, the render loop draws
//! and presents frames. Both can be paused at a safe point, which lets the
//! context be destroyed and recreated underneath them (`restart`).
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized --init--> Ready --start--> Running --quit--> Stopped --close--> Uninitialized
//!                                  Running --pause--> Paused --continue--> Running
//!                                  Running --restart--> Running
//! ```

mod controller;
mod error;
mod gate;
mod render_loop;
mod signals;

pub use controller::{LoopController, LoopHandle};
pub use error::{CloseOutcome, InitError, NotReady};
pub use render_loop::RenderLoop;
pub use signals::{
    INTERRUPT_EXIT_CODE, Signal, SignalAction, SignalPolicy, TERMINATE_EXIT_CODE, is_registered,
};
