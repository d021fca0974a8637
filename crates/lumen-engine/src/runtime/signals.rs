//! Process signal routing.
//!
//! SIGINT and SIGTERM are forwarded to the one registered controller. A
//! handled signal closes the window, destroys the context and exits the
//! process with a fixed code.

use std::fmt;
use std::sync::{Arc, Mutex, Once, Weak};

use log::warn;
use serde::{Deserialize, Serialize};

use super::controller::ControllerInner;
use super::InitError;
use crate::sync::lock;

pub const INTERRUPT_EXIT_CODE: i32 = 5;
pub const TERMINATE_EXIT_CODE: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt => INTERRUPT_EXIT_CODE,
            Self::Terminate => TERMINATE_EXIT_CODE,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Ignore,
    Exit(i32),
}

/// Which signals end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalPolicy {
    pub handle_interrupt: bool,
    pub handle_terminate: bool,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            handle_interrupt: true,
            handle_terminate: true,
        }
    }
}

impl SignalPolicy {
    pub fn action_for(&self, signal: Signal) -> SignalAction {
        let handled = match signal {
            Signal::Interrupt => self.handle_interrupt,
            Signal::Terminate => self.handle_terminate,
        };
        if handled {
            SignalAction::Exit(signal.exit_code())
        } else {
            SignalAction::Ignore
        }
    }
}

static REGISTERED: Mutex<Option<Weak<ControllerInner>>> = Mutex::new(None);

pub(crate) fn register(inner: &Arc<ControllerInner>) -> Result<(), InitError> {
    let mut slot = lock(&REGISTERED);
    if slot.as_ref().is_some_and(|w| w.strong_count() > 0) {
        return Err(InitError::AlreadyRegistered);
    }
    *slot = Some(Arc::downgrade(inner));
    Ok(())
}

pub(crate) fn unregister(inner: &Arc<ControllerInner>) {
    let mut slot = lock(&REGISTERED);
    if slot.as_ref().is_some_and(|w| std::ptr::eq(w.as_ptr(), Arc::as_ptr(inner))) {
        *slot = None;
    }
}

/// Whether a live controller currently owns the signal slot.
pub fn is_registered() -> bool {
    lock(&REGISTERED).as_ref().is_some_and(|w| w.strong_count() > 0)
}

/// Installs the process handlers once; later calls do nothing.
pub(crate) fn install_handlers() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(platform::install);
}

/// Routes `signal` to the registered controller.
///
/// Returns the action taken. `Exit` terminates the process unless
/// `exit` is false, which tests use to observe the teardown.
pub(crate) fn deliver(signal: Signal, exit: bool) -> Option<SignalAction> {
    let inner = lock(&REGISTERED).as_ref().and_then(Weak::upgrade);
    let Some(inner) = inner else {
        warn!("received {signal} without a registered loop controller");
        return None;
    };

    let action = inner.config.signals.action_for(signal);
    match action {
        SignalAction::Ignore => warn!("received {signal}, ignoring it"),
        SignalAction::Exit(code) => {
            warn!("received {signal}, closing the window and exiting with code {code}");
            inner.close_window(true);
            inner.context.destroy_context();
            if exit {
                std::process::exit(code);
            }
        }
    }
    Some(action)
}

#[cfg(unix)]
mod platform {
    use log::{debug, error};
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    use super::{Signal, deliver};

    pub(super) fn install() {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                error!("failed to install signal handlers: {e}");
                return;
            }
        };
        let spawned = std::thread::Builder::new()
            .name("lumen-signals".into())
            .spawn(move || {
                for raw in signals.forever() {
                    let signal = match raw {
                        SIGINT => Signal::Interrupt,
                        SIGTERM => Signal::Terminate,
                        _ => continue,
                    };
                    deliver(signal, true);
                }
            });
        match spawned {
            Ok(_) => debug!("signal handlers installed"),
            Err(e) => error!("failed to spawn the signal thread: {e}"),
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn install() {
        log::debug!("process signal handling is only wired up on unix");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_decides_per_signal() {
        let policy = SignalPolicy {
            handle_interrupt: true,
            handle_terminate: false,
        };
        assert_eq!(policy.action_for(Signal::Interrupt), SignalAction::Exit(5));
        assert_eq!(policy.action_for(Signal::Terminate), SignalAction::Ignore);
        assert_eq!(
            SignalPolicy::default().action_for(Signal::Terminate),
            SignalAction::Exit(TERMINATE_EXIT_CODE)
        );
    }
}
