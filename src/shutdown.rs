//! Process-wide interrupt handling.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Once};

static INSTALL: Once = Once::new();

/// Install the interrupt handler, wiring SIGINT and SIGTERM to `flag`.
///
/// Installation is process-global and happens at most once; later calls are
/// no-ops, so the flag passed by the first caller is the one interrupts
/// set. A second interrupt force-exits the process with status 0, covering
/// the case where the first one arrives while no loop is polling the flag
/// (e.g. a blocking accept).
pub fn install_interrupt_handler(flag: &Arc<AtomicBool>) {
    let flag = Arc::clone(flag);
    INSTALL.call_once(move || {
        // The conditional shutdown must be registered first: handlers run
        // in registration order, and it only exits when the flag is already
        // set. First interrupt arms the flag, second one terminates.
        let _ = signal_hook::flag::register_conditional_shutdown(
            signal_hook::consts::SIGINT,
            0,
            Arc::clone(&flag),
        );
        let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag));
        let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, flag);
    });
}
