use std::io;

use crossterm::terminal;
use crossterm::tty::IsTty;

/// Put the host terminal into raw mode so keystrokes arrive immediately,
/// unbuffered and unechoed.
///
/// Does nothing when standard input is redirected from a file or pipe; the
/// machine then reads plain bytes and no terminal state needs restoring.
pub fn enable_raw_mode() {
    if !io::stdin().is_tty() {
        return;
    }
    debug_assert!(
        !terminal::is_raw_mode_enabled().is_ok_and(|is| is),
        "terminal should not be in raw mode at this point",
    );
    terminal::enable_raw_mode().expect("failed to enable raw terminal");
}

/// Restore the terminal. Safe to call from any exit path, raw or not.
pub fn disable_raw_mode() {
    if !terminal::is_raw_mode_enabled().is_ok_and(|is| is) {
        return;
    }
    terminal::disable_raw_mode().expect("failed to disable raw terminal");
}

/// Restore the terminal and exit after a keyboard interrupt.
pub fn exit_on_interrupt() -> ! {
    disable_raw_mode();
    println!();
    std::process::exit(130);
}
