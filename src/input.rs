use std::cell::RefCell;
use std::io::{self, Read as _};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use crossterm::terminal;

use crate::term;

thread_local! {
    /// Must only be mutated within `with_input`.
    static INPUT: RefCell<Option<Input>> = const { RefCell::new(None) };
}

/// Interact with the static host input channel.
///
/// Spawns the reader thread if not already running.
fn with_input<F, R>(func: F) -> R
where
    F: FnOnce(&mut Input) -> R,
{
    INPUT.with(|input| {
        let mut input = input.borrow_mut();
        let input = input.get_or_insert_with(Input::new);
        func(input)
    })
}

/// Byte stream from the host terminal or a redirected pipe.
///
/// A dedicated thread owns standard input and forwards single bytes, so the
/// machine can check for a pending keystroke without blocking on the host.
struct Input {
    rx: Receiver<u8>,
}

impl Input {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buffer = [0u8; 1];
            while let Ok(1) = stdin.read(&mut buffer) {
                let byte = buffer[0];
                // Raw mode stops the terminal from raising an interrupt
                // signal, so Ctrl+C arrives as a byte. It is handled here,
                // off the machine's own thread, so a compute-bound program
                // is interrupted just the same. With redirected input ETX
                // is ordinary data.
                if byte == ETX && terminal::is_raw_mode_enabled().is_ok_and(|is| is) {
                    term::exit_on_interrupt();
                }
                if tx.send(byte).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }
}

/// ASCII end-of-text, delivered for Ctrl+C while the terminal is raw.
const ETX: u8 = 0x03;

/// Spawn the reader thread ahead of execution, so a keyboard interrupt is
/// seen even if the program never reads the keyboard.
pub fn init() {
    with_input(|_| ());
}

/// Non-blocking check for a pending byte. Consumes the byte if present.
pub fn poll() -> Option<u8> {
    with_input(|input| input.rx.try_recv().ok())
}

/// Blocks until one host byte is available. Returns 0 once input is exhausted.
pub fn read_byte() -> u8 {
    with_input(|input| input.rx.recv().unwrap_or(0))
}
