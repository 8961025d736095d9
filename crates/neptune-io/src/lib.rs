mod bus;
mod console;
mod device;
mod keyboard;
mod timer;

pub use bus::IoBus;
pub use console::ConsoleOut;
pub use device::IoDevice;
pub use keyboard::{keyevent_to_ascii, KeyEvent, Keyboard, KeyboardHandle};
pub use timer::Timer;
