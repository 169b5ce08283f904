mod double_press;

pub use double_press::{BOUNCE_WINDOW, DOUBLE_PRESS_WINDOW, DoublePressDetector};
