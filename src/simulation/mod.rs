pub mod controller;
pub mod engine;
pub mod grid;
pub mod palette;
pub mod scheduler;

pub use controller::{Command, SimulationController};
pub use grid::ColorIndex;
pub use palette::Rgb;
pub use scheduler::SystemClock;
