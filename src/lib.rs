pub mod logger;
pub mod render;
pub mod simulate;

pub use render::{render_board, render_session, RenderOptions};
pub use simulate::{SimulationConfig, SimulationReport};
