pub mod controller;
pub mod events;
pub mod state;
mod worker;

pub use controller::PlaybackController;
pub use events::{dispatch, present, PlaybackEvent, Presenter};
pub use state::{PlaybackState, PlaybackStatus};
