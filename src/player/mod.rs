pub mod handle;
pub mod manager;
pub mod state;

pub use handle::PlayerHandle;
pub use manager::{PlayerManager, PlayerMap};
pub use state::{MAX_VOLUME, Player, PlayerMode, PlayerSnapshot, SkipOutcome};
