pub mod events;
pub mod info;
pub mod messages;
pub mod player;
pub mod routeplanner;
pub mod session;
pub mod stats;
pub mod tracks;

pub use events::*;
pub use info::*;
pub use messages::*;
pub use player::*;
pub use routeplanner::*;
pub use session::*;
pub use stats::*;
pub use tracks::*;
