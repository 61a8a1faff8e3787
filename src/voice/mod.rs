pub mod correlator;
pub mod gateway;

pub use correlator::VoiceCorrelator;
pub use gateway::{
    GatewayForwarder, GatewayPayload, VoiceOptions, VoiceServerUpdate, VoiceStateUpdate,
};
