//! Wire protocol spoken with the device service.
//!
//! - [`socketio`]: Engine.IO v4 / Socket.IO v5 text packet codec
//! - [`events`]: the typed message schema (inbound events, outbound commands)
//!   and the name-keyed decoder table

pub mod events;
pub mod socketio;

pub use events::{
    decode_event, DetectorSettings, DeviceError, DoorStatusReport, InboundEvent, OutboundCommand,
    Outcome, VideoFeed, CAMERA_ERROR,
};
pub use socketio::{EnginePacket, Handshake, SocketPacket, SocketPacketKind};
