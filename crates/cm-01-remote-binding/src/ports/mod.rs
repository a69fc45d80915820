//! Ports layer: the seams between the binding service and its host.

mod outbound;

pub use outbound::{
    ConnectCallback, ConnectionRegistry, DeathRecipient, DeathWatch, TargetGateway,
};
