//! Domain layer: saga records, the shared state graph, channel naming and the ports the engine
//! depends on.

pub mod channel;
pub mod graph;
pub mod ports;
pub mod saga;
