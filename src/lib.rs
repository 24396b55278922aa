pub mod events;
pub mod friends;
pub mod geo;
pub mod identity;
pub mod logging;
pub mod routes;
pub mod server;
pub mod sharing;
pub mod sos;
pub mod storage;
pub mod sync;
