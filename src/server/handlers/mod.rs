pub mod contacts;
pub mod events;
pub mod friends;
pub mod health;
pub mod locations;
pub mod profiles;
pub mod routes;
pub mod sos;
