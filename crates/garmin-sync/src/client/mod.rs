pub mod connect;
pub mod epo;

pub use connect::{ConnectClient, Session};
pub use epo::{repack, write_epo, EpoClient};
