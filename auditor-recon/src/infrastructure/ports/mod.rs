//! Port probing strategies

mod connect;
mod nmap;

pub use connect::TcpConnectProber;
pub use nmap::NmapProber;
