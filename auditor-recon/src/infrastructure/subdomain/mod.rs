//! Subdomain enumerators

mod command;
mod crtsh;
mod dns;

pub use command::CommandSource;
pub use crtsh::CrtShSource;
pub use dns::DnsWordlistSource;
