//! Client for the Minecraft [Query](https://wiki.vg/Query) protocol.
//!
//! The server must run with `enable-query=true`. A [Session] performs the
//! handshake, keeps the challenge token and decodes basic and full stats:
//!
//! ```no_run
//! use mcq::{Conf, QueryErr};
//!
//! fn main() -> Result<(), QueryErr> {
//!     let mut session = Conf::create_with_port("localhost", 25565).connect()?;
//!
//!     println!("{}", session.basic_stat()?);
//!     println!("{}", session.full_stat()?);
//!     Ok(())
//! }
//! ```

mod conf;
mod error;
mod query;
mod session;
mod share;
pub mod transport;

pub use conf::{Conf, SocketConf, DEFAULT_HOST, DEFAULT_PORT};
pub use error::QueryErr;
pub use query::{decode_basic_status, decode_full_status, split_plugins, BasicStatus, FullStatus};
pub use session::Session;
pub use transport::{Packet, PacketHeader, Transport, UdpTransport};
