use crate::{
    query::{BasicStatus, FullStatus},
    session::Session,
    transport::UdpTransport,
    QueryErr,
};
use std::{
    net::{Ipv4Addr, SocketAddr, ToSocketAddrs},
    time::Duration,
};

/// Default query port, shared with the game port unless `query.port` is set
/// in `server.properties`.
pub const DEFAULT_PORT: u16 = 25565;
/// Default host.
pub const DEFAULT_HOST: &str = "localhost";

/// Main struct used for configuring the connection.
#[derive(Debug, Clone)]
pub struct Conf {
    /// Server IP address or a domain name.
    pub host: String,
    /// Server query port.
    pub port: u16,
    /// See [SocketConf].
    pub socket_conf: SocketConf,
}

/// Socket and retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConf {
    /// Upper bound for every blocking receive. Default 10 seconds.
    pub timeout: Duration,
    /// Handshake attempts before giving up with [QueryErr::HandshakeFailed]. Default 3.
    pub max_retries: u32,
    /// Re-handshakes a stat request may perform after a lost or truncated
    /// response. Default 1.
    pub stat_retries: u32,
    /// Local address the UDP socket binds to.
    /// The default value is [Ipv4Addr::UNSPECIFIED].
    pub rep_udp_ipv4: Ipv4Addr,
    /// Local port the UDP socket binds to, 0 for an ephemeral port.
    pub rep_udp_port: u16,
}

impl Default for SocketConf {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            stat_retries: 1,
            rep_udp_ipv4: Ipv4Addr::UNSPECIFIED,
            rep_udp_port: 0,
        }
    }
}

impl SocketConf {
    pub(crate) fn validate(&self) -> Result<(), QueryErr> {
        if self.timeout.is_zero() {
            return Err(QueryErr::ConfErr("timeout must be greater than zero".into()));
        }

        if self.max_retries == 0 {
            return Err(QueryErr::ConfErr(
                "max_retries must allow at least one handshake attempt".into(),
            ));
        }

        Ok(())
    }
}

impl ToSocketAddrs for Conf {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        (&*self.host, self.port).to_socket_addrs()
    }
}

impl Default for Conf {
    fn default() -> Self {
        Self::create(DEFAULT_HOST)
    }
}

impl Conf {
    /// Create a connection configuration using the default port(25565).
    ///
    /// # Examples
    ///
    /// ```
    /// # use mcq::{Conf, SocketConf};
    /// #
    /// let conf = Conf::create("www.example.com");
    /// #
    /// # assert_eq!(conf.host, "www.example.com");
    /// # assert_eq!(conf.port, 25565);
    /// # assert_eq!(conf.socket_conf, SocketConf::default());
    /// ```
    pub fn create(host: &str) -> Self {
        Self::create_with_port(host, DEFAULT_PORT)
    }

    /// Create a connection configuration using the specified port.
    ///
    /// # Example
    ///
    /// ```
    /// # use mcq::Conf;
    /// #
    /// let conf = Conf::create_with_port("www.example.com", 25575);
    /// #
    /// # assert_eq!(conf.port, 25575);
    /// ```
    pub fn create_with_port(host: &str, port: u16) -> Self {
        Self {
            host: host.trim().into(),
            port,
            socket_conf: SocketConf::default(),
        }
    }

    /// Create a connection configuration from a `host:port` string.
    ///
    /// If the port cannot be converted to [u16], a [QueryErr::ConfErr] is returned.
    ///
    /// # Example
    ///
    /// ```
    /// # use mcq::{Conf, QueryErr};
    /// #
    /// # fn main() -> Result<(), QueryErr> {
    ///     let conf = Conf::create_from_str("www.example.com:25565")?;
    /// #
    /// #   assert_eq!(conf.host, "www.example.com");
    /// #   assert_eq!(conf.port, 25565);
    /// #
    /// #   assert!(Conf::create_from_str("25565").is_err());
    /// #   assert!(Conf::create_from_str("www.example.com:-1").is_err());
    /// #   Ok(())
    /// # }
    /// ```
    pub fn create_from_str(addr: &str) -> Result<Self, QueryErr> {
        let addr_split = addr.split(':').map(|x| x.trim()).collect::<Vec<_>>();

        if addr_split.len() != 2 || addr_split[0].is_empty() {
            return Err(QueryErr::ConfErr(format!(
                "Invalid socket address syntax: {}",
                addr
            )));
        }

        match addr_split[1].parse::<u16>() {
            Ok(port) => Ok(Self::create_with_port(addr_split[0], port)),
            Err(_) => Err(QueryErr::ConfErr(format!("Invalid port: {}", addr_split[1]))),
        }
    }

    /// Replace the receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.socket_conf.timeout = timeout;
        self
    }

    /// Replace the handshake attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.socket_conf.max_retries = max_retries;
        self
    }

    /// Replace the stat re-handshake budget.
    pub fn with_stat_retries(mut self, stat_retries: u32) -> Self {
        self.socket_conf.stat_retries = stat_retries;
        self
    }

    /// Open a query [Session] and perform the initial handshake.
    ///
    /// Keep the session around when polling: it caches the challenge token and
    /// only re-handshakes when a request is lost or rejected.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcq::{Conf, QueryErr};
    ///
    /// fn main() -> Result<(), QueryErr> {
    ///     let mut session = Conf::create("www.example.com").connect()?;
    ///     let full = session.full_stat()?;
    ///
    ///     println!("{} players online", full.num_players);
    ///     Ok(())
    /// }
    /// ```
    pub fn connect(&self) -> Result<Session<UdpTransport>, QueryErr> {
        Session::connect(self)
    }

    /// Get **basic** info using a one-shot session.
    ///
    /// The server needs `enable-query=true` in its `server.properties`.
    pub fn query(&self) -> Result<BasicStatus, QueryErr> {
        self.connect()?.basic_stat()
    }

    /// Get **full** info using a one-shot session.
    pub fn query_full(&self) -> Result<FullStatus, QueryErr> {
        self.connect()?.full_stat()
    }
}

impl std::fmt::Display for Conf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
