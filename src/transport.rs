use crate::{share::create_udp_socket, Conf, QueryErr};
use log::debug;
use std::{
    io::ErrorKind,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    time::Instant,
};

/// Every request starts with these two bytes. Responses do not carry them.
pub const MAGIC: [u8; 2] = [0xFE, 0xFD];
/// Packet type of a handshake.
pub const TYPE_HANDSHAKE: u8 = 0x09;
/// Packet type of a basic or full stat.
pub const TYPE_STAT: u8 = 0x00;
/// Largest datagram the server sends back.
pub const MAX_PACKET_SIZE: usize = 2048;
/// Servers only echo the low nibble of every session id byte.
pub const SESSION_ID_MASK: i32 = 0x0F0F0F0F;

const REQUEST_HEADER_LEN: usize = 7;
const RESPONSE_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_type: u8,
    pub session_id: i32,
}

impl PacketHeader {
    pub fn new(packet_type: u8, session_id: i32) -> Self {
        Self {
            packet_type,
            session_id,
        }
    }

    /// Request header [layout](https://wiki.vg/Query#Request):
    ///
    /// Magic: 0xFE, 0xFD
    /// Type: 0x09 - for handshake, 0x00 - for status request
    /// Session ID: big-endian i32
    pub fn encode_request(&self) -> [u8; REQUEST_HEADER_LEN] {
        let id = self.session_id.to_be_bytes();

        [MAGIC[0], MAGIC[1], self.packet_type, id[0], id[1], id[2], id[3]]
    }

    pub fn decode_request(bufs: &[u8]) -> Result<Self, QueryErr> {
        if bufs.len() < REQUEST_HEADER_LEN {
            return Err(QueryErr::MalformedPacket(bufs.len()));
        }

        if bufs[..2] != MAGIC {
            return Err(QueryErr::DecodeErr(format!(
                "Request packet invalid, expected start with 0xFE 0xFD, but got: {:?}",
                &bufs[..2]
            )));
        }

        Ok(Self::new(bufs[2], read_i32_be(&bufs[3..7])))
    }

    /// Split a response into its header and payload.
    pub fn decode_response(bufs: &[u8]) -> Result<(Self, &[u8]), QueryErr> {
        if bufs.len() < RESPONSE_HEADER_LEN {
            return Err(QueryErr::MalformedPacket(bufs.len()));
        }

        Ok((
            Self::new(bufs[0], read_i32_be(&bufs[1..5])),
            &bufs[RESPONSE_HEADER_LEN..],
        ))
    }

    /// Whether `self`, as echoed by a server, answers a request sent with `session_id`.
    pub fn answers(&self, session_id: i32) -> bool {
        self.session_id & SESSION_ID_MASK == session_id & SESSION_ID_MASK
    }
}

fn read_i32_be(bufs: &[u8]) -> i32 {
    i32::from_be_bytes([bufs[0], bufs[1], bufs[2], bufs[3]])
}

/// A response with its header parsed off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

/// Datagram exchange with one remote endpoint.
///
/// Implementations never retry: every failure goes back to the caller.
pub trait Transport {
    /// Frame `payload` behind a request header and send it.
    fn send(&mut self, packet_type: u8, session_id: i32, payload: &[u8]) -> Result<(), QueryErr>;

    /// Block for one response until `deadline`, then fail with
    /// [QueryErr::Timeout].
    fn receive(&mut self, deadline: Instant) -> Result<Packet, QueryErr>;
}

/// [Transport] over a UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// Resolve the configured host and bind a local socket for it.
    ///
    /// IPv4 addresses are preferred when the host resolves to both families.
    pub fn connect(conf: &Conf) -> Result<Self, QueryErr> {
        let addrs = match conf.to_socket_addrs() {
            Ok(addrs) => addrs.collect::<Vec<_>>(),
            Err(err) => {
                debug!("Resolving {} failed: {}", conf, err);
                return Err(QueryErr::UnreachableHost(conf.to_string()));
            }
        };
        let remote = match addrs.iter().find(|addr| addr.is_ipv4()).or(addrs.first()) {
            Some(addr) => *addr,
            None => return Err(QueryErr::UnreachableHost(conf.to_string())),
        };
        let socket = create_udp_socket(&conf.socket_conf, &remote)?;

        debug!("Query socket {} bound for {}", socket.local_addr()?, remote);

        Ok(Self { socket, remote })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Result<SocketAddr, QueryErr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, packet_type: u8, session_id: i32, payload: &[u8]) -> Result<(), QueryErr> {
        let packet = [
            PacketHeader::new(packet_type, session_id)
                .encode_request()
                .as_slice(),
            payload,
        ]
        .concat();

        debug!(
            "Sending type {:#04x} session {} ({} bytes) to {}",
            packet_type,
            session_id,
            packet.len(),
            self.remote
        );

        match self.socket.send_to(&packet, self.remote) {
            Ok(_) => Ok(()),
            Err(err) => match err.kind() {
                ErrorKind::HostUnreachable
                | ErrorKind::NetworkUnreachable
                | ErrorKind::AddrNotAvailable => {
                    debug!("Sending to {} failed: {}", self.remote, err);
                    Err(QueryErr::UnreachableHost(self.remote.to_string()))
                }
                _ => Err(QueryErr::Transport(err)),
            },
        }
    }

    fn receive(&mut self, deadline: Instant) -> Result<Packet, QueryErr> {
        let mut bufs = [0u8; MAX_PACKET_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());

            if remaining.is_zero() {
                return Err(QueryErr::Timeout);
            }

            self.socket.set_read_timeout(Some(remaining))?;

            let (len, src_addr) = match self.socket.recv_from(&mut bufs) {
                Ok(received) => received,
                Err(err) => match err.kind() {
                    ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                        return Err(QueryErr::Timeout);
                    }
                    // ICMP port unreachable surfaces here on some platforms.
                    // Nothing will answer, so keep waiting out the timeout.
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused => {
                        debug!("{} refused the datagram: {}", self.remote, err);
                        continue;
                    }
                    _ => return Err(QueryErr::Transport(err)),
                },
            };

            if src_addr != self.remote {
                debug!("Dropping {} bytes from unexpected peer {}", len, src_addr);
                continue;
            }

            let (header, payload) = PacketHeader::decode_response(&bufs[..len])?;

            debug!(
                "Received type {:#04x} session {} ({} bytes) from {}",
                header.packet_type, header.session_id, len, src_addr
            );

            return Ok(Packet {
                header,
                payload: payload.to_vec(),
            });
        }
    }
}
