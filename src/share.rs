use crate::{QueryErr, SocketConf};
use std::net::{Ipv6Addr, SocketAddr, UdpSocket};

/// Bind a UDP socket able to reach `remote`, with the configured timeouts.
pub fn create_udp_socket(socket_conf: &SocketConf, remote: &SocketAddr) -> Result<UdpSocket, QueryErr> {
    let socket = match remote {
        SocketAddr::V4(_) => UdpSocket::bind((socket_conf.rep_udp_ipv4, socket_conf.rep_udp_port))?,
        SocketAddr::V6(_) => UdpSocket::bind((Ipv6Addr::UNSPECIFIED, socket_conf.rep_udp_port))?,
    };

    socket.set_read_timeout(Some(socket_conf.timeout))?;
    socket.set_write_timeout(Some(socket_conf.timeout))?;

    Ok(socket)
}

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn bufs_to_latin1_str(bufs: &[u8]) -> String {
    bufs.iter().map(|&b| b as char).collect()
}

/// Find every start index of `needle` in `haystack`.
pub fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return vec![];
    }

    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(idx, _)| idx)
        .collect()
}
