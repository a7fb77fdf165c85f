//! Streams location estimates to a UDP host as JSON, one datagram per
//! estimate.

use crate::location::LocationEstimate;
use crate::observer::LocationObserver;
use log::warn;
use std::{
    borrow::Cow,
    fmt,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};

/// Returned when streaming can't be set up or a datagram can't be built.
#[derive(Debug)]
pub enum StreamError {
    /// Returned when the socket can't be bound, connected or written.
    IoError(std::io::Error),

    /// Returned when an estimate can't be serialized.
    JsonError(serde_json::Error),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            StreamError::IoError(error) => Cow::from(format!("io error: {}", error)),
            StreamError::JsonError(error) => Cow::from(format!("json error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for StreamError {}

/// A [`LocationObserver`] that sends each estimate to a fixed UDP target.
#[derive(Debug)]
pub struct UdpLocationStreamer {
    socket: UdpSocket,
    target: SocketAddr,
    sent: u64,
}

impl UdpLocationStreamer {
    /// Binds an ephemeral local port and aims it at `target`.
    pub fn connect(target: SocketAddr) -> Result<Self, StreamError> {
        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).map_err(StreamError::IoError)?;
        socket.connect(target).map_err(StreamError::IoError)?;
        Ok(Self {
            socket,
            target,
            sent: 0,
        })
    }

    /// Where datagrams are going.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Datagrams sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Serializes and sends one estimate.
    pub fn send(&mut self, location: &LocationEstimate) -> Result<(), StreamError> {
        let payload = serde_json::to_vec(location).map_err(StreamError::JsonError)?;
        self.socket.send(&payload).map_err(StreamError::IoError)?;
        self.sent += 1;
        Ok(())
    }
}

impl LocationObserver for UdpLocationStreamer {
    fn on_location_update(&mut self, location: &LocationEstimate) {
        if let Err(e) = self.send(location) {
            warn!("udp streamer : dropped estimate for {} : {}", self.target, e);
        }
    }
}
