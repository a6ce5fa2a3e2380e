//! Node addresses.
//!
//! A [`ServerAddress`] identifies one node of the cluster. TCP addresses carry a
//! host and a port; Unix-domain socket addresses carry only the socket path and
//! have no port.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{Snafu, ensure};

/// Port used when an address string omits one.
pub const DEFAULT_PORT: u16 = 27017;

/// Error returned when an address string cannot be parsed.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum AddressParseError {
    /// The input is not a valid address.
    #[snafu(display("invalid server address '{address}': {message}"))]
    Invalid {
        /// The rejected input.
        address: String,
        /// Why it was rejected.
        message: String,
    },
}

/// Address of a single cluster node.
///
/// Hosts are normalized to lowercase so that `Node1:27017` and `node1:27017`
/// refer to the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerAddress {
    host: String,
    port: Option<u16>,
}

impl ServerAddress {
    /// Creates a TCP address.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into().to_lowercase(), port: Some(port) }
    }

    /// Creates a Unix-domain socket address.
    #[must_use]
    pub fn unix(path: impl Into<String>) -> Self {
        Self { host: path.into(), port: None }
    }

    /// Returns the host name, IP literal or socket path.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, or `None` for Unix-domain socket addresses.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns whether this is a Unix-domain socket address.
    #[must_use]
    pub fn is_unix(&self) -> bool {
        self.port.is_none()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) if self.host.contains(':') => write!(f, "[{}]:{port}", self.host),
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

impl FromStr for ServerAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        ensure!(
            !input.is_empty(),
            InvalidSnafu { address: s, message: "address cannot be empty" }
        );

        if input.ends_with(".sock") {
            return Ok(Self::unix(input));
        }

        // Bracketed IPv6 literal, with or without a port.
        if let Some(rest) = input.strip_prefix('[') {
            let Some((host, tail)) = rest.split_once(']') else {
                return InvalidSnafu { address: s, message: "unterminated IPv6 literal" }
                    .fail();
            };
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(s, port)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => {
                    return InvalidSnafu {
                        address: s,
                        message: "unexpected characters after IPv6 literal",
                    }
                    .fail();
                },
            };
            return Ok(Self::tcp(host, port));
        }

        match input.rsplit_once(':') {
            Some((host, port)) => {
                ensure!(!host.is_empty(), InvalidSnafu { address: s, message: "missing host" });
                Ok(Self::tcp(host, parse_port(s, port)?))
            },
            None => Ok(Self::tcp(input, DEFAULT_PORT)),
        }
    }
}

fn parse_port(address: &str, port: &str) -> Result<u16, AddressParseError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => {
            InvalidSnafu { address, message: format!("invalid port '{port}'") }.fail()
        },
        Ok(port) => Ok(port),
    }
}

impl Serialize for ServerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServerAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
