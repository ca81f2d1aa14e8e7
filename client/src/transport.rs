// Polkadot app acceptance tests and supporting software libraries
//
// Copyright (C) 2024 The polkadot-app-harness developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use core::fmt;

use async_trait::async_trait;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::apdu::{ApduAnswer, ApduCommand};

#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    ShortAnswer(usize),
    /// The device went away while a command was outstanding.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "transport i/o error: {}", e),
            TransportError::ShortAnswer(len) => write!(f, "short answer ({} bytes)", len),
            TransportError::Closed => write!(f, "device link closed"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

/// Abstraction over the link carrying APDUs to the device app.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError>;
}

/// Length-prefixed APDU exchange over a TCP socket: 4-byte big-endian
/// length, then the command; answers come back the same way with the
/// status word in the last two bytes.
pub struct TcpTransport {
    connection: Mutex<TcpStream>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        TcpTransport {
            connection: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let mut stream = self.connection.lock().await;

        let encoded = command.encode();
        log::trace!("> {:02X?}", encoded);

        let mut req = Vec::with_capacity(encoded.len() + 4);
        req.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        req.extend_from_slice(&encoded);
        stream.write_all(&req).await?;

        let mut len = [0u8; 4];
        stream.read_exact(&mut len).await?;
        let len = u32::from_be_bytes(len) as usize;

        let mut raw = vec![0u8; len];
        stream.read_exact(&mut raw).await?;
        log::trace!("< {:02X?}", raw);

        ApduAnswer::from_bytes(&raw).map_err(|e| TransportError::ShortAnswer(e.0))
    }
}
