// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Packet framing for the remote stub protocol.
//!
//! A packet is `$<payload>#<checksum>` where the checksum is the sum of the
//! payload bytes modulo 256, written as two lowercase hex digits. Anything the
//! stub sends outside a packet (acknowledgements, console noise) is skipped
//! by [`PacketTransport::read_packet`], except a `-` that rejects our request.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{trace, warn};

use crate::error::ProtocolError;

/// Whether received packets are acknowledged with `+` / `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    #[default]
    Ack,
    NoAck,
}

pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Frame a payload.
pub fn pack(payload: &str) -> String {
    format!("${}#{:02x}", payload, checksum(payload.as_bytes()))
}

/// Check and strip the framing of a complete packet.
pub fn unpack(packet: &str) -> Result<String, ProtocolError> {
    let body = packet
        .strip_prefix('$')
        .ok_or_else(|| ProtocolError::MalformedPacket(format!("missing '$' in '{}'", packet)))?;
    let hash = body
        .rfind('#')
        .ok_or_else(|| ProtocolError::MalformedPacket(format!("missing '#' in '{}'", packet)))?;
    let (payload, sum) = (&body[..hash], &body[hash + 1..]);
    if sum.len() != 2 {
        return Err(ProtocolError::MalformedPacket(format!(
            "checksum must be two hex digits in '{}'",
            packet
        )));
    }
    let expected = u8::from_str_radix(sum, 16)
        .map_err(|_| ProtocolError::MalformedPacket(format!("bad checksum digits '{}'", sum)))?;
    let actual = checksum(payload.as_bytes());
    if expected != actual {
        return Err(ProtocolError::ChecksumMismatch {
            expected,
            actual,
            payload: payload.to_string(),
        });
    }
    Ok(payload.to_string())
}

/// One connection to a remote stub. Owns the stream; dropping the transport
/// closes it on every exit path.
pub struct PacketTransport<S: Read + Write> {
    reader: BufReader<S>,
    ack: AckMode,
}

impl PacketTransport<TcpStream> {
    /// Connects to a stub at `addr` (eg "127.0.0.1:1234"). With a timeout, a
    /// blocked read fails with [`ProtocolError::Timeout`] instead of hanging.
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Option<Duration>) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> PacketTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
            ack: AckMode::default(),
        }
    }

    pub fn with_ack_mode(mut self, ack: AckMode) -> Self {
        self.ack = ack;
        self
    }

    pub fn ack_mode(&self) -> AckMode {
        self.ack
    }

    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    fn next_byte(&mut self) -> Result<u8, ProtocolError> {
        let mut byte = [0u8; 1];
        match self.reader.read(&mut byte)? {
            0 => Err(ProtocolError::ConnectionClosed),
            _ => Ok(byte[0]),
        }
    }

    /// Write a framed packet.
    pub fn send(&mut self, payload: &str) -> Result<(), ProtocolError> {
        let packet = pack(payload);
        trace!("-> {}", packet);
        self.write_raw(packet.as_bytes())
    }

    /// Write bytes outside any packet (acknowledgements, the interrupt byte).
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let stream = self.reader.get_mut();
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    /// Read the next packet, discarding anything before its `$`. In ack mode
    /// a `-` from the stub means it rejected what we sent and no reply follows.
    pub fn read_packet(&mut self) -> Result<String, ProtocolError> {
        let mut skipped = 0usize;
        loop {
            match self.next_byte()? {
                b'$' => break,
                b'-' if self.ack == AckMode::Ack => {
                    warn!("stub rejected the last packet");
                    return Err(ProtocolError::PacketRejected);
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            trace!("skipped {} bytes before packet", skipped);
        }

        let mut raw = vec![b'$'];
        self.reader.read_until(b'#', &mut raw)?;
        if raw.last() != Some(&b'#') {
            return Err(ProtocolError::ConnectionClosed);
        }
        raw.push(self.next_byte()?);
        raw.push(self.next_byte()?);

        let packet = String::from_utf8(raw)
            .map_err(|e| ProtocolError::MalformedPacket(format!("non-UTF-8 packet: {}", e)))?;
        trace!("<- {}", packet);

        match unpack(&packet) {
            Ok(payload) => {
                if self.ack == AckMode::Ack {
                    self.write_raw(b"+")?;
                }
                Ok(payload)
            }
            Err(err) => {
                warn!("rejecting packet: {}", err);
                if self.ack == AckMode::Ack {
                    self.write_raw(b"-")?;
                }
                Err(err)
            }
        }
    }
}
