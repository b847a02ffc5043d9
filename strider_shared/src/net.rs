//! Networking primitives.
//!
//! Goals:
//! - Provide a simple reliable (TCP) and unreliable (UDP) channel.
//! - Provide the handshake, spawn and field replication messages used by
//!   client/server.
//! - Keep serialization explicit and versionable.
//!
//! Replication is one way: the owning client asks the server to set a field,
//! and the server rebroadcasts it to every client. Nothing is acknowledged.

use anyhow::Context;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    sync::atomic::{AtomicU32, Ordering},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
    time,
};

use crate::{
    math::Vec3,
    replication::{CharacterId, FieldUpdate, ReplicationTransport},
};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    pub fn new_unique() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// High-level message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NetMsg {
    // ─── Connection handshake ───
    Hello {
        protocol: u32,
    },
    /// Client announces its UDP port to the server.
    UdpHello {
        client_udp_port: u16,
    },
    /// Server assigns the client its id and the character it owns.
    Welcome {
        client_id: ClientId,
        character: CharacterId,
    },
    /// Client has spawned everything it was told about and wants replication.
    ClientReady {
        client_id: ClientId,
    },

    // ─── Characters ───
    /// Server announces a character; `owner` decides who is authoritative.
    CharacterSpawn(CharacterSpawn),
    /// Server removes a character.
    CharacterDespawn {
        character: CharacterId,
    },

    // ─── Replication ───
    /// Client -> server: set a field on a character the client owns.
    SetField {
        client_id: ClientId,
        update: FieldUpdate,
    },
    /// Server -> clients: field values changed since the previous tick.
    Replicate(ReplicationBatch),

    // ─── Disconnect ───
    Disconnect {
        reason: String,
    },
}

/// Character spawn packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterSpawn {
    pub character: CharacterId,
    pub owner: ClientId,
    pub position: Vec3,
}

/// Field updates for one server tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicationBatch {
    pub tick: u32,
    pub updates: Vec<FieldUpdate>,
}

/// Reliable connection over TCP with length-prefixed frames.
#[derive(Debug)]
pub struct ReliableConn {
    stream: TcpStream,
}

impl ReliableConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize msg")?;
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);
        self.stream.write_all(&buf).await.context("tcp write")?;
        Ok(())
    }

    pub async fn recv(&mut self) -> anyhow::Result<NetMsg> {
        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .context("tcp read len")?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .context("tcp read payload")?;
        let msg = serde_json::from_slice(&payload).context("deserialize msg")?;
        Ok(msg)
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

/// Unreliable channel over UDP.
#[derive(Debug)]
pub struct UnreliableConn {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UnreliableConn {
    pub async fn connect(bind_addr: SocketAddr, peer: SocketAddr) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await.context("udp bind")?;
        socket.connect(peer).await.context("udp connect")?;
        Ok(Self { socket, peer })
    }

    pub async fn send(&self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize udp msg")?;
        self.socket.send(&payload).await.context("udp send")?;
        Ok(())
    }

    pub async fn recv(&self) -> anyhow::Result<NetMsg> {
        let mut buf = vec![0u8; 64 * 1024];
        let n = self.socket.recv(&mut buf).await.context("udp recv")?;
        let msg = serde_json::from_slice(&buf[..n]).context("deserialize udp msg")?;
        Ok(msg)
    }

    /// Receives a datagram within the given timeout.
    pub async fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Option<NetMsg>> {
        let mut buf = vec![0u8; 64 * 1024];
        match time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                let msg = serde_json::from_slice(&buf[..n]).context("deserialize udp msg")?;
                Ok(Some(msg))
            }
            Ok(Err(e)) => Err(e).context("udp recv")?,
            Err(_) => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// TCP server listener.
pub struct ReliableListener {
    listener: TcpListener,
}

impl ReliableListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(ReliableConn, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        Ok((ReliableConn::new(stream), addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Sends field-set requests for one client over its unreliable channel.
pub struct SetFieldSender<'a> {
    pub conn: &'a UnreliableConn,
    pub client_id: ClientId,
}

#[async_trait]
impl<'a> ReplicationTransport for SetFieldSender<'a> {
    async fn send_update(&self, update: FieldUpdate) -> anyhow::Result<()> {
        self.conn
            .send(&NetMsg::SetField {
                client_id: self.client_id,
                update,
            })
            .await
    }
}

/// Convenience codec helpers.
pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::FieldId;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn set_field_survives_the_codec() {
        let msg = NetMsg::SetField {
            client_id: ClientId(3),
            update: FieldUpdate {
                character: CharacterId(9),
                field: FieldId::ForwardAmount,
                value: 0.5,
            },
        };
        let back = decode_from_bytes(&encode_to_bytes(&msg).unwrap()).unwrap();
        assert_eq!(msg, back);
    }

    #[tokio::test]
    async fn set_field_sender_emits_datagram() -> anyhow::Result<()> {
        let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let relay = UdpSocket::bind(local).await?;
        let conn = UnreliableConn::connect(local, relay.local_addr()?).await?;

        let update = FieldUpdate {
            character: CharacterId(1),
            field: FieldId::ForwardAmount,
            value: 0.25,
        };
        let sender = SetFieldSender {
            conn: &conn,
            client_id: ClientId(42),
        };
        sender.send_update(update).await?;

        let mut buf = vec![0u8; 1024];
        let (n, _) = relay.recv_from(&mut buf).await?;
        assert_eq!(
            decode_from_bytes(&buf[..n])?,
            NetMsg::SetField {
                client_id: ClientId(42),
                update,
            }
        );
        Ok(())
    }
}
