//! Server implementation.
//!
//! The server is the relay for character ownership and field replication:
//! - Accepts clients and gives each one the character it owns
//! - Announces every character to every client
//! - Accepts field-set requests only from a character's owner
//! - Broadcasts changed fields to ready clients once per tick
//!
//! Movement itself is simulated by the owning client; the server never
//! touches positions after spawn.
//!
//! Determinism notes:
//! - Keep the broadcast in a fixed timestep.
//! - Use stable ordering when iterating collections.

use anyhow::Context;
use strider_shared::{
    config::EngineConfig,
    math::Vec3,
    net::{
        CharacterSpawn, ClientId, NetMsg, ReliableConn, ReliableListener, ReplicationBatch,
        PROTOCOL_VERSION,
    },
    replication::{CharacterId, FieldId, FieldUpdate, ReplicatedFields},
};
use std::{
    collections::{BTreeMap, HashMap},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};
use tokio::{net::UdpSocket, sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

/// Distance between spawn points along `+X`.
const SPAWN_SPACING: f32 = 2.0;

/// Connected client state.
struct ClientSlot {
    reliable: ReliableConn,
    udp_peer: SocketAddr,
    /// Whether the client wants replication datagrams.
    ready: bool,
    character: CharacterId,
}

/// Server-side record of a character.
#[derive(Debug, Clone)]
pub struct ServerCharacter {
    pub owner: ClientId,
    pub spawn_position: Vec3,
    pub forward_amount: f32,
    dirty: ReplicatedFields,
}

impl ServerCharacter {
    fn field(&self, field: FieldId) -> f32 {
        match field {
            FieldId::ForwardAmount => self.forward_amount,
        }
    }

    fn set_field(&mut self, field: FieldId, value: f32) {
        let slot = match field {
            FieldId::ForwardAmount => &mut self.forward_amount,
        };
        if *slot != value {
            *slot = value;
            self.dirty |= field.flag();
        }
    }
}

/// Game server.
pub struct GameServer {
    pub cfg: EngineConfig,
    clients: HashMap<ClientId, ClientSlot>,
    characters: BTreeMap<CharacterId, ServerCharacter>,
    next_character: u32,

    tcp: ReliableListener,
    udp: UdpSocket,

    tick: u32,

    /// Channel for console commands from stdin.
    console_rx: Option<mpsc::Receiver<String>>,
}

impl GameServer {
    /// Binds server sockets for the configured address.
    pub async fn bind(cfg: EngineConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        let tcp = ReliableListener::bind(addr).await?;
        let udp = UdpSocket::bind(addr).await.context("udp bind")?;
        Ok(Self::from_sockets(cfg, tcp, udp))
    }

    fn from_sockets(cfg: EngineConfig, tcp: ReliableListener, udp: UdpSocket) -> Self {
        Self {
            cfg,
            clients: HashMap::new(),
            characters: BTreeMap::new(),
            next_character: 1,
            tcp,
            udp,
            tick: 0,
            console_rx: None,
        }
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    /// Returns the local address (after binding).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn character(&self, id: CharacterId) -> Option<&ServerCharacter> {
        self.characters.get(&id)
    }

    /// Accepts exactly one client (handshake + spawns).
    pub async fn accept_one(&mut self) -> anyhow::Result<ClientId> {
        let (conn, peer) = self.tcp.accept().await?;
        self.handle_new_connection(conn, peer).await
    }

    /// Accepts a client with timeout (non-blocking).
    pub async fn try_accept(&mut self, timeout: Duration) -> anyhow::Result<Option<ClientId>> {
        match tokio::time::timeout(timeout, self.tcp.accept()).await {
            Ok(Ok((conn, peer))) => self.handle_new_connection(conn, peer).await.map(Some),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None), // Timeout
        }
    }

    async fn handle_new_connection(
        &mut self,
        mut conn: ReliableConn,
        peer: SocketAddr,
    ) -> anyhow::Result<ClientId> {
        let protocol = match conn.recv().await? {
            NetMsg::Hello { protocol } => protocol,
            other => anyhow::bail!("unexpected handshake msg: {other:?}"),
        };
        if protocol != PROTOCOL_VERSION {
            conn.send(&NetMsg::Disconnect {
                reason: format!("protocol {protocol} unsupported, need {PROTOCOL_VERSION}"),
            })
            .await?;
            anyhow::bail!("client protocol {protocol} mismatch");
        }

        let udp_hello = conn.recv().await?;
        let client_udp_port = match udp_hello {
            NetMsg::UdpHello { client_udp_port } => client_udp_port,
            other => anyhow::bail!("expected UdpHello, got {other:?}"),
        };

        let id = ClientId::new_unique();
        let character = CharacterId(self.next_character);
        self.next_character += 1;
        let spawn_position = Vec3::new(SPAWN_SPACING * (character.0 - 1) as f32, 0.0, 0.0);

        conn.send(&NetMsg::Welcome {
            client_id: id,
            character,
        })
        .await?;

        self.characters.insert(
            character,
            ServerCharacter {
                owner: id,
                spawn_position,
                forward_amount: 0.0,
                dirty: ReplicatedFields::empty(),
            },
        );

        // Tell the newcomer about everyone, itself included.
        for (cid, ch) in &self.characters {
            conn.send(&NetMsg::CharacterSpawn(CharacterSpawn {
                character: *cid,
                owner: ch.owner,
                position: ch.spawn_position,
            }))
            .await?;
        }

        // Tell everyone else about the newcomer.
        let announce = NetMsg::CharacterSpawn(CharacterSpawn {
            character,
            owner: id,
            position: spawn_position,
        });
        for (other, slot) in self.clients.iter_mut() {
            if let Err(e) = slot.reliable.send(&announce).await {
                warn!(client_id = ?other, error = %e, "Failed to announce spawn");
            }
        }

        let udp_peer = SocketAddr::new(peer.ip(), client_udp_port);
        self.clients.insert(
            id,
            ClientSlot {
                reliable: conn,
                udp_peer,
                ready: false,
                character,
            },
        );

        info!(client_id = ?id, character = ?character, %udp_peer, "Client connected");
        Ok(id)
    }

    /// Marks a client as ready and sends it the full current field state.
    /// Only honored from the datagram address announced in the handshake.
    pub async fn client_ready(&mut self, client_id: ClientId, from: SocketAddr) -> anyhow::Result<bool> {
        let Some(slot) = self.clients.get_mut(&client_id) else {
            anyhow::bail!("unknown client {client_id:?}");
        };
        if slot.udp_peer != from {
            debug!(client_id = ?client_id, %from, expected = %slot.udp_peer, "Ready from foreign address ignored");
            return Ok(false);
        }
        slot.ready = true;

        let updates = self
            .characters
            .iter()
            .flat_map(|(cid, ch)| {
                FieldId::ALL.into_iter().map(move |field| FieldUpdate {
                    character: *cid,
                    field,
                    value: ch.field(field),
                })
            })
            .collect();
        let batch = NetMsg::Replicate(ReplicationBatch {
            tick: self.tick,
            updates,
        });
        let payload = serde_json::to_vec(&batch).context("serialize replication")?;
        if let Err(e) = self.udp.send_to(&payload, from).await {
            warn!(client_id = ?client_id, error = %e, "Failed to send full state");
        }

        info!(client_id = ?client_id, "Client ready");
        Ok(true)
    }

    /// Removes a client and its character, telling everyone else.
    pub async fn disconnect(&mut self, client_id: ClientId, reason: &str) -> anyhow::Result<()> {
        let Some(mut slot) = self.clients.remove(&client_id) else {
            anyhow::bail!("unknown client {client_id:?}");
        };
        let _ = slot
            .reliable
            .send(&NetMsg::Disconnect {
                reason: reason.to_string(),
            })
            .await;
        self.characters.remove(&slot.character);

        let despawn = NetMsg::CharacterDespawn {
            character: slot.character,
        };
        for (other, s) in self.clients.iter_mut() {
            if let Err(e) = s.reliable.send(&despawn).await {
                warn!(client_id = ?other, error = %e, "Failed to announce despawn");
            }
        }
        info!(client_id = ?client_id, reason, "Client disconnected");
        Ok(())
    }

    /// Runs the server for a number of ticks.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(self.cfg.fixed_dt());
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += dt;
            self.step().await?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one fixed replication step.
    pub async fn step(&mut self) -> anyhow::Result<()> {
        self.process_console_commands().await?;
        self.recv_datagrams().await?;
        self.broadcast_changes().await?;
        self.tick += 1;
        Ok(())
    }

    async fn process_console_commands(&mut self) -> anyhow::Result<()> {
        // Collect lines first to avoid borrow conflict
        let lines: Vec<String> = if let Some(ref mut rx) = self.console_rx {
            let mut collected = Vec::new();
            while let Ok(line) = rx.try_recv() {
                collected.push(line);
            }
            collected
        } else {
            Vec::new()
        };

        for line in lines {
            for out in self.exec_console(&line).await? {
                println!("{}", out);
            }
        }
        Ok(())
    }

    /// Executes a console command.
    pub async fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(cmd) = tokens.first() else {
            return Ok(Vec::new());
        };

        match *cmd {
            "status" => Ok(self.status()),
            "kick" => {
                let Some(id) = tokens.get(1).and_then(|t| t.parse::<u32>().ok()) else {
                    return Ok(vec!["Usage: kick <client id>".to_string()]);
                };
                match self.disconnect(ClientId(id), "kicked").await {
                    Ok(()) => Ok(vec![format!("Kicked client {}", id)]),
                    Err(e) => Ok(vec![format!("Kick failed: {}", e)]),
                }
            }
            "quit" | "exit" => {
                info!("Server shutting down");
                std::process::exit(0);
            }
            other => Ok(vec![format!("Unknown command: {}", other)]),
        }
    }

    pub fn status(&self) -> Vec<String> {
        let mut out = vec![
            format!("Tick: {}", self.tick),
            format!("Clients: {}", self.clients.len()),
        ];
        let mut ids: Vec<_> = self.clients.keys().copied().collect();
        ids.sort_by_key(|c| c.0);
        for id in ids {
            let slot = &self.clients[&id];
            out.push(format!(
                "  {:?}: udp={} ready={} character={:?}",
                id, slot.udp_peer, slot.ready, slot.character
            ));
        }
        for (cid, ch) in &self.characters {
            out.push(format!(
                "  {:?}: owner={:?} forward={:.3}",
                cid, ch.owner, ch.forward_amount
            ));
        }
        out
    }

    async fn recv_datagrams(&mut self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            match self.udp.try_recv_from(&mut buf) {
                Ok((n, from)) => {
                    if let Ok(msg) = serde_json::from_slice::<NetMsg>(&buf[..n]) {
                        self.handle_udp_message(from, msg).await;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e).context("udp recv")?,
            }
        }
        Ok(())
    }

    async fn handle_udp_message(&mut self, from: SocketAddr, msg: NetMsg) {
        match msg {
            NetMsg::SetField { client_id, update } => {
                self.on_set_field(client_id, from, update);
            }
            NetMsg::ClientReady { client_id } => {
                if let Err(e) = self.client_ready(client_id, from).await {
                    warn!(client_id = ?client_id, error = %e, "Failed to mark client ready");
                }
            }
            _ => {
                debug!(?msg, "Unexpected UDP message");
            }
        }
    }

    /// Applies a set request if it comes from the character's owner, sent
    /// from the owner's known datagram address. Anything else is dropped
    /// without telling the sender.
    pub fn on_set_field(&mut self, client_id: ClientId, from: SocketAddr, update: FieldUpdate) -> bool {
        let owns = self
            .clients
            .get(&client_id)
            .is_some_and(|slot| slot.character == update.character && slot.udp_peer == from);
        let Some(ch) = self.characters.get_mut(&update.character) else {
            debug!(character = ?update.character, "Set for unknown character ignored");
            return false;
        };
        if !owns || ch.owner != client_id {
            debug!(client_id = ?client_id, character = ?update.character, "Set from non-owner ignored");
            return false;
        }
        ch.set_field(update.field, update.value);
        true
    }

    /// Collects and clears every dirty field.
    fn take_changes(&mut self) -> Vec<FieldUpdate> {
        let mut updates = Vec::new();
        for (cid, ch) in self.characters.iter_mut() {
            for field in FieldId::ALL {
                if ch.dirty.contains(field.flag()) {
                    updates.push(FieldUpdate {
                        character: *cid,
                        field,
                        value: ch.field(field),
                    });
                }
            }
            ch.dirty = ReplicatedFields::empty();
        }
        updates
    }

    async fn broadcast_changes(&mut self) -> anyhow::Result<()> {
        let updates = self.take_changes();
        if updates.is_empty() {
            return Ok(());
        }

        let batch = NetMsg::Replicate(ReplicationBatch {
            tick: self.tick,
            updates,
        });
        let payload = serde_json::to_vec(&batch).context("serialize replication")?;

        for c in self.clients.values() {
            if c.ready {
                if let Err(e) = self.udp.send_to(&payload, c.udp_peer).await {
                    warn!(peer = %c.udp_peer, error = %e, "Failed to send replication");
                }
            }
        }
        Ok(())
    }
}

/// Helper for tests: bind to an ephemeral port.
pub async fn bind_ephemeral(tick_hz: u32) -> anyhow::Result<(GameServer, EngineConfig)> {
    let cfg = EngineConfig {
        server_addr: format!("{}:{}", IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        tick_hz,
        ..Default::default()
    };

    // Bind TCP first to get an ephemeral port, then bind UDP to that same port.
    let tcp = ReliableListener::bind(cfg.server_addr.parse()?).await?;
    let addr = tcp.local_addr()?;
    let mut cfg = cfg;
    cfg.server_addr = addr.to_string();

    let udp_bind = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port());
    let udp = UdpSocket::bind(udp_bind).await?;

    Ok((GameServer::from_sockets(cfg.clone(), tcp, udp), cfg))
}
