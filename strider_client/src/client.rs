//! Client implementation.
//!
//! The client maintains:
//! - A reliable control stream (handshake, character spawns, disconnects)
//! - An unreliable datagram socket (field-set requests out, replication in)
//! - The one character it owns, driven by local input
//! - Observer replicas of every other character, driven by replication

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use strider_shared::{
    character::Character,
    config::{ControllerConfig, EngineConfig},
    debug_draw::NullDebugDraw,
    motion::{CharacterPose, Motion},
    net::{
        CharacterSpawn, ClientId, NetMsg, ReliableConn, ReplicationBatch, SetFieldSender,
        UnreliableConn, PROTOCOL_VERSION,
    },
    physics::{CollisionWorld, PlaneWorld},
    replication::{flush_outbox, CharacterId},
};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::{camera::FollowCamera, input::InputSource};

/// Client connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Not connected to any server.
    Disconnected,
    /// Connected, waiting for our own character to be spawned.
    Connected,
    /// Own character spawned, ready to play.
    Ready,
}

/// High-level game client.
pub struct GameClient {
    pub client_id: ClientId,
    /// The character this client owns.
    pub character_id: CharacterId,
    pub state: ClientState,

    reliable: ReliableConn,
    pub unreliable: UnreliableConn,
    tick: u32,

    controller: ControllerConfig,
    world: Box<dyn CollisionWorld>,
    /// Present once our own character has spawned.
    pub camera: Option<FollowCamera>,
    characters: BTreeMap<CharacterId, Character>,
    debug_draw: NullDebugDraw,

    /// Last replication tick seen from the server.
    pub last_replicated_tick: Option<u32>,
}

impl GameClient {
    /// Connects to a server and performs handshake.
    pub async fn connect(cfg: &EngineConfig) -> anyhow::Result<Self> {
        Self::connect_with_world(cfg, Box::new(PlaneWorld::flat(0.0))).await
    }

    /// Like [`GameClient::connect`] with custom level geometry.
    pub async fn connect_with_world(
        cfg: &EngineConfig,
        world: Box<dyn CollisionWorld>,
    ) -> anyhow::Result<Self> {
        let server_addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;

        info!(server = %server_addr, "Connecting to server");

        // Bind UDP first so we can tell the server where to send replication.
        let bind = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let unreliable = UnreliableConn::connect(bind, server_addr).await?;
        let client_udp_port = unreliable.local_addr().context("udp local_addr")?.port();

        let stream = TcpStream::connect(server_addr)
            .await
            .context("tcp connect")?;
        let mut reliable = ReliableConn::new(stream);

        reliable
            .send(&NetMsg::Hello {
                protocol: PROTOCOL_VERSION,
            })
            .await?;

        reliable.send(&NetMsg::UdpHello { client_udp_port }).await?;

        let welcome = reliable.recv().await?;
        let (client_id, character_id) = match welcome {
            NetMsg::Welcome {
                client_id,
                character,
            } => (client_id, character),
            other => anyhow::bail!("expected Welcome, got {other:?}"),
        };

        info!(client_id = ?client_id, character = ?character_id, "Connected to server");

        let mut client = Self {
            client_id,
            character_id,
            state: ClientState::Connected,
            reliable,
            unreliable,
            tick: 0,
            controller: cfg.controller,
            world,
            camera: None,
            characters: BTreeMap::new(),
            debug_draw: NullDebugDraw,
            last_replicated_tick: None,
        };

        // Check for immediate spawns.
        client.poll_reliable().await?;

        Ok(client)
    }

    /// Polls the reliable connection for one message.
    pub async fn poll_reliable(&mut self) -> anyhow::Result<()> {
        // Use a short timeout to avoid blocking.
        match tokio::time::timeout(Duration::from_millis(10), self.reliable.recv()).await {
            Ok(Ok(msg)) => {
                self.handle_reliable_message(msg);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Reliable connection error");
                self.state = ClientState::Disconnected;
            }
            Err(_) => {
                // Timeout, no message available.
            }
        }
        Ok(())
    }

    /// Polls until our own character exists or `timeout` elapses.
    pub async fn wait_until_ready(&mut self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.state == ClientState::Connected {
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("own character {:?} was never spawned", self.character_id);
            }
            self.poll_reliable().await?;
        }
        if self.state == ClientState::Disconnected {
            anyhow::bail!("disconnected before ready");
        }
        Ok(())
    }

    fn handle_reliable_message(&mut self, msg: NetMsg) {
        match msg {
            NetMsg::CharacterSpawn(spawn) => self.spawn_character(spawn),
            NetMsg::CharacterDespawn { character } => {
                if self.characters.remove(&character).is_some() {
                    debug!(character = ?character, "Character despawned");
                }
            }
            NetMsg::Disconnect { reason } => {
                info!(reason = %reason, "Disconnected from server");
                self.state = ClientState::Disconnected;
            }
            other => {
                debug!(?other, "Unhandled reliable message");
            }
        }
    }

    fn spawn_character(&mut self, spawn: CharacterSpawn) {
        let owned = spawn.owner == self.client_id && spawn.character == self.character_id;
        let character = Character::spawn(
            spawn.character,
            self.controller,
            CharacterPose::at(spawn.position),
            owned,
        );
        debug!(character = ?spawn.character, owner = ?spawn.owner, owned, "Character spawned");
        self.characters.insert(spawn.character, character);

        if owned {
            self.camera = Some(FollowCamera::default());
            if self.state == ClientState::Connected {
                self.state = ClientState::Ready;
            }
        }
    }

    /// Sends a "ready" signal so the server starts replicating to us.
    pub async fn send_ready(&mut self) -> anyhow::Result<()> {
        self.unreliable
            .send(&NetMsg::ClientReady {
                client_id: self.client_id,
            })
            .await?;
        info!("Sent ready signal to server");
        Ok(())
    }

    /// Fixed physics tick: sample input, move the owned character, and send
    /// its changed fields to the server.
    pub async fn tick(
        &mut self,
        input: &mut dyn InputSource,
        dt: f32,
    ) -> anyhow::Result<Option<Motion>> {
        let axes = input.sample(self.tick);
        self.tick += 1;

        let (Some(camera), Some(local)) =
            (self.camera.as_ref(), self.characters.get_mut(&self.character_id))
        else {
            return Ok(None);
        };
        let motion = local.fixed_tick(axes, camera, self.world.as_ref(), dt, &mut self.debug_draw);

        if let Some(outbox) = local.outbox_mut() {
            let sender = SetFieldSender {
                conn: &self.unreliable,
                client_id: self.client_id,
            };
            flush_outbox(outbox, &sender).await?;
        }
        Ok(motion)
    }

    /// Frame tick: drive every character's animator.
    pub fn frame(&mut self, dt: f32) {
        for character in self.characters.values_mut() {
            character.frame_tick(dt);
        }
    }

    /// Receives one datagram, if any, and applies replication.
    pub async fn recv_replication(&mut self) -> anyhow::Result<()> {
        if let Some(msg) = self
            .unreliable
            .recv_timeout(Duration::from_millis(20))
            .await?
        {
            match msg {
                NetMsg::Replicate(batch) => self.apply_batch(batch),
                other => {
                    debug!(?other, "Unexpected UDP message");
                }
            }
        }
        Ok(())
    }

    fn apply_batch(&mut self, batch: ReplicationBatch) {
        for update in batch.updates {
            match self.characters.get_mut(&update.character) {
                Some(character) => {
                    character.apply_replicated(update);
                }
                None => debug!(character = ?update.character, "Update for unknown character"),
            }
        }
        self.last_replicated_tick = Some(batch.tick);
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// The character this client controls, once spawned.
    pub fn local_character(&self) -> Option<&Character> {
        self.characters.get(&self.character_id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Human-readable status lines.
    pub fn status(&self) -> Vec<String> {
        let mut out = vec![
            format!("State: {:?}", self.state),
            format!("Client ID: {:?}", self.client_id),
            format!("Tick: {}", self.tick),
        ];
        for ch in self.characters.values() {
            out.push(format!(
                "  {:?}: role={:?} forward={:.3} pos={:?}",
                ch.id(),
                ch.role(),
                ch.forward_amount(),
                ch.pose().position
            ));
        }
        out
    }

    /// Returns the underlying reliable connection peer.
    pub fn server_peer(&self) -> anyhow::Result<SocketAddr> {
        self.reliable.peer_addr()
    }
}
