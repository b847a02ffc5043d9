//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p strider_client -- [--addr 127.0.0.1:40000] [--tick-hz 50] [--name Player] [--config cfg.json]
//!
//! The client connects to the server, walks its character along a scripted
//! square, and animates every other connected character from replication.
//!
//! Console commands:
//!   status  - Show client status
//!   quit    - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use strider_client::client::{ClientState, GameClient};
use strider_client::input::ScriptedInput;
use strider_shared::config::EngineConfig;
use tokio::sync::mpsc;
use tracing::info;

fn parse_args() -> anyhow::Result<EngineConfig> {
    let args: Vec<String> = env::args().collect();
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => EngineConfig::load(&args[i + 1])?,
        _ => EngineConfig::default(),
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1]
                    .parse()
                    .with_context(|| format!("parse --tick-hz {}", args[i + 1]))?;
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(server = %cfg.server_addr, name = %cfg.player_name, "Starting client");

    let mut client = GameClient::connect(&cfg).await.context("connect")?;
    client
        .wait_until_ready(Duration::from_secs(5))
        .await
        .context("wait for spawn")?;
    client.send_ready().await?;

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let mut input = ScriptedInput::square_walk(cfg.tick_hz * 2);
    let dt = cfg.fixed_dt();
    let tick_interval = Duration::from_secs_f32(dt);
    let mut next_tick = tokio::time::Instant::now();
    let frame_dt = 1.0 / cfg.frame_hz as f32;
    let mut frame_accum = 0.0f32;
    let mut ticks: u32 = 0;

    loop {
        while let Ok(line) = console_rx.try_recv() {
            match line.as_str() {
                "status" => {
                    for line in client.status() {
                        println!("{}", line);
                    }
                }
                "quit" | "exit" => return Ok(()),
                other => println!("Unknown command: {}", other),
            }
        }

        client.poll_reliable().await?;
        if client.state == ClientState::Disconnected {
            println!("Disconnected from server.");
            break;
        }

        client.tick(&mut input, dt).await?;
        client.recv_replication().await?;

        frame_accum += dt;
        while frame_accum >= frame_dt {
            client.frame(frame_dt);
            frame_accum -= frame_dt;
        }

        ticks += 1;
        if ticks % cfg.tick_hz == 0 {
            if let Some(me) = client.local_character() {
                info!(forward = me.forward_amount(), position = ?me.pose().position, "Local character");
            }
        }

        next_tick += tick_interval;
        tokio::time::sleep_until(next_tick).await;
    }

    Ok(())
}
