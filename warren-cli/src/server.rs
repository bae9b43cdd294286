//  Copyright 2024 Warren Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The accept loop: one `Database` shared by every connection on a single
//! OS thread via `Rc<RefCell<_>>`, a `spawn_local` task per connection, and
//! a ticker task that drives blocking-command deadlines since nothing else
//! in the engine measures wall-clock time on its own.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::task::LocalSet;

use warren::Database;
use warren_common::config::ServerConfig;

use crate::dispatch::dispatch;
use crate::protocol::{self, ProtocolError};

const SWEEP_INTERVAL: Duration = Duration::from_millis(50);

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let local = LocalSet::new();
    local.run_until(serve(config)).await
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "warren-server listening");

    let db = Rc::new(RefCell::new(Database::new(config.engine)));

    tokio::task::spawn_local(sweep_loop(db.clone()));

    loop {
        let (stream, peer) = listener.accept().await?;
        let db = db.clone();
        tokio::task::spawn_local(async move {
            if let Err(err) = handle_connection(db, stream).await {
                tracing::debug!(%peer, error = %err, "connection closed");
            }
        });
    }
}

async fn sweep_loop(db: Rc<RefCell<Database>>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        db.borrow_mut().sweep_expired();
    }
}

async fn handle_connection(db: Rc<RefCell<Database>>, stream: tokio::net::TcpStream) -> anyhow::Result<()> {
    stream.set_nodelay(true).ok();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let args = match protocol::read_command(&mut reader).await {
            Ok(args) => args,
            Err(ProtocolError::Closed) => return Ok(()),
            Err(err) => {
                protocol::write_error(&mut write_half, &err.to_string()).await?;
                return Ok(());
            }
        };
        if args.is_empty() {
            continue;
        }

        match dispatch(&db, args).await {
            Ok(reply) => protocol::write_reply(&mut write_half, &reply).await?,
            Err(err) => protocol::write_error(&mut write_half, &err.to_string()).await?,
        }
    }
}
