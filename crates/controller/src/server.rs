// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller TCP server: session dispatch, car selection and scheduling.
//!
//! Every accepted connection gets its own task. The first frame decides the
//! session kind: `CALL` runs the scheduler once and answers the pad, `CAR`
//! registers the car and ingests its status stream until it disconnects or
//! bows out with an override notice, anything else is answered `INVALID`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lift_core::floor::Floor;
use lift_core::frame::{recv_frame, send_frame};
use lift_core::message::Message;
use lift_core::state::DoorState;

use crate::registry::{CarHandle, CarRecord, Registry};

/// Accept backlog, sized for a building's worth of cars and pads.
const BACKLOG: u32 = 10;

pub struct Server {
    listener: tokio::net::TcpListener,
    registry: Arc<Registry>,
}

impl Server {
    /// Bind the listening socket. Port 0 picks an ephemeral port, readable
    /// back through [`Server::local_addr`].
    pub async fn bind(host: &str, port: u16) -> anyhow::Result<Self> {
        let addr: SocketAddr =
            format!("{host}:{port}").parse().context("invalid listen address")?;
        let socket = TcpSocket::new_v4().context("socket")?;
        socket.set_reuseaddr(true).context("SO_REUSEADDR")?;
        socket.bind(addr).with_context(|| format!("bind {addr}"))?;
        let listener = socket.listen(BACKLOG).context("listen")?;
        Ok(Self { listener, registry: Arc::new(Registry::new()) })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve clients until shutdown. Worker errors only ever
    /// cost that worker's connection; the registry dies with the server.
    pub async fn serve(self, shutdown: CancellationToken) {
        match self.listener.local_addr() {
            Ok(addr) => info!(%addr, "controller listening"),
            Err(_) => info!("controller listening"),
        }
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "client connected");
                        tokio::spawn(handle_client(stream, Arc::clone(&self.registry)));
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
            }
        }
        info!("controller stopped");
    }
}

/// Dispatch one connection on its first frame.
async fn handle_client(stream: TcpStream, registry: Arc<Registry>) {
    let (mut reader, mut writer) = stream.into_split();
    let opener = match recv_frame(&mut reader).await {
        Ok(payload) => payload,
        Err(_) => return,
    };
    match Message::parse(&opener) {
        Ok(Message::Call { source, destination }) => {
            handle_call(&mut writer, &registry, source, destination).await;
        }
        Ok(Message::Register { name, lowest, highest }) => {
            manage_car(reader, writer, registry, name, lowest, highest).await;
        }
        _ => {
            debug!(payload = %opener, "invalid session opener");
            let _ = send_frame(&mut writer, &Message::Invalid.encode()).await;
        }
    }
}

/// Schedule a call onto the best car and answer the pad.
async fn handle_call(
    writer: &mut OwnedWriteHalf,
    registry: &Registry,
    source: Floor,
    destination: Floor,
) {
    let Some(car) = choose_car(registry, source, destination).await else {
        debug!(%source, %destination, "no car available");
        let _ = send_frame(writer, &Message::Unavailable.encode()).await;
        return;
    };

    let name = {
        let mut record = car.lock().await;
        let (door, current, dest) = (record.door, record.current, record.destination);
        record.queue.schedule(door, current, dest, source, destination);
        info!(
            car = %record.name,
            %source,
            %destination,
            queued = record.queue.len(),
            "call scheduled"
        );

        // Wake the car unless it is already headed for the queue head; a
        // head at the car's own floor still needs the doors reopened.
        if let Some(head) = record.queue.first_floor() {
            if head != record.destination || head == record.current {
                let directive = Message::Floor(head).encode();
                if send_frame(&mut record.writer, &directive).await.is_err() {
                    warn!(car = %record.name, "failed to send floor directive");
                }
            }
        }
        record.name.clone()
    };

    let _ = send_frame(writer, &Message::Assigned(name).encode()).await;
}

/// Pick the registered car covering both floors with the shortest queue;
/// ties go to the earliest registration.
async fn choose_car(
    registry: &Registry,
    source: Floor,
    destination: Floor,
) -> Option<Arc<CarHandle>> {
    let mut best: Option<(Arc<CarHandle>, usize)> = None;
    for car in registry.snapshot().await {
        let record = car.lock().await;
        if !source.within(record.lowest, record.highest)
            || !destination.within(record.lowest, record.highest)
        {
            continue;
        }
        let entries = record.queue.len();
        drop(record);
        let better = match &best {
            None => true,
            Some((_, shortest)) => entries < *shortest,
        };
        if better {
            best = Some((car, entries));
        }
    }
    best.map(|(car, _)| car)
}

/// Car session: register, ingest status reports, tear down on disconnect
/// or an override notice.
async fn manage_car(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    registry: Arc<Registry>,
    name: String,
    lowest: Floor,
    highest: Floor,
) {
    if highest < lowest {
        let _ = send_frame(&mut writer, &Message::Invalid.encode()).await;
        return;
    }

    let car = Arc::new(CarHandle::new(CarRecord::new(name.clone(), lowest, highest, writer)));
    registry.register(Arc::clone(&car)).await;
    info!(car = %name, %lowest, %highest, "car registered");

    loop {
        let payload = match recv_frame(&mut reader).await {
            Ok(payload) => payload,
            Err(_) => {
                info!(car = %name, "car disconnected");
                break;
            }
        };
        match Message::parse(&payload) {
            Ok(Message::Status { door, current, destination }) => {
                update_car_state(&car, door, current, destination).await;
            }
            Ok(Message::IndividualService) => {
                info!(car = %name, "car entered individual service");
                break;
            }
            Ok(Message::Emergency) => {
                info!(car = %name, "car entered emergency mode");
                break;
            }
            _ => warn!(car = %name, payload = %payload, "ignoring unexpected car message"),
        }
    }

    registry.deregister(&car).await;
}

/// Ingest one status report. An `Opening` report at the destination floor
/// is an arrival: clear the stop (twice for a reversing double-stop) and
/// dispatch the next head if one remains.
async fn update_car_state(car: &CarHandle, door: DoorState, current: Floor, destination: Floor) {
    let mut record = car.lock().await;
    record.door = door;
    record.current = current;
    record.destination = destination;

    if door != DoorState::Opening || current != destination {
        return;
    }
    record.queue.pop_arrived(current);
    if let Some(next) = record.queue.first_floor() {
        debug!(car = %record.name, floor = %next, "dispatching next stop");
        let directive = Message::Floor(next).encode();
        if send_frame(&mut record.writer, &directive).await.is_err() {
            warn!(car = %record.name, "failed to send floor directive");
        }
    }
}
