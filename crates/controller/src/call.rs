// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call pad: one-shot ride request client.

use clap::Parser;
use tokio::net::TcpStream;

use lift_core::floor::Floor;
use lift_core::frame::{recv_frame, send_frame};
use lift_core::message::Message;

use crate::config::LogArgs;

/// Call pad: request a ride between two floors.
#[derive(Debug, Parser)]
#[command(name = "call", version, about)]
pub struct CallArgs {
    /// Floor you are calling from.
    pub source: String,

    /// Floor you want to travel to.
    pub destination: String,

    /// Controller host.
    #[arg(long, env = "LIFT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Controller TCP port.
    #[arg(long, env = "LIFT_PORT", default_value = "3000")]
    pub port: u16,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Send one `CALL` and report the controller's answer. Returns the process
/// exit code.
pub async fn run(args: &CallArgs) -> i32 {
    let floors = (args.source.parse::<Floor>(), args.destination.parse::<Floor>());
    let (Ok(source), Ok(destination)) = floors else {
        println!("Invalid floor(s) specified.");
        return 1;
    };
    if source == destination {
        println!("You are already on that floor!");
        return 1;
    }

    let mut stream = match TcpStream::connect((args.host.as_str(), args.port)).await {
        Ok(stream) => stream,
        Err(_) => {
            eprintln!("Unable to connect to elevator system.");
            return 1;
        }
    };

    let request = Message::Call { source, destination };
    if send_frame(&mut stream, &request.encode()).await.is_err() {
        eprintln!("Failed to send request to elevator system.");
        return 1;
    }
    let reply = match recv_frame(&mut stream).await {
        Ok(reply) => reply,
        Err(_) => {
            eprintln!("Failed to receive response from elevator system.");
            return 1;
        }
    };

    match Message::parse(&reply) {
        Ok(Message::Assigned(name)) => {
            println!("Car {name} is arriving.");
            0
        }
        _ => {
            println!("Sorry, no car is available to take this request.");
            0
        }
    }
}
