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

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command as ProcessCommand};
use tokio::sync::{watch, Mutex};

use client::apdu::{ApduAnswer, ApduCommand};
use client::{TcpTransport, Transport, TransportError};

use crate::session::{get_entropy, Button, DeviceConfig, DeviceControl};
use crate::snapshot::Snapshot;
use crate::Error;

const BUTTON_LEFT: u8 = b'L';
const BUTTON_RIGHT: u8 = b'R';
const BUTTON_BOTH: u8 = b'B';

const BOOT_BUDGET: Duration = Duration::from_secs(30);

/// Connection to a spawned emulator process. The harness binds the
/// listeners, hands the ports to the emulator on its command line and
/// waits for it to dial back on all three channels.
pub struct EmulatorLink {
    apdu: TcpTransport,
    buttons: Mutex<TcpStream>,
    frames: watch::Receiver<Option<Snapshot>>,
    child: Mutex<Option<Child>>,
}

impl EmulatorLink {
    pub async fn spawn(config: &DeviceConfig) -> Result<Self, Error> {
        log::trace!("Spawning emulator...");

        let apdu = TcpListener::bind("127.0.0.1:0").await?;
        let buttons = TcpListener::bind("127.0.0.1:0").await?;
        let display = TcpListener::bind("127.0.0.1:0").await?;

        let entropy = get_entropy(&config.entropy);
        let args = vec![
            config.app.display().to_string(),
            "--seed".to_string(),
            config.seed.clone(),
            "--apdu-port".to_string(),
            apdu.local_addr()?.port().to_string(),
            "--button-port".to_string(),
            buttons.local_addr()?.port().to_string(),
            "--display-port".to_string(),
            display.local_addr()?.port().to_string(),
            "--entropy".to_string(),
            format!("0x{:016X}", entropy),
        ];

        log::trace!("Emulator args: {:?}", args);

        let child = ProcessCommand::new(&config.emulator)
            .kill_on_drop(true)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        // Wait for the emulator to connect
        let (apdu, buttons, display) =
            futures::join!(apdu.accept(), buttons.accept(), display.accept());
        let (apdu, buttons, display) = (apdu?.0, buttons?.0, display?.0);

        let frames = spawn_frame_task(display);

        // The first pushed frame is the boot screen; the session is only
        // Ready once the device is drawing.
        let mut ready = frames.clone();
        tokio::time::timeout(BOOT_BUDGET, async {
            while ready.borrow().is_none() {
                ready
                    .changed()
                    .await
                    .map_err(|_| "Display stream closed during boot")?;
            }
            Ok::<_, Error>(())
        })
        .await
        .map_err(|_| "Emulator did not draw within the boot budget")??;

        Ok(EmulatorLink {
            apdu: TcpTransport::new(apdu),
            buttons: Mutex::new(buttons),
            frames,
            child: Mutex::new(Some(child)),
        })
    }
}

/// Decode pushed framebuffer packets into snapshots. Packet layout:
/// width and height as big-endian u16, pixel count as big-endian u32,
/// then gray8 pixels.
fn spawn_frame_task(mut display: TcpStream) -> watch::Receiver<Option<Snapshot>> {
    let (sender, receiver) = watch::channel(None);

    tokio::spawn(async move {
        loop {
            let mut header = [0u8; 8];
            if display.read_exact(&mut header).await.is_err() {
                log::warn!("Display stream closed");
                break;
            }
            let width = u16::from_be_bytes([header[0], header[1]]) as u32;
            let height = u16::from_be_bytes([header[2], header[3]]) as u32;
            let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;

            let mut pixels = vec![0u8; len];
            if display.read_exact(&mut pixels).await.is_err() {
                log::warn!("Display stream closed mid-frame");
                break;
            }

            match Snapshot::from_frame(width, height, pixels) {
                Ok(snapshot) => {
                    if sender.send(Some(snapshot)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Bad frame from emulator: {}", e);
                    break;
                }
            }
        }
    });

    receiver
}

#[async_trait]
impl Transport for EmulatorLink {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        self.apdu.exchange(command).await
    }
}

#[async_trait]
impl DeviceControl for EmulatorLink {
    async fn screen(&self) -> Result<Snapshot, Error> {
        let frame = self.frames.borrow().clone();
        Ok(frame.ok_or("No frame received yet")?)
    }

    async fn press(&self, button: Button) -> Result<(), Error> {
        let opcode = match button {
            Button::Left => BUTTON_LEFT,
            Button::Right => BUTTON_RIGHT,
            Button::Both => BUTTON_BOTH,
        };
        let mut stream = self.buttons.lock().await;
        stream.write_all(&[opcode]).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), Error> {
        let mut child = self.child.lock().await;
        match child.take() {
            Some(mut child) => {
                child.kill().await?;
                Ok(())
            }
            None => Err("Emulator already shut down".into()),
        }
    }
}
