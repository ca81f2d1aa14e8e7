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

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use serde::{Deserialize, Serialize};

use tokio::task::JoinHandle;

use client::Transport;

use crate::link::EmulatorLink;
use crate::scenario::{Command, CommandOutcome, ScenarioError};
use crate::sim::{SimProfile, SimulatedDevice};
use crate::snapshot::Snapshot;
use crate::Error;

/// Physical inputs the harness can inject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
    /// Simultaneous dual press.
    Both,
}

/// UI side of the device capability: screen capture and button presses.
/// Together with [`client::Transport`] this is everything a session needs
/// from a device, emulated or simulated.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn screen(&self) -> Result<Snapshot, Error>;
    async fn press(&self, button: Button) -> Result<(), Error>;
    async fn shutdown(&self) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Ready,
    Closing,
    Closed,
}

/// Launch parameters for an emulated device process.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub emulator: PathBuf,
    pub app: PathBuf,
    pub seed: String,
    pub entropy: Option<u64>,
}

pub fn get_entropy(arg: &Option<u64>) -> u64 {
    use rand::RngCore;

    match arg {
        Some(ref val) => *val,
        None => rand::thread_rng().next_u64(),
    }
}

/// One running device instance. Owned exclusively by a single scenario;
/// [`DeviceSession::close`] must run on every exit path and completes
/// exactly once.
pub struct DeviceSession<L> {
    link: Arc<L>,
    state: SessionState,
    in_flight: Arc<AtomicBool>,
}

impl DeviceSession<EmulatorLink> {
    /// Spawn the emulator process and wait until it is drawing.
    pub async fn start(config: &DeviceConfig) -> Result<Self, Error> {
        let link = EmulatorLink::spawn(config)
            .await
            .map_err(|e| ScenarioError::SessionLifecycle(e.to_string()))?;
        Ok(DeviceSession::attach(Arc::new(link)))
    }
}

impl DeviceSession<SimulatedDevice> {
    /// Boot an in-process simulated device.
    pub fn simulated(profile: &SimProfile) -> Self {
        DeviceSession::attach(Arc::new(SimulatedDevice::boot(profile.clone())))
    }
}

impl<L> DeviceSession<L>
where
    L: Transport + DeviceControl + 'static,
{
    /// Adopt an already-running device.
    pub fn attach(link: Arc<L>) -> Self {
        DeviceSession {
            link,
            state: SessionState::Ready,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn link(&self) -> &Arc<L> {
        &self.link
    }

    pub async fn screen(&self) -> Result<Snapshot, Error> {
        self.link.screen().await
    }

    /// Issue a command without blocking on its result. At most one command
    /// may be outstanding per session.
    pub fn issue(&mut self, command: Command) -> Result<PendingCommand, Error> {
        if self.state != SessionState::Ready {
            return Err(
                ScenarioError::SessionLifecycle("command issued on a session that is not ready".into())
                    .into(),
            );
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(
                ScenarioError::SessionLifecycle("a command is already outstanding".into()).into(),
            );
        }

        let link = Arc::clone(&self.link);
        let in_flight = Arc::clone(&self.in_flight);
        let handle = tokio::spawn(async move {
            let result = command.execute(link).await;
            in_flight.store(false, Ordering::SeqCst);
            result
        });

        Ok(PendingCommand { handle })
    }

    /// Tear the device down.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Closed {
            return Err(ScenarioError::SessionLifecycle("session closed twice".into()).into());
        }
        self.state = SessionState::Closing;
        let result = self.link.shutdown().await;
        self.state = SessionState::Closed;
        result
    }
}

/// Handle to a command whose result has not been awaited yet.
pub struct PendingCommand {
    handle: JoinHandle<Result<CommandOutcome, Error>>,
}

impl PendingCommand {
    /// Join point: wait for the device to answer.
    pub async fn outcome(self) -> Result<CommandOutcome, Error> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(format!("command task failed: {}", e).into()),
        }
    }

    /// Best-effort abandon of the in-flight exchange. The session teardown
    /// reclaims the device either way.
    pub fn abandon(self) {
        self.handle.abort();
    }
}
