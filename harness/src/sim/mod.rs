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

//! In-process stand-in for an emulated device. It answers the same APDU
//! protocol and exposes the same screen/button surface as the real
//! emulator link, with keys derived from a configurable seed phrase, so
//! scenarios run hermetically.

use async_trait::async_trait;

use tokio::sync::{oneshot, Mutex};

use client::apdu::{ApduAnswer, ApduCommand, StatusWord};
use client::{
    DerivationPath, Transport, TransportError, CLA, INS_GET_ADDRESS, INS_GET_VERSION, INS_SIGN,
    P1_SIGN_ADD, P1_SIGN_INIT, P1_SIGN_LAST, SIG_SCHEME_ED25519,
};

use crate::session::{Button, DeviceControl};
use crate::snapshot::Snapshot;
use crate::Error;

pub mod keys;
pub mod screens;

use screens::Screen;

/// Identity and firmware parameters of a simulated device.
#[derive(Clone, Debug)]
pub struct SimProfile {
    pub seed_phrase: String,
    pub test_mode: bool,
    pub version: (u8, u8, u8),
}

impl SimProfile {
    pub fn with_seed(seed_phrase: &str) -> Self {
        SimProfile {
            seed_phrase: seed_phrase.to_string(),
            test_mode: true,
            version: (0, 9, 1),
        }
    }
}

struct ReviewFlow {
    screens: Vec<Screen>,
    position: usize,
    approve_at: usize,
    reject_at: usize,
    decision: Option<oneshot::Sender<bool>>,
}

struct SignContext {
    path: DerivationPath,
    payload: Vec<u8>,
}

#[derive(Default)]
struct SimState {
    powered_off: bool,
    flow: Option<ReviewFlow>,
    pending_sign: Option<SignContext>,
}

pub struct SimulatedDevice {
    profile: SimProfile,
    seed: [u8; 64],
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    pub fn boot(profile: SimProfile) -> Self {
        let seed = keys::master_seed(&profile.seed_phrase);
        SimulatedDevice {
            profile,
            seed,
            state: Mutex::new(SimState::default()),
        }
    }

    pub async fn is_shut_down(&self) -> bool {
        self.state.lock().await.powered_off
    }

    /// Park the command on the review flow until a dual press resolves it
    /// on the approve or reject screen.
    async fn review(&self, screens: Vec<Screen>) -> Result<bool, TransportError> {
        let receiver = {
            let mut state = self.state.lock().await;
            if state.powered_off {
                return Err(TransportError::Closed);
            }

            let (sender, receiver) = oneshot::channel();
            let approve_at = screens.len() - 2;
            let reject_at = screens.len() - 1;
            state.flow = Some(ReviewFlow {
                screens,
                position: 0,
                approve_at,
                reject_at,
                decision: Some(sender),
            });
            receiver
        };

        let accepted = receiver.await.map_err(|_| TransportError::Closed)?;

        let mut state = self.state.lock().await;
        state.flow = None;
        Ok(accepted)
    }

    fn get_version(&self) -> ApduAnswer {
        let (major, minor, patch) = self.profile.version;
        answer(
            vec![self.profile.test_mode as u8, major, minor, patch],
            StatusWord::Success,
        )
    }

    async fn get_address(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let path = match DerivationPath::from_wire(&command.data) {
            Some(path) => path,
            None => return Ok(answer(vec![], StatusWord::DataInvalid)),
        };

        let public_key = keys::public_key(&self.seed, &path);
        let address = keys::ss58_encode(&public_key);

        if command.p1 != 0 {
            let accepted = self.review(screens::address_flow(&address)).await?;
            if !accepted {
                return Ok(answer(vec![], StatusWord::TransactionRejected));
            }
        }

        let mut data = public_key.to_vec();
        data.extend_from_slice(address.as_bytes());
        Ok(answer(data, StatusWord::Success))
    }

    async fn sign(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        match command.p1 {
            P1_SIGN_INIT => {
                let path = match DerivationPath::from_wire(&command.data) {
                    Some(path) => path,
                    None => return Ok(answer(vec![], StatusWord::DataInvalid)),
                };
                let mut state = self.state.lock().await;
                if state.powered_off {
                    return Err(TransportError::Closed);
                }
                state.pending_sign = Some(SignContext {
                    path,
                    payload: vec![],
                });
                Ok(answer(vec![], StatusWord::Success))
            }
            P1_SIGN_ADD | P1_SIGN_LAST => {
                let finished = {
                    let mut state = self.state.lock().await;
                    match state.pending_sign.as_mut() {
                        Some(context) => context.payload.extend_from_slice(&command.data),
                        None => return Ok(answer(vec![], StatusWord::EmptyBuffer)),
                    }
                    if command.p1 == P1_SIGN_LAST {
                        state.pending_sign.take()
                    } else {
                        None
                    }
                };

                let context = match finished {
                    Some(context) => context,
                    None => return Ok(answer(vec![], StatusWord::Success)),
                };

                let accepted = self.review(screens::sign_flow(&context.payload)).await?;
                if !accepted {
                    return Ok(answer(vec![], StatusWord::TransactionRejected));
                }

                let signature = keys::sign(&self.seed, &context.path, &context.payload);
                let mut data = vec![SIG_SCHEME_ED25519];
                data.extend_from_slice(&signature);
                Ok(answer(data, StatusWord::Success))
            }
            _ => Ok(answer(vec![], StatusWord::InvalidP1P2)),
        }
    }
}

fn answer(data: Vec<u8>, status: StatusWord) -> ApduAnswer {
    ApduAnswer {
        data,
        sw: status.code(),
    }
}

#[async_trait]
impl Transport for SimulatedDevice {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        {
            let state = self.state.lock().await;
            if state.powered_off {
                return Err(TransportError::Closed);
            }
        }

        if command.cla != CLA {
            return Ok(answer(vec![], StatusWord::ClaNotSupported));
        }
        match command.ins {
            INS_GET_VERSION => Ok(self.get_version()),
            INS_GET_ADDRESS => self.get_address(command).await,
            INS_SIGN => self.sign(command).await,
            _ => Ok(answer(vec![], StatusWord::InsNotSupported)),
        }
    }
}

#[async_trait]
impl DeviceControl for SimulatedDevice {
    async fn screen(&self) -> Result<Snapshot, Error> {
        let state = self.state.lock().await;
        if state.powered_off {
            return Err("device is powered off".into());
        }
        let screen = match &state.flow {
            Some(flow) => flow.screens[flow.position].clone(),
            None => screens::main_menu(&self.profile),
        };
        screens::render(&screen)
    }

    async fn press(&self, button: Button) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.powered_off {
            return Err("device is powered off".into());
        }

        // buttons on the idle screen are inert
        let flow = match state.flow.as_mut() {
            Some(flow) => flow,
            None => return Ok(()),
        };

        match button {
            Button::Right => flow.position = (flow.position + 1).min(flow.reject_at),
            Button::Left => flow.position = flow.position.saturating_sub(1),
            Button::Both => {
                if flow.position == flow.approve_at || flow.position == flow.reject_at {
                    let accepted = flow.position == flow.approve_at;
                    if let Some(decision) = flow.decision.take() {
                        let _ = decision.send(accepted);
                    }
                } else {
                    // dual press inside the review pages jumps to the
                    // approve choice
                    flow.position = flow.approve_at;
                }
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.powered_off = true;
        state.pending_sign = None;
        // dropping the decision sender fails any parked command with a
        // closed-link error
        state.flow = None;
        Ok(())
    }
}
