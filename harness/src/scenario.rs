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

use core::fmt;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use client::{AddressResponse, DerivationPath, SignResponse, Transport, VersionResponse, WalletApp};

use crate::approval::{run_approval, ApprovalPlan};
use crate::report::{ScenarioLog, StepRecord};
use crate::session::{DeviceConfig, DeviceControl, DeviceSession};
use crate::sim::SimProfile;
use crate::sync::wait_for_screen_change;
use crate::Error;

/// Default budget for the wait on the first screen transition.
pub const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_secs(15);

/// Status word the harness treats as success everywhere.
pub const SW_OK: u16 = 0x9000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    GetVersion,
    GetAddress {
        account: u32,
        change: u32,
        index: u32,
        require_confirmation: bool,
    },
    Sign {
        account: u32,
        change: u32,
        index: u32,
        #[serde(with = "payload_hex")]
        payload: Vec<u8>,
    },
}

impl Command {
    pub fn requires_confirmation(&self) -> bool {
        match self {
            Command::GetVersion => false,
            Command::GetAddress {
                require_confirmation,
                ..
            } => *require_confirmation,
            Command::Sign { .. } => true,
        }
    }

    pub(crate) async fn execute<T: Transport>(self, link: Arc<T>) -> Result<CommandOutcome, Error> {
        let app = WalletApp::new(link);
        let outcome = match self {
            Command::GetVersion => app.get_version().await?.into(),
            Command::GetAddress {
                account,
                change,
                index,
                require_confirmation,
            } => {
                app.get_address(
                    DerivationPath::new(account, change, index),
                    require_confirmation,
                )
                .await?
                .into()
            }
            Command::Sign {
                account,
                change,
                index,
                payload,
            } => {
                app.sign(DerivationPath::new(account, change, index), &payload)
                    .await?
                    .into()
            }
        };
        Ok(outcome)
    }
}

mod payload_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomePayload {
    None,
    Version {
        test_mode: bool,
        major: u8,
        minor: u8,
        patch: u8,
    },
    Address {
        pub_key: String,
        address: String,
    },
    Signature(Vec<u8>),
}

/// Result of one device command, as observed by the harness. A non-success
/// return code is an assertable outcome, never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    pub return_code: u16,
    pub error_message: String,
    pub payload: OutcomePayload,
}

impl CommandOutcome {
    pub fn signature(&self) -> Option<&[u8]> {
        match &self.payload {
            OutcomePayload::Signature(signature) => Some(signature),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<(&str, &str)> {
        match &self.payload {
            OutcomePayload::Address { pub_key, address } => Some((pub_key, address)),
            _ => None,
        }
    }
}

impl From<VersionResponse> for CommandOutcome {
    fn from(response: VersionResponse) -> Self {
        let payload = if response.return_code == SW_OK {
            OutcomePayload::Version {
                test_mode: response.test_mode,
                major: response.major,
                minor: response.minor,
                patch: response.patch,
            }
        } else {
            OutcomePayload::None
        };
        CommandOutcome {
            return_code: response.return_code,
            error_message: response.error_message,
            payload,
        }
    }
}

impl From<AddressResponse> for CommandOutcome {
    fn from(response: AddressResponse) -> Self {
        let payload = if response.return_code == SW_OK {
            OutcomePayload::Address {
                pub_key: response.pub_key,
                address: response.address,
            }
        } else {
            OutcomePayload::None
        };
        CommandOutcome {
            return_code: response.return_code,
            error_message: response.error_message,
            payload,
        }
    }
}

impl From<SignResponse> for CommandOutcome {
    fn from(response: SignResponse) -> Self {
        let payload = if response.return_code == SW_OK {
            OutcomePayload::Signature(response.signature)
        } else {
            OutcomePayload::None
        };
        CommandOutcome {
            return_code: response.return_code,
            error_message: response.error_message,
            payload,
        }
    }
}

/// Failures that end a scenario. All of them propagate to the caller;
/// the session teardown runs regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    NavigationTimeout { waited_ms: u64 },
    SnapshotCountMismatch { expected: usize, actual: usize },
    SessionLifecycle(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self, f)
    }
}
impl std::error::Error for ScenarioError {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioPlan {
    pub name: String,
    pub command: Command,
    #[serde(default)]
    pub approval: Option<ApprovalPlan>,
    #[serde(default = "default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
}

fn default_nav_timeout_ms() -> u64 {
    DEFAULT_NAV_TIMEOUT.as_millis() as u64
}

impl ScenarioPlan {
    pub fn new(name: &str, command: Command) -> Self {
        ScenarioPlan {
            name: name.to_string(),
            command,
            approval: None,
            nav_timeout_ms: default_nav_timeout_ms(),
        }
    }

    pub fn with_approval(mut self, approval: ApprovalPlan) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Drive one scenario to completion. The session is consumed and closed on
/// every exit path; a teardown failure surfaces instead of being masked by
/// the scenario result.
pub async fn run_scenario<L>(
    mut session: DeviceSession<L>,
    plan: &ScenarioPlan,
    snapshot_root: &Path,
    log: &mut ScenarioLog,
) -> Result<CommandOutcome, Error>
where
    L: Transport + DeviceControl + 'static,
{
    let result = drive(&mut session, plan, snapshot_root, log).await;
    let teardown = session.close().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(teardown) = teardown {
                log::error!("session teardown also failed: {}", teardown);
            }
            return Err(e);
        }
    };
    teardown.map_err(|e| ScenarioError::SessionLifecycle(e.to_string()))?;

    Ok(outcome)
}

async fn drive<L>(
    session: &mut DeviceSession<L>,
    plan: &ScenarioPlan,
    snapshot_root: &Path,
    log: &mut ScenarioLog,
) -> Result<CommandOutcome, Error>
where
    L: Transport + DeviceControl + 'static,
{
    let baseline = session.screen().await?;
    log.step(StepRecord::info(
        "baseline",
        "captured the idle screen",
        Some(&baseline),
    ));

    if plan.approval.is_none() && plan.command.requires_confirmation() {
        log::warn!(
            "scenario '{}' needs on-device confirmation but has no approval plan",
            plan.name
        );
    }

    log::debug!("scenario '{}': issuing {:?}", plan.name, plan.command);
    // the command must be in flight before the screen poll starts: the
    // device does not leave the idle screen until it processes it
    let pending = session.issue(plan.command.clone())?;

    if let Some(approval) = &plan.approval {
        let navigation = async {
            let first = wait_for_screen_change(
                session.link().as_ref(),
                &baseline,
                Duration::from_millis(plan.nav_timeout_ms),
            )
            .await?;
            log.step(StepRecord::info(
                "review",
                "device left the idle screen",
                Some(&first),
            ));

            run_approval(session.link().as_ref(), approval, snapshot_root).await
        }
        .await;

        match navigation {
            Ok(walk) => {
                log.step(StepRecord::info(
                    "approval",
                    &format!(
                        "traversed {} screens, ended on position {}",
                        walk.traversed, walk.final_position
                    ),
                    None,
                ));
            }
            Err(e) => {
                pending.abandon();
                return Err(e);
            }
        }
    }

    let outcome = pending.outcome().await?;
    log.step(StepRecord::info(
        "outcome",
        &format!(
            "return_code=0x{:04X} ({})",
            outcome.return_code, outcome.error_message
        ),
        None,
    ));

    Ok(outcome)
}

/// Where scenarios get their device from.
#[derive(Clone, Debug)]
pub enum SessionFactory {
    Simulated(SimProfile),
    Emulator(DeviceConfig),
}

/// Per-test facade: owns the session factory, the snapshot scratch space
/// and the step log that feeds the HTML report.
pub struct ScenarioContext {
    factory: SessionFactory,
    snapshot_root: PathBuf,
    log: ScenarioLog,
}

impl ScenarioContext {
    pub fn new(factory: SessionFactory, snapshot_root: PathBuf) -> Self {
        ScenarioContext {
            factory,
            snapshot_root,
            log: ScenarioLog::default(),
        }
    }

    pub fn simulated(seed: &str, snapshot_root: PathBuf) -> Self {
        ScenarioContext::new(
            SessionFactory::Simulated(SimProfile::with_seed(seed)),
            snapshot_root,
        )
    }

    pub fn snapshot_root(&self) -> &Path {
        &self.snapshot_root
    }

    pub fn log(&self) -> &ScenarioLog {
        &self.log
    }

    /// Acquire a fresh session, run the scenario, release the session.
    pub async fn run_scenario(&mut self, plan: ScenarioPlan) -> Result<CommandOutcome, Error> {
        self.log.begin(&plan.name);
        let result = match &self.factory {
            SessionFactory::Simulated(profile) => {
                let session = DeviceSession::simulated(profile);
                run_scenario(session, &plan, &self.snapshot_root, &mut self.log).await
            }
            SessionFactory::Emulator(config) => match DeviceSession::start(config).await {
                Ok(session) => {
                    run_scenario(session, &plan, &self.snapshot_root, &mut self.log).await
                }
                Err(e) => Err(e),
            },
        };
        if let Err(e) = &result {
            self.log.fail(&e.to_string());
        }
        result
    }

    pub fn render_report(&self, to: &Path) -> Result<(), Error> {
        crate::report::render_report(to, &self.log)
    }
}
