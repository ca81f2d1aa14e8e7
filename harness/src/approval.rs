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

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scenario::ScenarioError;
use crate::session::{Button, DeviceControl};
use crate::snapshot::Snapshot;
use crate::sync::POLL_INTERVAL;
use crate::Error;

/// One step of a walk through the device's review flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationAction {
    AdvanceRight,
    AdvanceLeft,
    /// Dual-press gesture: resolves the highlighted choice, or jumps
    /// straight to the approve choice from inside the review pages.
    Confirm,
}

/// Scripted action sequence, supplied per scenario. Only meaningful while
/// a confirmation-requiring command is outstanding; running one against an
/// idle device is a scenario-authoring error, not a harness failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalScript(pub Vec<NavigationAction>);

impl ApprovalScript {
    fn advance(screens: usize) -> Vec<NavigationAction> {
        vec![NavigationAction::AdvanceRight; screens.saturating_sub(1)]
    }

    /// Page forward until the approve choice, `screens` positions in
    /// total. The closing gesture is issued by the driver.
    pub fn accept(screens: usize) -> Self {
        ApprovalScript(Self::advance(screens))
    }

    /// Page one position past the approve choice, onto the reject choice.
    pub fn reject(screens: usize) -> Self {
        ApprovalScript(Self::advance(screens))
    }

    /// Page forward, wander `back` positions backwards, then return to the
    /// approve choice.
    pub fn forward_backward(screens: usize, back: usize) -> Self {
        let mut actions = Self::advance(screens);
        actions.extend(vec![NavigationAction::AdvanceLeft; back]);
        actions.extend(vec![NavigationAction::AdvanceRight; back]);
        ApprovalScript(actions)
    }

    /// Dual-press twice: jump to the approve choice, then take it.
    pub fn shortcut() -> Self {
        ApprovalScript(vec![NavigationAction::Confirm, NavigationAction::Confirm])
    }
}

/// Snapshot capture settings for an approval walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSpec {
    /// Directory name for the persisted sequence.
    pub name: String,
    /// Number of distinct screen positions the walk must traverse.
    pub expected: usize,
    /// Position the walk must be parked on when it ends in a rejection.
    #[serde(default)]
    pub reject_at: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPlan {
    pub script: ApprovalScript,
    #[serde(default)]
    pub snapshots: Option<SnapshotSpec>,
}

impl ApprovalPlan {
    pub fn accept(name: &str, screens: usize) -> Self {
        ApprovalPlan {
            script: ApprovalScript::accept(screens),
            snapshots: Some(SnapshotSpec {
                name: name.to_string(),
                expected: screens,
                reject_at: None,
            }),
        }
    }

    pub fn reject(name: &str, screens: usize) -> Self {
        ApprovalPlan {
            script: ApprovalScript::reject(screens),
            snapshots: Some(SnapshotSpec {
                name: name.to_string(),
                expected: screens,
                reject_at: Some(screens.saturating_sub(1)),
            }),
        }
    }

    pub fn forward_backward(name: &str, screens: usize, back: usize) -> Self {
        ApprovalPlan {
            script: ApprovalScript::forward_backward(screens, back),
            snapshots: Some(SnapshotSpec {
                name: name.to_string(),
                expected: screens,
                reject_at: None,
            }),
        }
    }

    pub fn shortcut() -> Self {
        ApprovalPlan {
            script: ApprovalScript::shortcut(),
            snapshots: None,
        }
    }
}

/// What an approval walk actually did.
#[derive(Clone, Copy, Debug)]
pub struct ApprovalOutcome {
    /// Distinct screen positions visited.
    pub traversed: usize,
    /// Position the walk ended on.
    pub final_position: usize,
}

/// Execute the scripted actions strictly in order. With a snapshot spec
/// the driver captures one snapshot per screen position (revisits
/// overwrite), persists the sequence, checks the traversed count and
/// closes the walk with the accept/reject gesture.
pub async fn run_approval<L: DeviceControl>(
    link: &L,
    plan: &ApprovalPlan,
    snapshot_root: &Path,
) -> Result<ApprovalOutcome, Error> {
    let mut position = 0usize;
    let mut captured: BTreeMap<usize, Snapshot> = BTreeMap::new();

    if plan.snapshots.is_some() {
        captured.insert(position, link.screen().await?);
    }

    for action in &plan.script.0 {
        log::debug!("approval action: {:?}", action);

        let previous = captured.get(&position).cloned();
        match action {
            NavigationAction::AdvanceRight => {
                link.press(Button::Right).await?;
                position += 1;
            }
            NavigationAction::AdvanceLeft => {
                link.press(Button::Left).await?;
                position = position.saturating_sub(1);
            }
            NavigationAction::Confirm => {
                link.press(Button::Both).await?;
            }
        }

        if plan.snapshots.is_some() && !matches!(action, NavigationAction::Confirm) {
            let snapshot = settled_screen(link, previous.as_ref()).await?;
            captured.insert(position, snapshot);
        } else {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    if let Some(spec) = &plan.snapshots {
        for (index, snapshot) in &captured {
            let to = snapshot_root
                .join(&spec.name)
                .join(format!("{:05}.png", index));
            snapshot.save(&to)?;
        }

        if captured.len() != spec.expected {
            return Err(ScenarioError::SnapshotCountMismatch {
                expected: spec.expected,
                actual: captured.len(),
            }
            .into());
        }
        if let Some(reject_at) = spec.reject_at {
            if position != reject_at {
                return Err(format!(
                    "reject gesture would land on screen {} instead of {}",
                    position, reject_at
                )
                .into());
            }
        }

        // the walk parked on the approve or reject choice; the closing
        // dual press resolves it
        link.press(Button::Both).await?;
    }

    Ok(ApprovalOutcome {
        traversed: captured.len(),
        final_position: position,
    })
}

/// Sample the screen after a press, giving the device a bounded window to
/// redraw. A press clamped at either end of the flow legitimately leaves
/// the screen unchanged.
async fn settled_screen<L: DeviceControl>(
    link: &L,
    previous: Option<&Snapshot>,
) -> Result<Snapshot, Error> {
    for _ in 0..8 {
        let current = link.screen().await?;
        match previous {
            Some(previous) if current == *previous => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            _ => return Ok(current),
        }
    }
    link.screen().await
}
