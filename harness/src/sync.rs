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

use std::time::Duration;

use crate::scenario::ScenarioError;
use crate::session::DeviceControl;
use crate::snapshot::Snapshot;
use crate::Error;

/// Pace of the screen polling loop. Short enough to catch every page of a
/// review flow, long enough to let the device task make progress on a
/// single-threaded runtime.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Wait until the device shows something other than `baseline` and return
/// the first differing snapshot. Only the calling task suspends; a
/// concurrently outstanding command keeps progressing.
pub async fn wait_for_screen_change<L: DeviceControl>(
    link: &L,
    baseline: &Snapshot,
    timeout: Duration,
) -> Result<Snapshot, Error> {
    let wait = async {
        loop {
            let current = link.screen().await?;
            if current != *baseline {
                break Ok::<_, Error>(current);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(ScenarioError::NavigationTimeout {
            waited_ms: timeout.as_millis() as u64,
        }
        .into()),
    }
}
