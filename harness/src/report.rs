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

use std::fs::File;
use std::path::Path;

use handlebars::Handlebars;

use serde::Serialize;

use crate::snapshot::Snapshot;
use crate::Error;

pub const HB_TEMPLATE: &str = include_str!("../report.hb");

/// Step-by-step record of a scenario run, rendered into the HTML report.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScenarioLog {
    pub result: bool, // used in the Handlebars template
    pub steps: Vec<StepRecord>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub label: String,
    pub detail: String,
    /// Base64 PNG of the screen at this step, when one was captured.
    pub snapshot: Option<String>,
    pub pass: bool,
}

impl StepRecord {
    pub fn info(label: &str, detail: &str, snapshot: Option<&Snapshot>) -> Self {
        StepRecord {
            label: label.to_string(),
            detail: detail.to_string(),
            snapshot: snapshot.map(Snapshot::to_base64),
            pass: true,
        }
    }
}

impl ScenarioLog {
    pub fn begin(&mut self, name: &str) {
        self.result = true;
        self.steps.push(StepRecord::info("scenario", name, None));
    }

    pub fn step(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn fail(&mut self, detail: &str) {
        self.result = false;
        self.steps.push(StepRecord {
            label: "failure".to_string(),
            detail: detail.to_string(),
            snapshot: None,
            pass: false,
        });
    }
}

pub fn render_report(to: &Path, log: &ScenarioLog) -> Result<(), Error> {
    let mut hb = Handlebars::new();
    hb.register_template_string("report", HB_TEMPLATE)?;

    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = File::create(to)?;
    hb.render_to_write("report", log, writer)?;

    log::info!("Rendered report to: {}", to.display());

    Ok(())
}
