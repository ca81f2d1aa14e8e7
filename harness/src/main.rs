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

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use clap::Parser;

use serde::{Deserialize, Deserializer};

use harness::scenario::{Command, CommandOutcome, ScenarioContext, ScenarioPlan, SessionFactory};
use harness::session::DeviceConfig;
use harness::sim::SimProfile;
use harness::verify::verify_signature;
use harness::{report, Error};

const DEFAULT_SEED: &str = "equip will roof matter pink blind book anxiety banner elbow sun young";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum HtmlReport {
    None,
    OnlyFailing,
    All,
}

/// Run scripted device scenarios from a directory of JSON files.
#[derive(Parser)]
struct Args {
    /// Directory containing *.json scenario files
    #[arg(long, default_value = "scenarios")]
    scenarios_dir: PathBuf,

    /// Emulator binary; without it the scenarios run against the
    /// in-process simulated device
    #[arg(long, requires = "app")]
    emulator: Option<PathBuf>,

    /// App image handed to the emulator
    #[arg(long, requires = "emulator")]
    app: Option<PathBuf>,

    /// Seed phrase the device is provisioned with
    #[arg(long, default_value = DEFAULT_SEED)]
    seed: String,

    #[arg(long, value_enum, default_value = "only-failing")]
    report: HtmlReport,

    /// Where snapshots and reports are written; a temp directory when
    /// omitted
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Fixed entropy for the emulator process
    #[arg(long)]
    entropy: Option<u64>,
}

/// One scenario file: the plan plus the assertions to run on its outcome.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(flatten)]
    plan: ScenarioPlan,
    #[serde(default)]
    expect: Expectations,
}

#[derive(Debug, Default, Deserialize)]
struct Expectations {
    #[serde(default, deserialize_with = "hex_code")]
    return_code: Option<u16>,
    error_message: Option<String>,
    address: Option<String>,
    pub_key: Option<String>,
    #[serde(default)]
    verify_signature: bool,
}

/// Return codes are written as "0x9000" in the fixtures.
fn hex_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(raw) => u16::from_str_radix(raw.trim_start_matches("0x"), 16)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(0) => {}
        Ok(failed) => {
            log::error!("{} scenario(s) failed", failed);
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Runner error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<usize, Error> {
    let scenarios = list_scenarios(&args.scenarios_dir).await?;
    if scenarios.is_empty() {
        return Err("No scenario files found".into());
    }

    let output_dir = output_dir(&args.output_dir);
    let factory = match (&args.emulator, &args.app) {
        (Some(emulator), Some(app)) => SessionFactory::Emulator(DeviceConfig {
            emulator: emulator.clone(),
            app: app.clone(),
            seed: args.seed.clone(),
            entropy: args.entropy,
        }),
        _ => SessionFactory::Simulated(SimProfile::with_seed(&args.seed)),
    };

    let mut failed = 0;
    for path in scenarios {
        let spec: ScenarioFile = serde_json::from_slice(&tokio::fs::read(&path).await?)?;
        let name = spec.plan.name.clone();
        log::info!("Running scenario '{}'", name);

        let mut context = ScenarioContext::new(factory.clone(), output_dir.join(&name));
        let result = execute(&mut context, spec).await;

        let pass = matches!(result, Ok(true));
        match &result {
            Ok(true) => log::info!("'{}' passed", name),
            Ok(false) => log::warn!("'{}' failed its expectations", name),
            Err(e) => log::warn!("'{}' errored: {}", name, e),
        }
        if !pass {
            failed += 1;
        }

        let render = match args.report {
            HtmlReport::All => true,
            HtmlReport::OnlyFailing => !pass,
            HtmlReport::None => false,
        };
        if render {
            let to = output_dir.join(format!("{}.html", name));
            report::render_report(&to, context.log())?;
        }
    }

    Ok(failed)
}

async fn execute(context: &mut ScenarioContext, spec: ScenarioFile) -> Result<bool, Error> {
    let ScenarioFile { plan, expect } = spec;

    // the signature check verifies under whatever key the device reports
    // for the scenario's path
    let pub_key = match (expect.verify_signature, &plan.command) {
        (
            true,
            Command::Sign {
                account,
                change,
                index,
                ..
            },
        ) => {
            let probe = ScenarioPlan::new(
                &format!("{}-pubkey", plan.name),
                Command::GetAddress {
                    account: *account,
                    change: *change,
                    index: *index,
                    require_confirmation: false,
                },
            );
            let outcome = context.run_scenario(probe).await?;
            outcome
                .address()
                .map(|(pub_key, _)| pub_key.to_string())
        }
        (true, _) => return Err("verify_signature requires a sign command".into()),
        _ => None,
    };

    let outcome = context.run_scenario(plan.clone()).await?;
    check(&plan, &expect, &outcome, pub_key.as_deref())
}

fn check(
    plan: &ScenarioPlan,
    expect: &Expectations,
    outcome: &CommandOutcome,
    pub_key: Option<&str>,
) -> Result<bool, Error> {
    let mut pass = true;

    if let Some(code) = expect.return_code {
        if outcome.return_code != code {
            log::warn!(
                "return_code: expected 0x{:04X}, got 0x{:04X}",
                code,
                outcome.return_code
            );
            pass = false;
        }
    }
    if let Some(message) = &expect.error_message {
        if &outcome.error_message != message {
            log::warn!(
                "error_message: expected {:?}, got {:?}",
                message,
                outcome.error_message
            );
            pass = false;
        }
    }
    if expect.pub_key.is_some() || expect.address.is_some() {
        let (pub_key, address) = outcome.address().ok_or("Expected an address payload")?;
        if let Some(expected) = &expect.pub_key {
            if pub_key != expected {
                log::warn!("pub_key: expected {}, got {}", expected, pub_key);
                pass = false;
            }
        }
        if let Some(expected) = &expect.address {
            if address != expected {
                log::warn!("address: expected {}, got {}", expected, address);
                pass = false;
            }
        }
    }
    if expect.verify_signature {
        let payload = match &plan.command {
            Command::Sign { payload, .. } => payload,
            _ => return Err("verify_signature requires a sign command".into()),
        };
        let signature = outcome.signature().ok_or("Expected a signature payload")?;
        let pub_key = hex::decode(pub_key.ok_or("No public key to verify against")?)?;
        if !verify_signature(signature, payload, &pub_key)? {
            log::warn!("signature does not verify against the approved payload");
            pass = false;
        }
    }

    Ok(pass)
}

async fn list_scenarios(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    if !dir.is_dir() {
        return Err("Invalid scenarios_dir".into());
    }

    let mut result = vec![];
    let mut stream = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = stream.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }

        if !entry
            .file_name()
            .into_string()
            .expect("Valid file name")
            .ends_with(".json")
        {
            continue;
        }

        result.push(entry.path());
    }
    result.sort();

    Ok(result)
}

fn output_dir(arg: &Option<PathBuf>) -> PathBuf {
    if let Some(dir) = arg {
        std::fs::create_dir_all(dir).expect("Can create the output dir");
        return dir.clone();
    }

    // n.b. static items do not call [`Drop`] on program termination, but
    // this is actually good for us because it means the artifacts survive
    // the run
    static TEMPDIR: OnceLock<tempdir::TempDir> = OnceLock::new();
    TEMPDIR
        .get_or_init(|| tempdir::TempDir::new("wallet-scenarios").expect("Can create temp directory"))
        .path()
        .to_path_buf()
}
