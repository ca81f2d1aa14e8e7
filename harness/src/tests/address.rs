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

use super::*;

use crate::sim::keys;

#[functional_test_wrapper::functional_test]
async fn test_get_address(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let outcome = context
        .run_scenario(ScenarioPlan::new("get_address", get_address_command(false)))
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    assert_eq!(outcome.error_message, "No errors");

    let (pub_key, address) = outcome.address().ok_or("No address payload")?;
    assert_eq!(pub_key.len(), 64);

    let raw: [u8; 32] = hex::decode(pub_key)?
        .as_slice()
        .try_into()
        .map_err(|_| "Bad public key length")?;
    assert_eq!(address, keys::ss58_encode(&raw));

    // a fresh session observes the same account
    let again = context
        .run_scenario(ScenarioPlan::new("get_address", get_address_command(false)))
        .await?;
    assert_eq!(outcome, again);

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_show_address(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let plain = context
        .run_scenario(ScenarioPlan::new("get_address", get_address_command(false)))
        .await?;

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("show_address", get_address_command(true))
                .with_approval(ApprovalPlan::accept("show_address", 3)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    assert_eq!(outcome.error_message, "No errors");
    // confirming on screen must not change what the device reports
    assert_eq!(outcome.address(), plain.address());

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_show_address_reject(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let outcome = context
        .run_scenario(
            ScenarioPlan::new("show_address_reject", get_address_command(true))
                .with_approval(ApprovalPlan::reject("show_address_reject", 4)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x6986);
    assert_eq!(outcome.error_message, "Transaction rejected");
    assert_eq!(outcome.payload, OutcomePayload::None);

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_snapshot_count_mismatch(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    // the accept walk traverses 3 screens; declaring 5 must fail
    let plan = ScenarioPlan::new("snapshot_count_mismatch", get_address_command(true))
        .with_approval(ApprovalPlan {
            script: ApprovalScript::accept(3),
            snapshots: Some(SnapshotSpec {
                name: "snapshot_count_mismatch".to_string(),
                expected: 5,
                reject_at: None,
            }),
        });

    let err = context
        .run_scenario(plan)
        .await
        .expect_err("the scenario must fail");

    match err.downcast_ref::<ScenarioError>() {
        Some(ScenarioError::SnapshotCountMismatch {
            expected: 5,
            actual: 3,
        }) => {}
        other => panic!("Unexpected error: {:?}", other),
    }

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_snapshots_are_persisted(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    context
        .run_scenario(
            ScenarioPlan::new("show_address", get_address_command(true))
                .with_approval(ApprovalPlan::accept("persisted", 3)),
        )
        .await?;

    let dir = context.snapshot_root().join("persisted");
    let mut files: Vec<_> = std::fs::read_dir(&dir)?
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(files, vec!["00000.png", "00001.png", "00002.png"]);

    Ok(())
}
