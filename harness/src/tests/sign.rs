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

use std::convert::TryFrom;

use super::*;

use client::SIG_SCHEME_ED25519;

use crate::verify::prehash_digest;

#[functional_test_wrapper::functional_test]
async fn test_sign_basic(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let pub_key = account_pub_key(context).await?;
    let payload = hex::decode(BASIC_TX)?;

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("sign_basic", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_basic", 8)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    assert_eq!(outcome.error_message, "No errors");

    let signature = outcome.signature().ok_or("No signature payload")?;
    assert_eq!(signature.len(), 65);
    assert_eq!(signature[0], SIG_SCHEME_ED25519);
    assert!(verify_signature(signature, &payload, &pub_key)?);

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_accept_shortcut(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let pub_key = account_pub_key(context).await?;
    let payload = hex::decode(BASIC_TX)?;

    let full = context
        .run_scenario(
            ScenarioPlan::new("sign_full_review", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_full_review", 8)),
        )
        .await?;

    let shortcut = context
        .run_scenario(
            ScenarioPlan::new("sign_shortcut", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::shortcut()),
        )
        .await?;

    // the approval path taken must not affect the cryptographic result
    assert_eq!(shortcut.return_code, 0x9000);
    assert_eq!(full.return_code, 0x9000);
    assert_eq!(full.signature(), shortcut.signature());
    assert!(verify_signature(
        shortcut.signature().ok_or("No signature payload")?,
        &payload,
        &pub_key
    )?);

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_forward_backward(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let payload = hex::decode(BASIC_TX)?;

    let forward = context
        .run_scenario(
            ScenarioPlan::new("sign_forward", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_forward", 8)),
        )
        .await?;

    // wandering backwards through the review pages only affects the
    // traversal, never the outcome
    let wandering = context
        .run_scenario(
            ScenarioPlan::new("sign_forward_backward", sign_command(payload))
                .with_approval(ApprovalPlan::forward_backward("sign_forward_backward", 8, 3)),
        )
        .await?;

    assert_eq!(wandering.return_code, 0x9000);
    assert_eq!(wandering.error_message, "No errors");
    assert_eq!(forward.signature(), wandering.signature());

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_reject(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let payload = hex::decode(BASIC_TX)?;

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("sign_reject", sign_command(payload))
                .with_approval(ApprovalPlan::reject("sign_reject", 9)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x6986);
    assert_eq!(outcome.error_message, "Transaction rejected");
    assert_eq!(outcome.signature(), None);

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_at_direct_limit(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let pub_key = account_pub_key(context).await?;
    let payload = vec![0x42u8; 256];

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("sign_at_direct_limit", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_at_direct_limit", 14)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    let signature = outcome.signature().ok_or("No signature payload")?;
    assert!(verify_signature(signature, &payload, &pub_key)?);

    // at exactly 256 bytes the device signs the raw payload, not a digest
    let public = ed25519_dalek::PublicKey::from_bytes(&pub_key)?;
    let proper = ed25519_dalek::Signature::try_from(&signature[1..])?;
    use ed25519_dalek::Verifier;
    assert!(public.verify(&payload, &proper).is_ok());
    assert!(public.verify(&prehash_digest(&payload)?, &proper).is_err());

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_sign_above_direct_limit(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let pub_key = account_pub_key(context).await?;
    let payload = vec![0x42u8; 257];

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("sign_above_direct_limit", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_above_direct_limit", 14)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    let signature = outcome.signature().ok_or("No signature payload")?;
    assert!(verify_signature(signature, &payload, &pub_key)?);

    // one byte past the limit the device signs the digest instead
    let public = ed25519_dalek::PublicKey::from_bytes(&pub_key)?;
    let proper = ed25519_dalek::Signature::try_from(&signature[1..])?;
    use ed25519_dalek::Verifier;
    assert!(public.verify(&prehash_digest(&payload)?, &proper).is_ok());
    assert!(public.verify(&payload, &proper).is_err());

    Ok(())
}

#[functional_test_wrapper::functional_test(timeout_secs = "120")]
async fn test_sign_large_nomination(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let pub_key = account_pub_key(context).await?;
    let payload = hex::decode(LARGE_NOMINATION_TX)?;
    assert_eq!(payload.len(), 593);

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("sign_large_nomination", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_large_nomination", 28)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    assert_eq!(outcome.error_message, "No errors");
    let signature = outcome.signature().ok_or("No signature payload")?;
    assert!(verify_signature(signature, &payload, &pub_key)?);

    Ok(())
}

#[functional_test_wrapper::functional_test(timeout_secs = "120")]
async fn test_sign_longest_review(context: &mut ScenarioContext) -> Result<(), crate::Error> {
    let pub_key = account_pub_key(context).await?;
    // 757 bytes of payload paginate into a 35-screen accept walk
    let payload: Vec<u8> = (0..757).map(|i| i as u8).collect();

    let outcome = context
        .run_scenario(
            ScenarioPlan::new("sign_longest_review", sign_command(payload.clone()))
                .with_approval(ApprovalPlan::accept("sign_longest_review", 35)),
        )
        .await?;

    assert_eq!(outcome.return_code, 0x9000);
    assert_eq!(outcome.error_message, "No errors");

    let signature = outcome.signature().ok_or("No signature payload")?;
    assert!(verify_signature(signature, &payload, &pub_key)?);

    // far past the limit the signature is over the digest, never the raw
    // payload
    let public = ed25519_dalek::PublicKey::from_bytes(&pub_key)?;
    let proper = ed25519_dalek::Signature::try_from(&signature[1..])?;
    use ed25519_dalek::Verifier;
    assert!(public.verify(&prehash_digest(&payload)?, &proper).is_ok());
    assert!(public.verify(&payload, &proper).is_err());

    Ok(())
}
