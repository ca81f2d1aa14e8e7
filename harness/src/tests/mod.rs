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
use std::sync::{Once, OnceLock};

use crate::approval::{ApprovalPlan, ApprovalScript, SnapshotSpec};
use crate::scenario::{Command, OutcomePayload, ScenarioContext, ScenarioError, ScenarioPlan};
use crate::verify::verify_signature;

mod address;
mod sign;

pub(crate) static INIT_LOG: Once = Once::new();

/// Seed phrase every scenario uses unless a test overrides it.
pub(crate) const TEST_SEED: &str =
    "equip will roof matter pink blind book anxiety banner elbow sun young";

pub(crate) const HARDENED: u32 = 0x8000_0000;

/// 120-byte balance transfer used by the basic signing cases.
pub(crate) const BASIC_TX: &str = "05005cd6daea110119e757f4af9ad9fc0cdc7d4d6380ca0009169c9b7b1c909c20248ed73e0dd503040b63ce64c10c05170000000500000091b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c391b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";

/// 593-byte nomination, large enough to trip the pre-hash rule.
pub(crate) const LARGE_NOMINATION_TX: &str = "07054026951b3286754fa7c9138b97e43cf0688b8e7a63edb63a79bcbc624bd534db2764de55acce68b57f853a486692609b81974d730449c272b466b7423752acdc2f3659bd3d1584f3b31261fbb0f9718a3031db1ffd6e15d2cad5e1cc67303802290cf166640c67010f7b253f176449bfb9578b4f545e115e28590a0145beb2be7da0ba634ed63f424e321d4a69aa8c80b9d53733b356e51a9413adc7dd5b56901274856fc73b6f71968133674ddd8fcb1ddc8e26f8e59f45334c14727411db5d3cb0a1c57153b1dcea8783d1eafd6de7f0a039fe9b66c76be7b9e7b95d14923d55ba5db57dcd5e8c54321df0e70670243be1634233ecc5708031efbbafd9e1676cb68cb8c024fdbe85995072874b6f6248da7b603724f225a2ca46319f7f8970688ec7826410f60a71fdd095ad2557f4ea8ea3c49187b502fa8dc753862775107afcebb20575eb7d25efc9b1abf206f1fd8c5f160d9aec935e24546bf265fb0b1cc0cfc577a00be15abce98ee0942047e612295f26b42a022e982749fbe2138b6daada43755b2a7b888db0d43caf60e4cac7a587d532097324bf44f57fc75ba24b541f6c230c5fc829843e33d81e2a211e5765fdcfd17f01cc7351ce0a5aa58771d414fa05274ebfb36fa34baaa5a25ff6bb063e8d6ce621c0ea9088aab74de6326007dd05c846e9523d9e6d42b5dce339a3a517abaeceb5565c11f589d2529562d5038d246d0f1a0000000500000091b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c391b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";

pub(crate) fn report_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REPORT_TMP_DIR") {
        let path = PathBuf::from(&dir);
        if !path.exists() {
            std::fs::create_dir_all(&path).expect("Can create the report dir");
        }

        path
    } else {
        // n.b. static items do not call [`Drop`] on program termination, but this is
        // actually good for us because it means the tempdir will be kept
        static TEMPDIR: OnceLock<tempdir::TempDir> = OnceLock::new();
        TEMPDIR
            .get_or_init(|| {
                tempdir::TempDir::new("wallet-func-tests").expect("Can create temp directory")
            })
            .path()
            .to_path_buf()
    }
}

pub(crate) fn snapshot_root(test: &str) -> PathBuf {
    report_dir().join(test)
}

pub(crate) fn get_address_command(require_confirmation: bool) -> Command {
    Command::GetAddress {
        account: HARDENED,
        change: HARDENED,
        index: HARDENED,
        require_confirmation,
    }
}

pub(crate) fn sign_command(payload: Vec<u8>) -> Command {
    Command::Sign {
        account: HARDENED,
        change: HARDENED,
        index: HARDENED,
        payload,
    }
}

/// Fetch the account's public key without touching the UI.
pub(crate) async fn account_pub_key(context: &mut ScenarioContext) -> Result<Vec<u8>, crate::Error> {
    let outcome = context
        .run_scenario(ScenarioPlan::new("pubkey-probe", get_address_command(false)))
        .await?;
    let (pub_key, _) = outcome.address().ok_or("No address payload")?;
    Ok(hex::decode(pub_key)?)
}
