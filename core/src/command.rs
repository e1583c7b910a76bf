use serde::{Deserialize, Serialize};
use crate::types::EntityId;

/// All host-issued commands.
/// Variants are appended only — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    SetSpeed { speed: crate::clock::SimSpeed },

    // ── Transfers ─────────────────────────────────
    RequestOffload {
        signer:   String,
        #[serde(with = "crate::serde_u128_string")]
        receiver: EntityId,
        #[serde(with = "crate::serde_u128_string")]
        sender:   EntityId,
        indices:  Vec<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offload_command_parses_string_ids() {
        let raw = r#"{"cmd":"request_offload","signer":"0xabc",
                      "receiver":"340282366920938463463374607431768211455",
                      "sender":"7","indices":[0,2]}"#;
        let cmd: PlayerCommand = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            cmd,
            PlayerCommand::RequestOffload {
                signer:   "0xabc".into(),
                receiver: u128::MAX,
                sender:   7,
                indices:  vec![0, 2],
            }
        );
    }
}
