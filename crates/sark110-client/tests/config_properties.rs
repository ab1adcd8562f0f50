//! Property tests for retry planning and config serialization.

use proptest::prelude::*;
use sark110_client::{ExchangePlan, RetryPolicy, SessionConfig};
use sark110_transport::TransportKind;

fn policy() -> impl Strategy<Value = RetryPolicy> {
    (1u32..10, 1u32..10, 1u32..10, 1u32..10, 0u64..500).prop_map(
        |(hid, inner, outer, version_outer, delay)| RetryPolicy {
            hid_attempts: hid,
            ble_inner_attempts: inner,
            ble_outer_attempts: outer,
            ble_version_outer_attempts: version_outer,
            ble_reconnect_delay_ms: delay,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_plan_budget_matches_policy(policy in policy(), opcode in any::<u8>()) {
        let version = opcode == 1;
        prop_assert_eq!(policy.plan_for(TransportKind::Socket, opcode), ExchangePlan::Single);
        prop_assert_eq!(
            policy.plan_for(TransportKind::Hid, opcode).max_attempts(),
            policy.hid_attempts
        );
        let outer = if version {
            policy.ble_version_outer_attempts
        } else {
            policy.ble_outer_attempts
        };
        prop_assert_eq!(
            policy.plan_for(TransportKind::Ble, opcode).max_attempts(),
            policy.ble_inner_attempts * outer
        );
    }

    #[test]
    fn prop_valid_config_survives_json(policy in policy(), max_devices in 1usize..8) {
        let config = SessionConfig::new()
            .with_retry(policy)
            .with_max_devices(max_devices);
        prop_assert!(config.validate().is_ok());

        let json = serde_json::to_string(&config).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let back: SessionConfig =
            serde_json::from_str(&json).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(back, config);
    }
}
