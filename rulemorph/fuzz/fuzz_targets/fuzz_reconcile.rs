#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemorph::reconcile::is_correct;
use rulemorph::{reconcile, Reconciliation};
use serde_json::Value;

fuzz_target!(|input: (u32, u32, u32)| {
    let (q, u, t) = input;
    let (q, u, t) = (Value::from(q % 100_000), Value::from(u % 100_000), Value::from(t % 1_000_000));

    if let Reconciliation::Corrected(correction) = reconcile(&q, &u, &t) {
        let _ = is_correct(
            correction.quantity,
            correction.unit_price,
            correction.total_price,
        );
    }
});
