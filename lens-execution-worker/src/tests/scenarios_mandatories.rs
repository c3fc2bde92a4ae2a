// Copyright (c) 2022 MASSA LABS <info@massa.net>

use super::*;
use crate::runner_thread::start_runner_worker;
use lens_execution_exports::{
    CachePolicy, ExecutionError, FieldKind, ModelApi, ModelCall, Schema, SeriesRequest, WindowSpec,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A model echoing its pinned coordinates, used to observe what a body sees
fn echo_body() -> Arc<dyn ModelBody> {
    Arc::new(|api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
        Ok(json!({
            "chain_id": api.chain_id(),
            "height": api.block().height,
            "block_timestamp": api.block().timestamp,
            "depth": api.depth(),
            "run_id": api.run_id().to_string(),
            "from_block": api.from_block().map(|b| b.height),
            "input": input,
        }))
    })
}

#[test]
fn test_run_executes_at_resolved_height() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_run(base_request("coords.echo", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.block.height, 500);
    assert_eq!(outcome.output["height"], json!(500));
    assert_eq!(outcome.output["depth"], json!(0));
    assert_eq!(outcome.output["run_id"], json!(outcome.run_id.to_string()));
}

#[test]
fn test_run_is_deterministic_across_runs() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    // the run id is part of the echoed output, so pin it: everything else
    // about the two runs must then be byte-identical
    let mut req = base_request("coords.echo", BlockSpec::Number(500));
    req.run_id = Some(lens_models::RunId::generate());
    let first = engine.execute_run(req.clone()).unwrap();
    let second = engine.execute_run(req).unwrap();
    assert_eq!(first.run_id, second.run_id);
    assert_eq!(first.output, second.output);
}

#[test]
fn test_timestamp_resolves_at_or_before() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    // between blocks 41 and 42: resolves to 41
    let ts = LensTime::from_millis(GENESIS + 41 * PERIOD + PERIOD / 2);
    let outcome = engine
        .execute_run(base_request("coords.echo", BlockSpec::at_timestamp(ts)))
        .unwrap();
    assert_eq!(outcome.block.height, 41);
    assert_eq!(
        outcome.block.timestamp,
        LensTime::from_millis(GENESIS + 41 * PERIOD)
    );
}

#[test]
fn test_timestamp_resolution_is_monotonic() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let offsets = [0, 499, 500, 999, 1000, 1001, 2499, 2500];
    let mut heights = Vec::new();
    for offset in offsets {
        let ts = LensTime::from_millis(GENESIS + offset);
        let outcome = engine
            .execute_run(base_request("coords.echo", BlockSpec::at_timestamp(ts)))
            .unwrap();
        heights.push(outcome.block.height);
    }
    // later timestamps never resolve to earlier blocks
    assert!(heights.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(heights, vec![0, 0, 0, 0, 1, 1, 2, 2]);
}

#[test]
fn test_sample_resolution_is_deterministic_against_unchanged_tip() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let ts = LensTime::from_millis(GENESIS + 41 * PERIOD + PERIOD / 2);
    let req = base_request("coords.echo", BlockSpec::at_timestamp(ts));
    let first = engine.execute_run(req.clone()).unwrap();
    let second = engine.execute_run(req).unwrap();
    assert_eq!(first.block, second.block);
}

#[test]
fn test_far_future_timestamp_clamps_to_head() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let ts = LensTime::from_millis(GENESIS + 100 * HEAD * PERIOD);
    let outcome = engine
        .execute_run(base_request("coords.echo", BlockSpec::at_timestamp(ts)))
        .unwrap();
    assert_eq!(outcome.block.height, HEAD);
}

#[test]
fn test_block_beyond_head_is_an_error() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let err = engine
        .execute_run(base_request("coords.echo", BlockSpec::Number(HEAD + 1)))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::BlockResolution(_)));
}

#[test]
fn test_pinned_triple_resolves_by_height_with_canonical_timestamp() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    // the carried timestamps are the caller's observation and may be wrong;
    // the resolved block still gets the chain's canonical timestamp
    let outcome = engine
        .execute_run(base_request(
            "coords.echo",
            BlockSpec::Pinned {
                number: 500,
                timestamp: LensTime::from_millis(123),
                sample_timestamp: LensTime::from_millis(456),
            },
        ))
        .unwrap();
    assert_eq!(outcome.block.height, 500);
    assert_eq!(
        outcome.block.timestamp,
        LensTime::from_millis(GENESIS + 500 * PERIOD)
    );
}

#[test]
fn test_pinned_triple_beyond_head_is_an_error() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let err = engine
        .execute_run(base_request(
            "coords.echo",
            BlockSpec::Pinned {
                number: HEAD + 1,
                timestamp: LensTime::from_millis(GENESIS),
                sample_timestamp: LensTime::from_millis(GENESIS),
            },
        ))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::BlockResolution(_)));
}

#[test]
fn test_nested_call_inherits_block_at_depth_plus_one() {
    let parent = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            let child = api.run_model(ModelCall::new(slug("coords.echo"), Value::Null))?;
            Ok(json!({
                "depth": api.depth(),
                "run_id": api.run_id().to_string(),
                "child": child,
            }))
        },
    );
    let engine = engine(
        registry_with(vec![
            descriptor("coords.echo", "1.0.0", echo_body()),
            descriptor("parent.echo", "1.0.0", parent),
        ]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_run(base_request("parent.echo", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.output["depth"], json!(0));
    assert_eq!(outcome.output["child"]["depth"], json!(1));
    // the child observes the same snapshot and the same run identity
    assert_eq!(outcome.output["child"]["height"], json!(500));
    assert_eq!(outcome.output["child"]["run_id"], outcome.output["run_id"]);
}

#[test]
fn test_block_override_does_not_affect_siblings() {
    let parent = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            let pinned = api.run_model(
                ModelCall::new(slug("coords.echo"), Value::Null)
                    .at_block(BlockSpec::Number(400)),
            )?;
            let sibling = api.run_model(ModelCall::new(slug("coords.echo"), Value::Null))?;
            Ok(json!({ "pinned": pinned, "sibling": sibling }))
        },
    );
    let engine = engine(
        registry_with(vec![
            descriptor("coords.echo", "1.0.0", echo_body()),
            descriptor("parent.echo", "1.0.0", parent),
        ]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_run(base_request("parent.echo", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.output["pinned"]["height"], json!(400));
    assert_eq!(outcome.output["sibling"]["height"], json!(500));
}

#[test]
fn test_chain_override_resolves_at_same_instant() {
    let chain_state = mock_chain_state();
    // a second chain with a slower block production
    chain_state.add_chain(
        ChainId(2),
        LensTime::from_millis(GENESIS),
        LensTime::from_millis(2 * PERIOD),
        HEAD,
    );
    let parent = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            api.run_model(ModelCall::new(slug("coords.echo"), Value::Null).on_chain(ChainId(2)))
        },
    );
    let engine = engine(
        registry_with(vec![
            descriptor("coords.echo", "1.0.0", echo_body()),
            descriptor("parent.echo", "1.0.0", parent),
        ]),
        chain_state,
    );
    let outcome = engine
        .execute_run(base_request("parent.echo", BlockSpec::Number(100)))
        .unwrap();
    // chain 2 runs at half the pace: the block at chain 1's block-100 instant is 50
    assert_eq!(outcome.output["chain_id"], json!(2));
    assert_eq!(outcome.output["height"], json!(50));
}

#[test]
fn test_mutual_recursion_hits_depth_ceiling() {
    let ping = Arc::new(
        |api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
            api.run_model(ModelCall::new(slug("pong"), input.clone()))
        },
    );
    let pong = Arc::new(
        |api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
            api.run_model(ModelCall::new(slug("ping"), input.clone()))
        },
    );
    let engine = engine(
        registry_with(vec![
            descriptor("ping", "1.0.0", ping),
            descriptor("pong", "1.0.0", pong),
        ]),
        mock_chain_state(),
    );
    let err = engine
        .execute_run(base_request("ping", BlockSpec::Number(500)))
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::RecursionLimitExceeded { .. }
    ));
}

#[test]
fn test_self_recursive_model_terminates_with_depth_error() {
    // every frame of the cycle shares one fingerprint (same slug, version,
    // chain, block, input): the run must still terminate at the depth
    // ceiling instead of waiting on its own in-flight computation
    let looping = Arc::new(
        |api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
            api.run_model(ModelCall::new(slug("loop"), input.clone()))
        },
    );
    let engine = engine(
        registry_with(vec![descriptor("loop", "1.0.0", looping)]),
        mock_chain_state(),
    );
    let err = engine
        .execute_run(base_request("loop", BlockSpec::Number(500)))
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::RecursionLimitExceeded { .. }
    ));
}

#[test]
fn test_external_depth_counts_against_the_ceiling() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let mut req = base_request("coords.echo", BlockSpec::Number(500));
    req.depth = ExecutionConfig::default().max_depth + 1;
    let err = engine.execute_run(req).unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::RecursionLimitExceeded { .. }
    ));
}

fn counting_body(counter: Arc<AtomicU64>) -> Arc<dyn ModelBody> {
    Arc::new(move |_api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "input": input }))
    })
}

/// A parent invoking "counted" twice with the inputs it receives
fn twice_body() -> Arc<dyn ModelBody> {
    Arc::new(|api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
        let first = api.run_model(ModelCall::new(slug("counted"), input["first"].clone()))?;
        let second = api.run_model(ModelCall::new(slug("counted"), input["second"].clone()))?;
        Ok(json!({ "first": first, "second": second }))
    })
}

#[test]
fn test_identical_invocations_execute_once_per_run() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![
            descriptor("counted", "1.0.0", counting_body(counter.clone())),
            descriptor("twice", "1.0.0", twice_body()),
        ]),
        mock_chain_state(),
    );
    let mut req = base_request("twice", BlockSpec::Number(500));
    req.input = json!({ "first": {"a": 1}, "second": {"a": 1} });
    engine.execute_run(req).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_distinct_inputs_are_distinct_fingerprints() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![
            descriptor("counted", "1.0.0", counting_body(counter.clone())),
            descriptor("twice", "1.0.0", twice_body()),
        ]),
        mock_chain_state(),
    );
    let mut req = base_request("twice", BlockSpec::Number(500));
    req.input = json!({ "first": {"a": 1}, "second": {"a": 2} });
    engine.execute_run(req).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_memoization_does_not_leak_across_runs() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![descriptor(
            "counted",
            "1.0.0",
            counting_body(counter.clone()),
        )]),
        mock_chain_state(),
    );
    let mut req = base_request("counted", BlockSpec::Number(500));
    req.input = json!({"a": 1});
    engine.execute_run(req.clone()).unwrap();
    engine.execute_run(req).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_bypass_read_recomputes_within_a_run() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![
            descriptor("counted", "1.0.0", counting_body(counter.clone())),
            descriptor("twice", "1.0.0", twice_body()),
        ]),
        mock_chain_state(),
    );
    let mut req = base_request("twice", BlockSpec::Number(500));
    req.input = json!({ "first": {"a": 1}, "second": {"a": 1} });
    req.cache_policy = CachePolicy::BypassRead;
    engine.execute_run(req).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_skip_write_leaves_nothing_to_hit() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![
            descriptor("counted", "1.0.0", counting_body(counter.clone())),
            descriptor("twice", "1.0.0", twice_body()),
        ]),
        mock_chain_state(),
    );
    let mut req = base_request("twice", BlockSpec::Number(500));
    req.input = json!({ "first": {"a": 1}, "second": {"a": 1} });
    req.cache_policy = CachePolicy::SkipWrite;
    engine.execute_run(req).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_recursion_failure_does_not_poison_shallower_invocations() {
    // "leaf" needs one level of nesting below itself. Invoked at depth 2
    // under a ceiling of 2 it fails with RecursionLimitExceeded; the same
    // fingerprint invoked afterwards at depth 1 in the same run must
    // recompute and succeed rather than replay the positional failure.
    let noop = Arc::new(
        |_api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            Ok(json!({"ok": true}))
        },
    );
    let leaf = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            api.run_model(ModelCall::new(slug("noop"), Value::Null))
        },
    );
    let deep = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            api.run_model(ModelCall::new(slug("leaf"), Value::Null))
        },
    );
    let orchestrator = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            let first = api.run_model(ModelCall::new(slug("deep"), Value::Null));
            assert!(matches!(
                first,
                Err(ExecutionError::RecursionLimitExceeded { .. })
            ));
            let second = api.run_model(ModelCall::new(slug("leaf"), Value::Null))?;
            Ok(json!({ "second": second }))
        },
    );
    let config = ExecutionConfig {
        max_depth: 2,
        ..Default::default()
    };
    let engine = RunEngine::new(
        config,
        registry_with(vec![
            descriptor("noop", "1.0.0", noop),
            descriptor("leaf", "1.0.0", leaf),
            descriptor("deep", "1.0.0", deep),
            descriptor("orchestrator", "1.0.0", orchestrator),
        ]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_run(base_request("orchestrator", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.output["second"]["ok"], json!(true));
}

#[test]
fn test_key_order_does_not_change_the_fingerprint() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![
            descriptor("counted", "1.0.0", counting_body(counter.clone())),
            descriptor("twice", "1.0.0", twice_body()),
        ]),
        mock_chain_state(),
    );
    let mut req = base_request("twice", BlockSpec::Number(500));
    req.input = json!({
        "first": {"a": 1, "b": 2},
        "second": {"b": 2, "a": 1},
    });
    engine.execute_run(req).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_identical_invocations_coalesce() {
    let counter = Arc::new(AtomicU64::new(0));
    let slow_counted = {
        let counter = counter.clone();
        Arc::new(
            move |_api: &dyn ModelApi, input: &Value| -> Result<Value, ExecutionError> {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Ok(json!({ "input": input }))
            },
        )
    };
    // fans the same nested call out to two threads at once
    let fan_out = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            let (first, second) = std::thread::scope(|s| {
                let first = s.spawn(|| api.run_model(ModelCall::new(slug("counted"), json!({"a": 1}))));
                let second = s.spawn(|| api.run_model(ModelCall::new(slug("counted"), json!({"a": 1}))));
                (
                    first.join().expect("sibling thread panicked"),
                    second.join().expect("sibling thread panicked"),
                )
            });
            let first = first?;
            let second = second?;
            assert_eq!(first, second);
            Ok(json!({ "first": first, "second": second }))
        },
    );
    let engine = engine(
        registry_with(vec![
            descriptor("counted", "1.0.0", slow_counted),
            descriptor("fan.out", "1.0.0", fan_out),
        ]),
        mock_chain_state(),
    );
    engine
        .execute_run(base_request("fan.out", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unspecified_version_runs_the_latest() {
    let versioned = |tag: &'static str| -> Arc<dyn ModelBody> {
        Arc::new(
            move |_api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
                Ok(json!({ "version": tag }))
            },
        )
    };
    let engine = engine(
        registry_with(vec![
            descriptor("pick.me", "1.0.0", versioned("1.0.0")),
            descriptor("pick.me", "2.1.0", versioned("2.1.0")),
        ]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_run(base_request("pick.me", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.output["version"], json!("2.1.0"));

    let mut pinned = base_request("pick.me", BlockSpec::Number(500));
    pinned.version = Some(version("1.0.0"));
    let outcome = engine.execute_run(pinned).unwrap();
    assert_eq!(outcome.output["version"], json!("1.0.0"));
}

#[test]
fn test_unknown_model_is_not_found() {
    let engine = engine(registry_with(vec![]), mock_chain_state());
    let err = engine
        .execute_run(base_request("missing.model", BlockSpec::Number(500)))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::ModelNotFound(_)));
}

#[test]
fn test_input_schema_rejects_before_execution() {
    let counter = Arc::new(AtomicU64::new(0));
    let strict = descriptor("strict", "1.0.0", counting_body(counter.clone()))
        .with_input_schema(Schema::object([("address", FieldKind::String)]));
    let engine = engine(registry_with(vec![strict]), mock_chain_state());
    let mut req = base_request("strict", BlockSpec::Number(500));
    req.input = json!({});
    let err = engine.execute_run(req).unwrap_err();
    assert!(matches!(err, ExecutionError::InputValidation(_)));
    // the body never ran
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_output_schema_rejects_nonconforming_output() {
    let bad = Arc::new(
        |_api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> { Ok(json!(42)) },
    );
    let strict = descriptor("strict", "1.0.0", bad)
        .with_output_schema(Schema::object([("price", FieldKind::Number)]));
    let engine = engine(registry_with(vec![strict]), mock_chain_state());
    let err = engine
        .execute_run(base_request("strict", BlockSpec::Number(500)))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::OutputValidation(_)));
}

#[test]
fn test_panicking_body_is_contained() {
    let panicking = Arc::new(
        |_api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            panic!("boom");
        },
    );
    let engine = engine(
        registry_with(vec![
            descriptor("panics", "1.0.0", panicking),
            descriptor("coords.echo", "1.0.0", echo_body()),
        ]),
        mock_chain_state(),
    );
    let err = engine
        .execute_run(base_request("panics", BlockSpec::Number(500)))
        .unwrap_err();
    match err {
        ExecutionError::ModelRun(msg) => assert!(msg.contains("boom")),
        other => panic!("unexpected error: {}", other),
    }
    // the engine survives a panicking body
    engine
        .execute_run(base_request("coords.echo", BlockSpec::Number(500)))
        .unwrap();
}

#[test]
fn test_chain_read_routes_through_provider_map() {
    let reader = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            api.chain_read("eth_call", &json!({"to": "0xabc"}))
        },
    );
    let engine = engine(
        registry_with(vec![descriptor("reader", "1.0.0", reader)]),
        mock_chain_state(),
    );

    let outcome = engine
        .execute_run(base_request("reader", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.output["provider_url"], Value::Null);
    assert_eq!(outcome.output["height"], json!(500));
    assert_eq!(outcome.output["method"], json!("eth_call"));

    let mut routed = base_request("reader", BlockSpec::Number(500));
    routed.provider_map = Some(
        [(CHAIN, "https://archive.example".to_string())]
            .into_iter()
            .collect(),
    );
    let outcome = engine.execute_run(routed).unwrap();
    assert_eq!(outcome.output["provider_url"], json!("https://archive.example"));
}

#[test]
fn test_run_provider_map_wins_over_configured_default() {
    let reader = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            api.chain_read("eth_call", &json!({}))
        },
    );
    let config = ExecutionConfig {
        default_provider_map: [(CHAIN, "https://default.example".to_string())]
            .into_iter()
            .collect(),
        ..Default::default()
    };
    let engine = RunEngine::new(
        config,
        registry_with(vec![descriptor("reader", "1.0.0", reader)]),
        mock_chain_state(),
    );

    let outcome = engine
        .execute_run(base_request("reader", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.output["provider_url"], json!("https://default.example"));

    let mut routed = base_request("reader", BlockSpec::Number(500));
    routed.provider_map = Some(
        [(CHAIN, "https://override.example".to_string())]
            .into_iter()
            .collect(),
    );
    let outcome = engine.execute_run(routed).unwrap();
    assert_eq!(outcome.output["provider_url"], json!("https://override.example"));
}

#[test]
fn test_from_block_is_visible_to_the_body() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let mut req = base_request("coords.echo", BlockSpec::Number(500));
    req.from_block = Some(BlockSpec::Number(10));
    let outcome = engine.execute_run(req).unwrap();
    assert_eq!(outcome.output["from_block"], json!(10));
}

#[test]
fn test_elapsed_deadline_aborts_the_run() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let mut req = base_request("coords.echo", BlockSpec::Number(500));
    req.deadline = Some(LensTime::from_millis(0));
    let err = engine.execute_run(req).unwrap_err();
    assert!(matches!(err, ExecutionError::DeadlineExceeded));
}

#[test]
fn test_series_block_window_is_ascending_and_complete() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_series(SeriesRequest {
            run: base_request("coords.echo", BlockSpec::Number(1000)),
            window: WindowSpec::Blocks {
                window_blocks: 100,
                interval_blocks: 25,
            },
        })
        .unwrap();
    assert_eq!(outcome.anchor.height, 1000);
    let heights: Vec<u64> = outcome.samples.iter().map(|s| s.height).collect();
    assert_eq!(heights, vec![900, 925, 950, 975, 1000]);
    assert!(outcome.samples.iter().all(|s| s.output.is_some()));
    assert!(outcome.samples.iter().all(|s| s.error.is_none()));
}

#[test]
fn test_series_sample_failure_stays_local() {
    let chain_state = mock_chain_state();
    chain_state.fail_reads_at(CHAIN, 950);
    let reader = Arc::new(
        |api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            api.chain_read("eth_call", &json!({}))
        },
    );
    let engine = engine(
        registry_with(vec![descriptor("reader", "1.0.0", reader)]),
        chain_state,
    );
    let outcome = engine
        .execute_series(SeriesRequest {
            run: base_request("reader", BlockSpec::Number(1000)),
            window: WindowSpec::Blocks {
                window_blocks: 100,
                interval_blocks: 25,
            },
        })
        .unwrap();
    assert_eq!(outcome.samples.len(), 5);
    for sample in &outcome.samples {
        if sample.height == 950 {
            let error = sample.error.as_ref().expect("expected a failed sample");
            assert_eq!(error.code, "chain_state");
            assert!(sample.output.is_none());
        } else {
            assert!(sample.output.is_some(), "sample {} failed", sample.height);
        }
    }
}

#[test]
fn test_series_declared_data_error_keeps_its_code() {
    let dry = Arc::new(
        |_api: &dyn ModelApi, _input: &Value| -> Result<Value, ExecutionError> {
            Err(ExecutionError::ModelData {
                code: "no_liquidity".to_string(),
                message: "pool is empty at this block".to_string(),
            })
        },
    );
    let engine = engine(
        registry_with(vec![descriptor("pool.price", "1.0.0", dry)]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_series(SeriesRequest {
            run: base_request("pool.price", BlockSpec::Number(1000)),
            window: WindowSpec::BlockList { heights: vec![1000] },
        })
        .unwrap();
    assert_eq!(outcome.samples.len(), 1);
    let error = outcome.samples[0].error.as_ref().expect("expected an error");
    assert_eq!(error.code, "no_liquidity");
}

#[test]
fn test_series_collapses_duplicate_heights() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_series(SeriesRequest {
            run: base_request("coords.echo", BlockSpec::Number(1000)),
            window: WindowSpec::BlockList {
                heights: vec![1000, 1000, 999],
            },
        })
        .unwrap();
    let heights: Vec<u64> = outcome.samples.iter().map(|s| s.height).collect();
    assert_eq!(heights, vec![999, 1000]);
}

#[test]
fn test_series_drops_points_before_genesis() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_series(SeriesRequest {
            run: base_request("coords.echo", BlockSpec::Number(100)),
            window: WindowSpec::TimestampList {
                timestamps: vec![
                    // before block 0: unresolvable, dropped
                    LensTime::from_millis(GENESIS - 1),
                    LensTime::from_millis(GENESIS + 50 * PERIOD),
                ],
            },
        })
        .unwrap();
    let heights: Vec<u64> = outcome.samples.iter().map(|s| s.height).collect();
    assert_eq!(heights, vec![50]);
    assert_eq!(
        outcome.samples[0].sample_timestamp,
        LensTime::from_millis(GENESIS + 50 * PERIOD)
    );
}

#[test]
fn test_series_memoizes_across_samples() {
    // "counted" depends only on its input, not the block: every sample after
    // the first would be a cache hit if fingerprints ignored the height.
    // They must not: one execution per sampled block.
    let counter = Arc::new(AtomicU64::new(0));
    let engine = engine(
        registry_with(vec![descriptor(
            "counted",
            "1.0.0",
            counting_body(counter.clone()),
        )]),
        mock_chain_state(),
    );
    let outcome = engine
        .execute_series(SeriesRequest {
            run: base_request("counted", BlockSpec::Number(1000)),
            window: WindowSpec::Blocks {
                window_blocks: 50,
                interval_blocks: 25,
            },
        })
        .unwrap();
    assert_eq!(outcome.samples.len(), 3);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_series_zero_interval_is_rejected() {
    let engine = engine(
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );
    let err = engine
        .execute_series(SeriesRequest {
            run: base_request("coords.echo", BlockSpec::Number(1000)),
            window: WindowSpec::Blocks {
                window_blocks: 100,
                interval_blocks: 0,
            },
        })
        .unwrap_err();
    assert!(matches!(err, ExecutionError::InvalidWindow(_)));
}

#[test]
fn test_worker_thread_roundtrip_and_stop() {
    let (mut manager, controller) = start_runner_worker(
        ExecutionConfig::default(),
        registry_with(vec![descriptor("coords.echo", "1.0.0", echo_body())]),
        mock_chain_state(),
    );

    let outcome = controller
        .execute_run(base_request("coords.echo", BlockSpec::Number(500)))
        .unwrap();
    assert_eq!(outcome.block.height, 500);

    // controllers are clonable and usable concurrently
    let cloned = controller.clone();
    let outcome = cloned
        .execute_series(SeriesRequest {
            run: base_request("coords.echo", BlockSpec::Number(1000)),
            window: WindowSpec::Blocks {
                window_blocks: 50,
                interval_blocks: 25,
            },
        })
        .unwrap();
    assert_eq!(outcome.samples.len(), 3);

    manager.stop();
}
