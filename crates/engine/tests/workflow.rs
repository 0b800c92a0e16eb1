//! Tests for composition execution: chains, groups, and workflow graphs
//! with synchronization barriers and conditional routing.

use serde_json::json;
use shopfloor_core::ProcessSpec;
use shopfloor_engine::{SimulationConfig, SimulationRunner};
use shopfloor_flow::{ProcessChain, ProcessGroup};
use shopfloor_types::Payload;
use shopfloor_workflow::{
    ConditionalBranch, NodeId, SyncPolicy, WorkflowGraph, WorkflowGraphBuilder,
};
use std::collections::BTreeMap;
use std::time::Duration;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn job(id: &str, duration: u64) -> ProcessSpec {
    ProcessSpec::builder(id, id).duration(secs(duration)).build()
}

fn job_with_output(id: &str, duration: u64, payload: Payload) -> ProcessSpec {
    ProcessSpec::builder(id, id)
        .duration(secs(duration))
        .output_payload(payload)
        .build()
}

fn finished_at(runner: &SimulationRunner, id: &str) -> Duration {
    runner
        .results()
        .iter()
        .find(|r| r.process_id.as_str() == id)
        .unwrap_or_else(|| panic!("no result for {id}"))
        .finished_at
}

fn started_at(runner: &SimulationRunner, id: &str) -> Duration {
    runner
        .results()
        .iter()
        .find(|r| r.process_id.as_str() == id)
        .unwrap_or_else(|| panic!("no result for {id}"))
        .started_at
}

// ═══════════════════════════════════════════════════════════════════════
// Chains
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_chain_runs_sequentially_and_propagates_payloads() {
    let mut runner = SimulationRunner::new(42);

    // Each stage asserts (via precondition) that it received the previous
    // stage's output, which proves the wiring output(i) -> input(i+1).
    let t1 = job_with_output("t1", 1, json!({"stage": 1}));
    let t2 = ProcessSpec::builder("t2", "t2")
        .duration(secs(2))
        .precondition(|input| input["stage"] == json!(1))
        .output_payload(json!({"stage": 2}))
        .build();
    let t3 = ProcessSpec::builder("t3", "t3")
        .duration(secs(3))
        .precondition(|input| input["stage"] == json!(2))
        .output_payload(json!({"stage": 3}))
        .build();

    let chain = ProcessChain::new().then(t1).then(t2).then(t3);
    assert_eq!(chain.len(), 3);

    let submission = runner
        .submit_chain(chain, json!({"stage": 0}), Duration::ZERO)
        .unwrap();
    runner.run_until(secs(20));

    let outcome = runner.outcome(submission).expect("chain finished");
    assert!(outcome.success, "every precondition held");
    // The chain's result is its final node's result.
    assert_eq!(outcome.payload, json!({"stage": 3}));
    assert_eq!(outcome.finished_at, secs(6), "1 + 2 + 3, strictly serial");

    assert_eq!(finished_at(&runner, "t1"), secs(1));
    assert_eq!(started_at(&runner, "t2"), secs(1));
    assert_eq!(started_at(&runner, "t3"), secs(3));
}

#[test]
fn test_empty_chain_passes_input_through() {
    let mut runner = SimulationRunner::new(42);
    let submission = runner
        .submit_chain(ProcessChain::new(), json!({"raw": true}), Duration::ZERO)
        .unwrap();
    runner.run_until(secs(1));

    let outcome = runner.outcome(submission).expect("finished immediately");
    assert!(outcome.success);
    assert_eq!(outcome.payload, json!({"raw": true}));
}

#[test]
fn test_failed_chain_stage_feeds_the_next_stage() {
    let mut runner = SimulationRunner::new(42);

    // The first stage fails validation (precondition); the failure result
    // still flows into the second stage as input.
    let bad = ProcessSpec::builder("bad", "bad")
        .precondition(|_| false)
        .build();
    let after = job("after", 1);
    let chain = ProcessChain::new().then(bad).then(after);

    let submission = runner.submit_chain(chain, json!(null), Duration::ZERO).unwrap();
    runner.run_until(secs(10));

    assert_eq!(runner.results().len(), 3, "bad, after, and the chain itself");
    let outcome = runner.outcome(submission).expect("chain finished");
    // The downstream stage ran and succeeded on the failed input.
    assert!(outcome.success, "chain result tracks its final stage");
    assert!(!runner.results()[0].success);
}

// ═══════════════════════════════════════════════════════════════════════
// Groups
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_ranked_group_runs_in_rank_order() {
    let mut runner = SimulationRunner::new(42);

    // Ranks {3,1,2}: execution order is b, c, a, one at a time.
    let group = ProcessGroup::new()
        .with_ranked(job("a", 1), 3)
        .unwrap()
        .with_ranked(job("b", 1), 1)
        .unwrap()
        .with_ranked(job("c", 1), 2)
        .unwrap();

    let submission = runner.submit_group(group, json!(null), Duration::ZERO).unwrap();
    runner.run_until(secs(10));

    assert_eq!(finished_at(&runner, "b"), secs(1));
    assert_eq!(finished_at(&runner, "c"), secs(2));
    assert_eq!(finished_at(&runner, "a"), secs(3));

    let outcome = runner.outcome(submission).expect("group finished");
    assert!(outcome.success);
    assert_eq!(outcome.finished_at, secs(3), "rank order is strictly serial");
}

#[test]
fn test_unranked_group_members_overlap() {
    let mut runner = SimulationRunner::new(42);

    let group = ProcessGroup::new()
        .with(job("a", 2))
        .with(job("b", 3))
        .with(job("c", 1));

    let submission = runner.submit_group(group, json!(null), Duration::ZERO).unwrap();
    runner.run_until(secs(10));

    // No contention: every member starts at t=0 and runs for its own
    // duration; the group completes with the slowest member.
    assert_eq!(finished_at(&runner, "a"), secs(2));
    assert_eq!(finished_at(&runner, "b"), secs(3));
    assert_eq!(finished_at(&runner, "c"), secs(1));
    assert_eq!(
        runner.outcome(submission).unwrap().finished_at,
        secs(3)
    );
}

#[test]
fn test_partial_rank_assignment_rejected_at_submission() {
    let mut runner = SimulationRunner::new(42);
    let group = ProcessGroup::new()
        .with_ranked(job("a", 1), 1)
        .unwrap()
        .with(job("b", 1));
    assert!(runner.submit_group(group, json!(null), Duration::ZERO).is_err());
}

#[test]
fn test_group_nested_in_chain() {
    let mut runner = SimulationRunner::new(42);

    let group = ProcessGroup::new().with(job("g1", 2)).with(job("g2", 3));
    let chain = ProcessChain::new()
        .then(job("prep", 1))
        .then(group)
        .then(job("pack", 1));

    let submission = runner.submit_chain(chain, json!(null), Duration::ZERO).unwrap();
    runner.run_until(secs(20));

    // prep [0,1], group members [1,3] and [1,4], pack [4,5].
    assert_eq!(started_at(&runner, "g1"), secs(1));
    assert_eq!(started_at(&runner, "g2"), secs(1));
    assert_eq!(started_at(&runner, "pack"), secs(4));
    assert_eq!(runner.outcome(submission).unwrap().finished_at, secs(5));
}

// ═══════════════════════════════════════════════════════════════════════
// Workflow graphs
// ═══════════════════════════════════════════════════════════════════════

/// The fan-in scenario used throughout: A(2), B(3), C(1) all feed D(1).
fn fan_in(policy: Option<(SyncPolicy, Option<Duration>)>) -> WorkflowGraph {
    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("a", job("a", 2)).unwrap();
    builder.add_node("b", job("b", 3)).unwrap();
    builder.add_node("c", job("c", 1)).unwrap();
    builder.add_node("d", job("d", 1)).unwrap();
    builder.add_edge("a", "d").unwrap();
    builder.add_edge("b", "d").unwrap();
    builder.add_edge("c", "d").unwrap();
    if let Some((policy, timeout)) = policy {
        builder
            .synchronize(
                [NodeId::new("a"), NodeId::new("b"), NodeId::new("c")],
                policy,
                timeout,
            )
            .unwrap();
    }
    builder.build().unwrap()
}

#[test]
fn test_all_complete_fan_in_end_to_end() {
    let mut runner = SimulationRunner::new(42);
    let submission = runner.submit_graph(fan_in(None), json!(null), Duration::ZERO);
    runner.run_until(secs(20));

    // The default barrier is all-complete: D waits for the slowest branch.
    assert_eq!(started_at(&runner, "d"), secs(3));
    assert_eq!(finished_at(&runner, "d"), secs(4), "max(2,3,1) + 1");

    let outcome = runner.outcome(submission).expect("graph finished");
    assert!(outcome.success);
    assert_eq!(outcome.finished_at, secs(4));
}

#[test]
fn test_threshold_batch_completes_at_second_fastest() {
    let mut runner = SimulationRunner::new(42);
    let graph = fan_in(Some((SyncPolicy::Threshold(2), None)));
    let submission = runner.submit_graph(graph, json!(null), Duration::ZERO);
    runner.run_until(secs(20));

    // C finishes at 1, A at 2: the threshold of two is met at t=2.
    assert_eq!(started_at(&runner, "d"), secs(2));
    assert_eq!(finished_at(&runner, "d"), secs(3));

    // The detached member still runs to completion and is recorded.
    assert_eq!(finished_at(&runner, "b"), secs(3));
    assert!(runner.outcome(submission).is_some());
}

#[test]
fn test_any_complete_batch_completes_at_fastest() {
    let mut runner = SimulationRunner::new(42);
    let graph = fan_in(Some((SyncPolicy::AnyComplete, None)));
    runner.submit_graph(graph, json!(null), Duration::ZERO);
    runner.run_until(secs(20));

    assert_eq!(started_at(&runner, "d"), secs(1));
    assert_eq!(finished_at(&runner, "d"), secs(2));
}

#[test]
fn test_configured_default_sync_policy_applies_to_undeclared_batches() {
    // No synchronization point is declared on the fan-in; the runner's
    // configured fallback policy governs the batch instead of all-complete.
    let config = SimulationConfig::default()
        .with_seed(42)
        .with_default_sync_policy(SyncPolicy::AnyComplete);
    let mut runner = SimulationRunner::with_config(config);
    runner.submit_graph(fan_in(None), json!(null), Duration::ZERO);
    runner.run_until(secs(20));

    assert_eq!(started_at(&runner, "d"), secs(1), "fastest member releases the batch");
}

#[test]
fn test_configured_default_sync_timeout_bounds_undeclared_batches() {
    let config = SimulationConfig::default()
        .with_seed(42)
        .with_default_sync_timeout(secs(2));
    let mut runner = SimulationRunner::with_config(config);
    runner.submit_graph(fan_in(None), json!(null), Duration::ZERO);
    runner.run_until(secs(20));

    // a(2) and c(1) are in; b(3) is still running when the bound elapses.
    assert_eq!(started_at(&runner, "d"), secs(2));
    assert_eq!(runner.stats().sync_timeouts, 1);
    assert_eq!(finished_at(&runner, "b"), secs(3), "detached, not cancelled");
}

#[test]
fn test_sync_timeout_proceeds_with_partial_results() {
    let mut runner = SimulationRunner::new(42);

    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("slow", job("slow", 10)).unwrap();
    builder.add_node("fast", job("fast", 1)).unwrap();
    builder.add_node("next", job("next", 1)).unwrap();
    builder.add_edge("slow", "next").unwrap();
    builder.add_edge("fast", "next").unwrap();
    builder
        .synchronize(
            [NodeId::new("slow"), NodeId::new("fast")],
            SyncPolicy::AllComplete,
            Some(secs(2)),
        )
        .unwrap();
    let submission = runner.submit_graph(builder.build().unwrap(), json!(null), Duration::ZERO);

    runner.run_until(secs(30));

    // The barrier timed out at t=2 and released the batch.
    assert_eq!(started_at(&runner, "next"), secs(2));
    assert_eq!(runner.stats().sync_timeouts, 1);

    // The slow member is detached, not cancelled.
    assert_eq!(finished_at(&runner, "slow"), secs(10));
    let outcome = runner.outcome(submission).expect("graph finished");
    assert_eq!(outcome.finished_at, secs(10));
}

#[test]
fn test_topological_respect() {
    let mut runner = SimulationRunner::new(42);

    // a -> b -> d, a -> c -> d
    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("a", job("a", 1)).unwrap();
    builder.add_node("b", job("b", 2)).unwrap();
    builder.add_node("c", job("c", 3)).unwrap();
    builder.add_node("d", job("d", 1)).unwrap();
    builder.add_edge("a", "b").unwrap();
    builder.add_edge("a", "c").unwrap();
    builder.add_edge("b", "d").unwrap();
    builder.add_edge("c", "d").unwrap();
    runner.submit_graph(builder.build().unwrap(), json!(null), Duration::ZERO);
    runner.run_until(secs(20));

    // No node starts before every declared predecessor reported.
    assert!(started_at(&runner, "b") >= finished_at(&runner, "a"));
    assert!(started_at(&runner, "c") >= finished_at(&runner, "a"));
    assert!(started_at(&runner, "d") >= finished_at(&runner, "b"));
    assert!(started_at(&runner, "d") >= finished_at(&runner, "c"));
}

#[test]
fn test_failed_node_still_feeds_dependents() {
    let mut runner = SimulationRunner::new(42);

    let failing = ProcessSpec::builder("flawed", "flawed")
        .precondition(|_| false)
        .build();
    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("flawed", failing).unwrap();
    builder.add_node("after", job("after", 1)).unwrap();
    builder.add_edge("flawed", "after").unwrap();
    let submission = runner.submit_graph(builder.build().unwrap(), json!(null), Duration::ZERO);

    runner.run_until(secs(10));

    // Dependents are not skipped on upstream failure; the failed result
    // propagates as input data.
    let after = runner
        .results()
        .iter()
        .find(|r| r.process_id.as_str() == "after")
        .expect("dependent ran");
    assert!(after.success);

    let outcome = runner.outcome(submission).expect("graph finished");
    assert!(!outcome.success, "aggregate reflects the failure");
    assert!(runner.skipped_nodes().is_empty());
}

#[test]
fn test_conditional_branch_routes_on_result() {
    let mut runner = SimulationRunner::new(42);

    // Inspection routes to ship on pass, rework on fail. The inspection
    // here passes, so rework (and everything only reachable through it)
    // is skipped.
    let inspect = job_with_output("inspect", 1, json!({"defects": 0}));
    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("inspect", inspect).unwrap();
    builder.add_node("ship", job("ship", 1)).unwrap();
    builder.add_node("rework", job("rework", 2)).unwrap();
    builder.add_node("scrap", job("scrap", 1)).unwrap();
    builder.add_edge("inspect", "ship").unwrap();
    builder.add_edge("inspect", "rework").unwrap();
    builder.add_edge("rework", "scrap").unwrap();
    builder
        .branch_on(ConditionalBranch::new(
            NodeId::new("inspect"),
            |result| {
                if result.payload["defects"] == json!(0) {
                    Some("pass".to_string())
                } else {
                    Some("fail".to_string())
                }
            },
            BTreeMap::from([
                ("pass".to_string(), vec![NodeId::new("ship")]),
                ("fail".to_string(), vec![NodeId::new("rework")]),
            ]),
        ))
        .unwrap();
    let submission = runner.submit_graph(builder.build().unwrap(), json!(null), Duration::ZERO);

    runner.run_until(secs(20));

    assert_eq!(finished_at(&runner, "ship"), secs(2));
    assert!(
        !runner.results().iter().any(|r| r.process_id.as_str() == "rework"),
        "deselected branch never runs"
    );
    let skipped: Vec<&str> = runner.skipped_nodes().iter().map(NodeId::as_str).collect();
    assert_eq!(skipped, ["rework", "scrap"], "skip cascades downstream");

    let outcome = runner.outcome(submission).expect("graph finished");
    assert!(outcome.success);
}

#[test]
fn test_unmatched_branch_key_activates_nothing() {
    let mut runner = SimulationRunner::new(42);

    let inspect = job_with_output("inspect", 1, json!({"verdict": "hold"}));
    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("inspect", inspect).unwrap();
    builder.add_node("ship", job("ship", 1)).unwrap();
    builder.add_edge("inspect", "ship").unwrap();
    builder
        .branch_on(ConditionalBranch::new(
            NodeId::new("inspect"),
            |result| result.payload["verdict"].as_str().map(String::from),
            BTreeMap::from([("pass".to_string(), vec![NodeId::new("ship")])]),
        ))
        .unwrap();
    runner.submit_graph(builder.build().unwrap(), json!(null), Duration::ZERO);

    runner.run_until(secs(20));

    // "hold" matches no declared branch: the target is reported skipped,
    // never silently dropped.
    assert_eq!(runner.skipped_nodes(), [NodeId::new("ship")]);
    assert!(
        !runner.results().iter().any(|r| r.process_id.as_str() == "ship"),
        "unmatched key activates nothing"
    );
}

#[test]
fn test_group_as_graph_node() {
    let mut runner = SimulationRunner::new(42);

    let group = ProcessGroup::new().with(job("m1", 2)).with(job("m2", 1));
    let mut builder = WorkflowGraphBuilder::new();
    builder.add_node("prep", job("prep", 1)).unwrap();
    builder.add_node("work", group).unwrap();
    builder.add_node("done", job("done", 1)).unwrap();
    builder.add_edge("prep", "work").unwrap();
    builder.add_edge("work", "done").unwrap();
    let submission = runner.submit_graph(builder.build().unwrap(), json!(null), Duration::ZERO);

    runner.run_until(secs(20));

    // prep [0,1], group members overlap [1,3] and [1,2], done [3,4].
    assert_eq!(started_at(&runner, "m1"), secs(1));
    assert_eq!(finished_at(&runner, "done"), secs(4));
    assert!(runner.outcome(submission).unwrap().success);
}

#[test]
fn test_graph_determinism() {
    let run = |seed: u64| {
        let mut runner = SimulationRunner::new(seed);
        let graph = fan_in(Some((SyncPolicy::Threshold(2), None)));
        runner.submit_graph(graph, json!(null), Duration::ZERO);
        runner.run_until(secs(20));
        runner
            .results()
            .iter()
            .map(|r| (r.process_id.as_str().to_string(), r.finished_at))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(7), run(7));
}
