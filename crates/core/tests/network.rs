//! Multi-agent network integration tests.

mod common;

use common::default_actions;
use sk_core::engine::{Engine, SummonOptions};
use sk_core::network::AgentNetwork;
use sk_protocol::agent_models::{DecisionMode, NetworkConfig};
use std::sync::Arc;
use tokio::sync::Mutex;

async fn three_member_network(config: NetworkConfig) -> AgentNetwork {
    // Pairwise overlapping bases: every pair shares at least one element.
    let bases = [vec![2, 3, 5], vec![3, 5, 7], vec![2, 5, 11]];
    let engines: Vec<Arc<Mutex<Engine>>> = bases
        .iter()
        .enumerate()
        .map(|(i, basis)| {
            let definition = common::definition(&format!("member-{i}"), basis.clone());
            Arc::new(Mutex::new(Engine::new(definition).unwrap()))
        })
        .collect();
    AgentNetwork::new(engines, config).await.unwrap()
}

/// Collective step over three overlapping members yields a link per pair
/// with non-empty basis overlap.
#[tokio::test]
async fn test_collective_step_links_every_pair() {
    let network = three_member_network(NetworkConfig::default()).await;
    let reports = network.summon_all(SummonOptions::default()).await;
    assert!(reports.iter().all(|r| r.result.is_ok()));

    let outcome = network
        .collective_step("shared observation", &default_actions())
        .await
        .unwrap();

    assert_eq!(outcome.links.len(), 3);
    for link in &outcome.links {
        assert!(!link.basis_overlap.is_empty());
        assert!((0.0..=1.0).contains(&link.phase_alignment));
    }
    assert!(outcome.decision.free_energy.is_finite());
    assert_eq!(outcome.members.len(), 3);
}

/// Tensor body is the sorted union of all member bases.
#[tokio::test]
async fn test_tensor_body_union() {
    let network = three_member_network(NetworkConfig::default()).await;
    assert_eq!(network.tensor().basis_union, vec![2, 3, 5, 7, 11]);
    assert_eq!(network.tensor().rank, 3);
}

/// Competitive mode picks the minimum-energy member decision.
#[tokio::test]
async fn test_competitive_mode_minimizes_energy() {
    let config = NetworkConfig {
        decision_mode: DecisionMode::Competitive,
        ..NetworkConfig::default()
    };
    let network = three_member_network(config).await;
    network.summon_all(SummonOptions::default()).await;

    let outcome = network
        .collective_step("compete", &default_actions())
        .await
        .unwrap();

    let min_energy = outcome
        .members
        .iter()
        .filter_map(|m| m.result.as_ref().ok())
        .map(|o| o.decision.free_energy)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(outcome.decision.free_energy, min_energy);
}

/// Belief propagation inserts attenuated foreign beliefs into each
/// receiver's own session; the distribution stays normalized.
#[tokio::test]
async fn test_propagation_writes_into_receiver_sessions() {
    let engines: Vec<Arc<Mutex<Engine>>> = [vec![2u64, 3, 5], vec![3, 5, 7]]
        .iter()
        .enumerate()
        .map(|(i, basis)| {
            let definition = common::definition(&format!("member-{i}"), basis.clone());
            Arc::new(Mutex::new(Engine::new(definition).unwrap()))
        })
        .collect();
    let handles: Vec<Arc<Mutex<Engine>>> = engines.iter().map(Arc::clone).collect();

    let network = AgentNetwork::new(engines, NetworkConfig::default())
        .await
        .unwrap();
    network.summon_all(SummonOptions::default()).await;
    network
        .collective_step("propagate", &default_actions())
        .await
        .unwrap();

    for handle in &handles {
        let engine = handle.lock().await;
        let session = engine.session().expect("session open");
        let total: f64 = session.beliefs.iter().map(|b| b.probability).sum();
        assert!((total - 1.0).abs() < 1e-9, "beliefs denormalized: {total}");
        assert!(!session.beliefs.is_empty());
    }
}

/// Collective step with no summoned members fails with a typed error.
#[tokio::test]
async fn test_collective_step_requires_summoned_members() {
    let network = three_member_network(NetworkConfig::default()).await;
    // No summon_all: every member full_step fails in Dormant.
    let result = network
        .collective_step("too early", &default_actions())
        .await;
    assert!(result.is_err());
}

/// Dismissing twice reports per-member errors the second time without
/// aborting the fan-out.
#[tokio::test]
async fn test_dismiss_all_partial_errors() {
    let network = three_member_network(NetworkConfig::default()).await;
    network.summon_all(SummonOptions::default()).await;

    let first = network.dismiss_all().await;
    assert!(first.iter().all(|r| r.result.is_ok()));

    let second = network.dismiss_all().await;
    assert_eq!(second.len(), 3);
    assert!(second.iter().all(|r| r.result.is_err()));
}
