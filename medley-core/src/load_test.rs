use anyhow::Result;
use serde_json::json;

use crate::load::{AgentLoad, ClusterEvent, SystemLoad, WorkerKind, WorkerLoad, WorkerOccupancy, WorkerReport};

fn full_report() -> WorkerReport {
    WorkerReport::Full(WorkerLoad {
        id: "r1".into(),
        kind: WorkerKind::Producer,
        capabilities: json!({"codecs": ["opus"]}),
        conn: 0,
        items: 0,
    })
}

#[test]
fn worker_report_distinguishes_full_from_partial() -> Result<()> {
    let full: WorkerReport = serde_json::from_value(json!({
        "id": "r1", "kind": "producer", "capabilities": {}, "conn": 1, "items": 2,
    }))?;
    assert!(matches!(full, WorkerReport::Full(_)), "record with identity fields must decode as full");

    let partial: WorkerReport = serde_json::from_value(json!({"id": "r1", "conn": 3, "items": 4}))?;
    match partial {
        WorkerReport::Partial(occupancy) => {
            assert_eq!(occupancy, WorkerOccupancy { id: "r1".into(), conn: 3, items: 4 });
        }
        other => panic!("occupancy-only record decoded as {:?}", other),
    }
    Ok(())
}

#[test]
fn cluster_event_carries_load_tag() -> Result<()> {
    let event = ClusterEvent::Load(AgentLoad {
        agent: "media@a0".into(),
        system: SystemLoad { cpu: 0.25, mem: 0.5 },
        workers: vec![full_report()],
    });
    let wire = serde_json::to_value(&event)?;
    assert_eq!(wire["type"], "load", "cluster events must be tagged with type=load");
    assert_eq!(wire["data"]["agent"], "media@a0", "snapshot must ride in the data field");

    let decoded: ClusterEvent = serde_json::from_value(wire)?;
    assert_eq!(decoded, event, "cluster event did not survive a wire round trip");
    Ok(())
}

#[test]
fn worker_kind_serializes_lowercase() -> Result<()> {
    assert_eq!(serde_json::to_value(WorkerKind::Producer)?, json!("producer"));
    assert_eq!(serde_json::to_value(WorkerKind::Consumer)?, json!("consumer"));
    Ok(())
}
