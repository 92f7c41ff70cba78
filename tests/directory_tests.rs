//! Loading the queue/cluster/flavour directory from a seed file.

use std::io::Write;

use jobplane::error::JobPlaneError;
use jobplane::store::{Directory, InMemoryDirectory, Queue};

const SEED: &str = r#"{
    "clusters": [
        {"id": "c1", "name": "local", "clusterType": "docker", "endpoint": "unix:///var/run/docker.sock"}
    ],
    "queues": [
        {"id": "q1", "name": "default-queue", "clusterId": "c1", "namespace": "ns1"}
    ],
    "flavours": [
        {"name": "flavor.small", "cpu": "1", "mem": "1Gi"},
        {"name": "flavor.gpu", "cpu": "8", "mem": "32Gi", "scalarResources": {"nvidia.com/gpu": "1"}}
    ]
}"#;

fn seed_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_load_seed_file() {
    let file = seed_file(SEED);
    let directory = InMemoryDirectory::from_json_file(file.path()).unwrap();

    assert_eq!(directory.summary().await, (1, 1, 2));

    let queue = directory.get_queue_by_id("q1").await.unwrap();
    assert_eq!(queue.cluster_id, "c1");
    assert_eq!(queue.namespace, "ns1");

    let cluster = directory.get_cluster_by_id("c1").await.unwrap();
    assert_eq!(cluster.cluster_type, "docker");

    let gpu = directory.get_flavour_by_name("flavor.gpu").await.unwrap();
    assert_eq!(
        gpu.scalar_resources.get("nvidia.com/gpu").map(String::as_str),
        Some("1")
    );
}

#[tokio::test]
async fn test_queue_with_unknown_cluster_is_rejected() {
    let file = seed_file(
        r#"{"queues": [{"id": "q1", "clusterId": "nowhere", "namespace": "ns1"}]}"#,
    );
    let err = InMemoryDirectory::from_json_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[tokio::test]
async fn test_malformed_or_missing_file_is_an_error() {
    let file = seed_file("{ not json");
    assert!(InMemoryDirectory::from_json_file(file.path()).is_err());

    let dir = tempfile::tempdir().unwrap();
    assert!(InMemoryDirectory::from_json_file(&dir.path().join("absent.json")).is_err());
}

#[tokio::test]
async fn test_lookups_of_unknown_entries() {
    let directory = InMemoryDirectory::from_json_file(seed_file(SEED).path()).unwrap();

    assert_eq!(
        directory.get_queue_by_id("q9").await.unwrap_err(),
        JobPlaneError::QueueNotFound("q9".to_string())
    );
    assert_eq!(
        directory.get_cluster_by_id("c9").await.unwrap_err(),
        JobPlaneError::ClusterNotFound("c9".to_string())
    );
    assert_eq!(
        directory.get_flavour_by_name("flavor.huge").await.unwrap_err(),
        JobPlaneError::FlavourNotFound("flavor.huge".to_string())
    );
}

#[tokio::test]
async fn test_queues_can_be_added_at_runtime() {
    let directory = InMemoryDirectory::from_json_file(seed_file(SEED).path()).unwrap();
    directory
        .insert_queue(Queue {
            id: "q2".to_string(),
            name: "batch".to_string(),
            cluster_id: "c1".to_string(),
            namespace: "batch".to_string(),
        })
        .await;

    assert_eq!(directory.get_queue_by_id("q2").await.unwrap().name, "batch");
    assert_eq!(directory.summary().await, (1, 2, 2));
}
