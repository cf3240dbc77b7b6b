//! Query runner tests through the public API with the scripted engine.

use presto_connector::config::ConnectionConfig;
use presto_connector::engine::{ScriptedEngine, ScriptedResponse};
use presto_connector::error::ConnectorError;
use presto_connector::runner::{PrestoRunner, QueryOutput, QueryRunner, RunnerRegistry};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn runner(engine: &ScriptedEngine) -> PrestoRunner {
    PrestoRunner::with_engine(ConnectionConfig::new("localhost"), Arc::new(engine.clone()))
}

#[tokio::test]
async fn test_dashboard_query_with_setup_and_comments() {
    let engine = ScriptedEngine::new().on(
        "SELECT day, visits FROM web.daily WHERE day >= date '2024-01-01'",
        ScriptedResponse::rows(
            &[("day", "date"), ("visits", "bigint")],
            vec![
                vec![json!("2024-01-01"), json!(120)],
                vec![json!("2024-01-02"), json!(98)],
            ],
        ),
    );
    let query = "/* Username: admin@example.com, Query ID: 17, Queue: queries, Job ID: abc, Query Hash: f00, Scheduled: False */\n\
                 USE hive.web;\n\
                 -- daily visits\n\
                 SELECT day, visits\n\
                 FROM web.daily\n\
                 WHERE day >= date '2024-01-01'";

    let output = runner(&engine)
        .run_query(query, Some("admin@example.com"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        engine.executed(),
        vec![
            "USE hive.web",
            "SELECT day, visits FROM web.daily WHERE day >= date '2024-01-01'",
        ]
    );
    let data: Value = serde_json::from_str(output.data().unwrap()).unwrap();
    assert_eq!(
        data,
        json!({
            "columns": [{"name": "day", "type": "date"}, {"name": "visits", "type": "integer"}],
            "rows": [
                {"day": "2024-01-01", "visits": 120},
                {"day": "2024-01-02", "visits": 98}
            ]
        })
    );
}

#[tokio::test]
async fn test_each_call_opens_its_own_connection() {
    let engine = ScriptedEngine::new();
    let runner = runner(&engine);

    for _ in 0..3 {
        runner
            .run_query("SELECT 1", None, &CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(engine.connect_count(), 3);
}

#[tokio::test]
async fn test_error_pair_has_only_error_side() {
    let engine = ScriptedEngine::new().with_fallback(ScriptedResponse::structured_error(json!({
        "message": "Query exceeded maximum time limit of 10.00m",
        "failureInfo": {"message": "Query exceeded maximum time limit of 10.00m"}
    })));

    let (data, error) = runner(&engine)
        .run_query("SELECT * FROM huge", None, &CancellationToken::new())
        .await
        .unwrap()
        .into_pair();

    assert_eq!(data, None);
    assert_eq!(
        error.as_deref(),
        Some("Query exceeded maximum time limit of 10.00m")
    );
}

#[tokio::test]
async fn test_already_cancelled_token() {
    let engine = ScriptedEngine::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = runner(&engine).run_query("SELECT 1", None, &cancel).await;

    assert!(matches!(result, Err(ConnectorError::Cancelled)));
    assert_eq!(engine.cancel_count(), 1);
}

#[tokio::test]
async fn test_timeout_cancels_hanging_setup_statement() {
    let engine = ScriptedEngine::new()
        .on("CALL system.sync_partition_metadata('web', 'visits', 'FULL')", ScriptedResponse::Hang);
    let cancel = CancellationToken::new();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let result = runner(&engine)
        .run_query(
            "CALL system.sync_partition_metadata('web', 'visits', 'FULL');\nSELECT 1",
            None,
            &cancel,
        )
        .await;
    timer.await.unwrap();

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(engine.cancel_count(), 1);
    assert_eq!(engine.executed().len(), 1);
}

#[tokio::test]
async fn test_schema_through_registry_runner() {
    let engine = ScriptedEngine::new().with_fallback(ScriptedResponse::rows(
        &[
            ("table_schema", "varchar"),
            ("table_name", "varchar"),
            ("column_name", "varchar"),
        ],
        vec![
            vec![json!("sales"), json!("orders"), json!("id")],
            vec![json!("sales"), json!("orders"), json!("total")],
            vec![json!("sales"), json!("customers"), json!("id")],
        ],
    ));
    let runner: Box<dyn QueryRunner> = Box::new(runner(&engine));

    let schema = runner.get_schema().await.unwrap();

    let json = serde_json::to_value(&schema).unwrap();
    assert_eq!(
        json,
        json!([
            {"name": "sales.orders", "columns": ["id", "total"]},
            {"name": "sales.customers", "columns": ["id"]}
        ])
    );
}

#[test]
fn test_registry_exposes_presto_form() {
    let registry = RunnerRegistry::with_default_runners();

    if !PrestoRunner::enabled() {
        assert!(!registry.is_registered("presto"));
        return;
    }

    let descriptor = registry.get("presto").unwrap();
    assert_eq!(descriptor.runner_type, "presto");
    assert_eq!(
        descriptor.configuration_schema["properties"]["password"],
        json!({"type": "string"})
    );
    assert_eq!(descriptor.configuration_schema["secret"], json!(["password"]));
}

#[test]
fn test_output_variants_are_exclusive() {
    for output in [
        QueryOutput::Data("{}".to_string()),
        QueryOutput::Error("nope".to_string()),
    ] {
        let (data, error) = output.into_pair();
        assert!(data.is_some() ^ error.is_some());
    }
}
