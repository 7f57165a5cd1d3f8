//! Integration tests for line-oriented command processing.

use std::sync::Arc;
use std::time::Duration;

use canvas_cli::run_commands;
use canvas_core::SequentialIds;
use canvas_host::{CommandDispatcher, FileRepository, SceneRepository};
use serde_json::Value;

async fn open(dir: &std::path::Path, key: &str) -> (CommandDispatcher, FileRepository) {
    let repository = FileRepository::new(dir).expect("repository");
    let dispatcher = CommandDispatcher::open(
        Arc::new(repository.clone()),
        key,
        Box::new(SequentialIds::new()),
        Duration::from_secs(5),
    )
    .await
    .expect("open");
    (dispatcher, repository)
}

fn responses(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("response json"))
        .collect()
}

#[tokio::test]
async fn test_stream_of_commands_answers_in_order_and_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (dispatcher, repository) = open(dir.path(), "flow").await;

    let input = concat!(
        r#"{"type":"add","id":1,"params":{"type":"rectangle","x":0,"y":0,"width":120,"height":60,"label":"Start"}}"#,
        "\n",
        "\n",
        r#"{"type":"add","id":2,"params":{"type":"arrow","x":120,"y":30,"points":[[0,0],[80,0]]}}"#,
        "\n",
        r#"{"type":"move","id":3,"params":{"elementIds":["el-1"],"deltaX":10,"deltaY":0}}"#,
        "\n",
        "not json\n",
        r#"{"type":"read","id":4,"params":{"withStyle":true}}"#,
        "\n",
    );

    let mut output = Vec::new();
    let handled = run_commands(&dispatcher, input.as_bytes(), &mut output)
        .await
        .expect("run");
    dispatcher.flush().await;
    assert_eq!(handled, 5);

    let answers = responses(&output);
    assert_eq!(answers.len(), 5);
    assert_eq!(answers[0]["id"], 1);
    assert_eq!(answers[0]["elementId"], "el-1");
    assert_eq!(answers[0]["labelId"], "el-2");
    assert_eq!(answers[1]["elementId"], "el-3");
    assert_eq!(answers[2]["movedCount"], 2);
    assert_eq!(answers[3]["success"], false);
    assert!(answers[3]["id"].is_null());

    let read = &answers[4];
    assert_eq!(read["type"], "read");
    assert_eq!(read["shapes"][0]["x"], 10);
    assert_eq!(read["shapes"][0]["labelId"], "el-2");
    assert_eq!(read["shapes"][0]["stroke"], "#1e1e1e");
    assert_eq!(read["labels"][0]["containerId"], "el-1");
    assert_eq!(read["lines"][0]["endX"], 200);
    assert!(read["lines"][0]["via"].is_null());

    let stored = repository
        .load_scene("flow")
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored.elements.len(), 3);
}

#[tokio::test]
async fn test_clear_then_reopen_starts_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let (dispatcher, _) = open(dir.path(), "wipe").await;
        let input = concat!(
            r#"{"type":"add","id":1,"params":{"type":"ellipse","x":5,"y":5}}"#,
            "\n",
            r#"{"type":"clear","id":2}"#,
            "\n",
        );
        let mut output = Vec::new();
        run_commands(&dispatcher, input.as_bytes(), &mut output)
            .await
            .expect("run");
        dispatcher.flush().await;
        assert_eq!(responses(&output)[1]["clearedCount"], 1);
    }

    let (reopened, _) = open(dir.path(), "wipe").await;
    assert!(reopened.elements().await.is_empty());
}
