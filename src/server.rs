use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::dispatch::Dispatcher;

/// Drives the dispatcher over a line-delimited transport.
///
/// Lines are read in arrival order but handled each on its own task, so a
/// slow provider call never blocks lines queued behind it and responses may
/// be emitted out of submission order. All responses funnel through one
/// writer task, one line per response, flushed. Returns once the input
/// stream closes and every in-flight line has been answered.
pub async fn serve<R, W>(dispatcher: Arc<Dispatcher>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(32);

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        io::Result::Ok(())
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        debug!(len = line.len(), "read line");
        let dispatcher = Arc::clone(&dispatcher);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = dispatcher.dispatch_line(&line).await {
                // Send fails only when the writer has already gone away.
                let _ = tx.send(response).await;
            }
        });
    }

    // In-flight tasks still hold senders; the writer drains them all.
    drop(tx);
    writer_task
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ImageProvider;
    use crate::registry::default_registry;

    /// Sleeps when the prompt says "slow", so tests can force overlap.
    #[derive(Default)]
    struct StubProvider {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageProvider for StubProvider {
        async fn generate(&self, input: &Map<String, Value>) -> Result<Value, ProviderError> {
            let prompt = input["prompt"].as_str().unwrap_or_default().to_string();
            self.calls.lock().unwrap().push(prompt.clone());
            if prompt == "slow" {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(json!({ "prompt": prompt }))
        }
    }

    async fn run_session(input: &str) -> Vec<Value> {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(default_registry()),
            Arc::new(StubProvider::default()),
        ));

        let (out_w, out_r) = tokio::io::duplex(64 * 1024);
        let reader = std::io::Cursor::new(input.as_bytes().to_vec());
        let server = tokio::spawn(serve(dispatcher, reader, out_w));

        let mut lines = BufReader::new(out_r).lines();
        let mut responses = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str(&line).unwrap());
        }

        server.await.unwrap().unwrap();
        responses
    }

    #[tokio::test]
    async fn answers_every_line_with_matching_id() {
        let input = concat!(
            r#"{"id": 1, "type": "hello"}"#, "\n",
            r#"{"id": 2, "type": "list_tools"}"#, "\n",
            r#"{"id": 3, "type": "run_tool", "tool_name": "generate_image", "parameters": {"prompt": "fox"}}"#, "\n",
        );
        let responses = run_session(input).await;

        assert_eq!(responses.len(), 3);
        let mut ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn garbage_line_without_id_does_not_stall_the_session() {
        let input = concat!(
            "this is not json\n",
            r#"{"id": "after", "type": "hello"}"#, "\n",
        );
        let responses = run_session(input).await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "after");
        assert_eq!(responses[0]["status"], "success");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_run_tool_does_not_block_the_next_line() {
        let input = concat!(
            r#"{"id": "slow", "type": "run_tool", "tool_name": "generate_image", "parameters": {"prompt": "slow"}}"#, "\n",
            r#"{"id": "fast", "type": "run_tool", "tool_name": "generate_image", "parameters": {"prompt": "fast"}}"#, "\n",
        );
        let responses = run_session(input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], "fast");
        assert_eq!(responses[1]["id"], "slow");
    }
}
