use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::qa::QaService;

const PROMPT: &str = "\nYour question: ";

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Interactive question loop. Ends on `exit`/`quit` or end of input;
/// per-question failures are printed and the loop keeps going.
pub async fn run<R, W>(qa: &QaService, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"NIPS Q&A System Ready. Ask questions (type 'exit' to quit).\n")
        .await?;

    let mut lines = input.lines();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        let question = line.trim();
        if is_exit(question) {
            output
                .write_all(b"Goodbye, thank you for using the NIPS Chat!\n")
                .await?;
            break;
        }

        match qa.answer(question).await {
            Ok(answer) => {
                output
                    .write_all(format!("\nAnswer:\n{}\n", answer).as_bytes())
                    .await?
            }
            Err(e) => {
                tracing::debug!("chat question failed: {}", e);
                output.write_all(format!("Error: {}\n", e).as_bytes()).await?
            }
        }
    }

    output.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::core::errors::ApiError;
    use crate::docs::QaRecord;
    use crate::llm::LlmProvider;
    use crate::rag::KeywordRetriever;

    struct FlakyProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ApiError::upstream("connection reset"))
            } else {
                Ok("Relays forward events.".to_string())
            }
        }
    }

    fn service() -> QaService {
        QaService::new(
            Arc::new(KeywordRetriever::new(vec![QaRecord {
                question: "What does Relays mean?".to_string(),
                answer: "Servers.".to_string(),
            }])),
            Arc::new(FlakyProvider {
                calls: AtomicUsize::new(0),
            }),
            "system".to_string(),
            3,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn errors_are_printed_and_loop_continues_until_exit() {
        let qa = service();
        let input: &[u8] = b"what are relays?\nwhat are relays?\nQUIT\nnever asked\n";
        let mut output = Vec::new();

        run(&qa, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Error: connection reset"));
        assert!(text.contains("Answer:\nRelays forward events."));
        assert!(text.contains("Goodbye"));
        assert_eq!(text.matches("Your question: ").count(), 3);
    }

    #[tokio::test]
    async fn end_of_input_ends_the_loop() {
        let qa = service();
        let input: &[u8] = b"   \n";
        let mut output = Vec::new();

        run(&qa, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Error: question must not be empty"));
        assert_eq!(text.matches("Your question: ").count(), 2);
    }
}
