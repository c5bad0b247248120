//! `rag ask` and `rag chat`: answer questions from the knowledge base.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::assistant::RagAssistant;
use crate::config::Config;

/// Words that end a chat session.
const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

/// Answer a single question and print the answer.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let assistant = RagAssistant::open(config).await?;
    let answer = assistant.invoke(question).await;
    assistant.close().await?;

    println!("{}", answer);
    Ok(())
}

/// Interactive loop: one question per line until `quit` or end of input.
pub async fn run_chat(config: &Config) -> Result<()> {
    let assistant = RagAssistant::open(config).await?;
    let count = assistant.count().await?;

    println!("RAG assistant ready ({} chunks indexed). Type 'quit' to exit.", count);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        let answer = assistant.invoke(question).await;
        println!("\nAssistant: {}", answer);
    }

    assistant.close().await?;
    println!("Goodbye.");
    Ok(())
}

fn is_exit(input: &str) -> bool {
    EXIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}
