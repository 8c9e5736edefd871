//! Evaluate command handler.
//!
//! Replays a question set through the pipeline, scores every reply with the
//! judge, and prints the leaderboard.

use crate::commands::build_pipeline;
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_rag::evaluation::{DEFAULT_APP_NAME, DEFAULT_APP_VERSION};
use ragchat_rag::{EvaluationLog, EvaluationReport, Evaluator, DEFAULT_QUESTIONS};
use std::path::PathBuf;

/// Score the pipeline on a question set
#[derive(Args, Debug)]
pub struct EvaluateCommand {
    /// File with one question per line (default: built-in Rust book set)
    #[arg(short, long)]
    pub questions: Option<PathBuf>,

    /// App name recorded with each result
    #[arg(long, default_value = DEFAULT_APP_NAME)]
    pub app_name: String,

    /// App version recorded with each result
    #[arg(long, default_value = DEFAULT_APP_VERSION)]
    pub app_version: String,

    /// Append the records to .ragchat/evaluations/<app-version>.jsonl
    #[arg(long)]
    pub record: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl EvaluateCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing evaluate command");

        let questions = self.load_questions()?;
        // Validate before spending any model calls
        let log = if self.record {
            Some(EvaluationLog::new(&config.workspace, &self.app_version)?)
        } else {
            None
        };

        let pipeline = build_pipeline(config)?;
        let evaluator = Evaluator::new(pipeline.controller, pipeline.judge, pipeline.model)
            .with_app(&self.app_name, &self.app_version);

        let report = evaluator.run(&questions).await?;

        if let Some(log) = &log {
            log.append(&report.records)?;
            tracing::info!("Recorded {} results to {:?}", report.records.len(), log.path());
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(())
    }

    fn load_questions(&self) -> AppResult<Vec<String>> {
        let Some(path) = &self.questions else {
            return Ok(DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect());
        };

        let contents = std::fs::read_to_string(path)?;
        let questions = parse_questions(&contents);
        if questions.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "No questions found in {:?}",
                path
            )));
        }
        Ok(questions)
    }
}

/// One question per non-blank line; lines starting with `#` are comments.
fn parse_questions(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn print_report(report: &EvaluationReport) {
    for (i, record) in report.records.iter().enumerate() {
        println!("{}. {}", i + 1, record.question);
        match (&record.answer, &record.error) {
            (_, Some(error)) => println!("   error: {}", error.message),
            (Some(answer), None) => {
                println!("   groundedness:      {}", score(record.groundedness));
                println!("   context relevance: {}", score(record.context_relevance));
                println!("   answer relevance:  {}", score(record.answer_relevance));
                println!("   latency:           {} ms", record.latency_ms);
                tracing::debug!("Answer for {:?}: {}", record.question, answer);
            }
            (None, None) => {}
        }
    }

    let board = &report.leaderboard;
    println!();
    println!("Leaderboard: {} ({})", board.app_name, board.app_version);
    println!("  Records:           {} ({} errors)", board.records, board.errors);
    println!("  Groundedness:      {}", score(board.groundedness));
    println!("  Context relevance: {}", score(board.context_relevance));
    println!("  Answer relevance:  {}", score(board.answer_relevance));
    match board.mean_latency_ms {
        Some(ms) => println!("  Mean latency:      {:.0} ms", ms),
        None => println!("  Mean latency:      -"),
    }
}

fn score(value: Option<f32>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions_skips_blanks_and_comments() {
        let contents = "# Rust book\nWhat is ownership in Rust?\n\n  How can I ignore a test?  \n";
        assert_eq!(
            parse_questions(contents),
            vec!["What is ownership in Rust?", "How can I ignore a test?"]
        );
    }

    #[test]
    fn test_score_formatting() {
        assert_eq!(score(Some(2.0 / 3.0)), "0.67");
        assert_eq!(score(None), "-");
    }
}
