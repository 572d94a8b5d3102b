//! Score submission and leaderboard
//!
//! The wire format matches the ranking endpoint: submissions carry
//! `nombre`/`email`/`puntaje` plus an `action`, and both requests answer with
//! a `status` envelope. Submitting and loading the leaderboard are
//! independent; a `RankingReport` keeps both outcomes so whatever succeeded
//! can still be shown.

#[cfg(target_arch = "wasm32")]
pub mod remote;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::consts::{LOCAL_RANKING_KEY, RANKING_MAX_NAME_LENGTH, RANKING_TOP_N};
use crate::persistence::PreferenceStore;
use crate::sim::RunSummary;
use crate::truncate_chars;

/// Name shown for leaderboard rows without one
const UNKNOWN_NAME: &str = "???";

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("network error: {0}")]
    Network(String),
    /// The server understood the request and refused it (e.g. attempts exhausted)
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected response from the ranking server")]
    UnexpectedResponse,
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Body of a score submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSubmission {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "puntaje")]
    pub score: u64,
    action: &'static str,
}

impl ScoreSubmission {
    pub fn new(name: &str, email: &str, score: u64) -> Self {
        Self {
            name: truncate_chars(name, RANKING_MAX_NAME_LENGTH),
            email: email.to_string(),
            score,
            action: "submitScore",
        }
    }

    pub fn to_json(&self) -> Result<String, RankingError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&RunSummary> for ScoreSubmission {
    fn from(summary: &RunSummary) -> Self {
        Self::new(&summary.name, &summary.email, summary.score)
    }
}

/// Body of a leaderboard request
pub fn leaderboard_request() -> String {
    serde_json::json!({ "action": "getRanking" }).to_string()
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "puntaje")]
    pub score: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    ranking: Option<Value>,
}

/// Interpret a submit response. `Ok` carries the server's acknowledgement.
pub fn parse_submit_response(body: &str) -> Result<String, RankingError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    match envelope.status.as_str() {
        "success" => Ok(envelope.message.unwrap_or_else(|| "Score submitted.".to_string())),
        "error" | "limitReached" => Err(RankingError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Your score could not be saved.".to_string()),
        )),
        other => {
            log::warn!("Unexpected submit status: {other:?}");
            Err(RankingError::UnexpectedResponse)
        }
    }
}

/// Interpret a leaderboard response into sanitised, sorted rows
pub fn parse_leaderboard(body: &str) -> Result<Vec<RankingEntry>, RankingError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    match (envelope.status.as_str(), envelope.ranking) {
        ("success", Some(Value::Array(rows))) => Ok(sanitize_rows(&rows)),
        (_, _) => Err(match envelope.message {
            Some(message) => RankingError::Rejected(message),
            None => RankingError::UnexpectedResponse,
        }),
    }
}

/// Normalise raw rows: default names, digit-only scores, negatives dropped,
/// highest first, top N
pub fn sanitize_rows(rows: &[Value]) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = rows
        .iter()
        .filter_map(|row| {
            let name = match row.get("nombre") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => UNKNOWN_NAME.to_string(),
            };
            let score = parse_score(row.get("puntaje"))?;
            Some(RankingEntry {
                name: truncate_chars(&name, RANKING_MAX_NAME_LENGTH),
                score,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(RANKING_TOP_N);
    entries
}

/// Numbers pass through; strings keep only digits, '.', and '-'.
/// Unparseable values count as 0, negatives are rejected.
fn parse_score(value: Option<&Value>) -> Option<u64> {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if raw.is_nan() || raw < 0.0 {
        return None;
    }
    Some(raw as u64)
}

/// Outcome of the end-of-run ranking exchange
#[derive(Debug)]
pub struct RankingReport {
    pub submitted: Result<String, RankingError>,
    pub leaderboard: Result<Vec<RankingEntry>, RankingError>,
}

impl RankingReport {
    /// Human-readable lines; each failure is reported on its own
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        match &self.submitted {
            Ok(message) => lines.push(message.clone()),
            Err(RankingError::Rejected(message)) => lines.push(message.clone()),
            Err(_) => {}
        }

        match &self.leaderboard {
            Ok(entries) => {
                lines.push(format!("Ranking Top {RANKING_TOP_N}"));
                if entries.is_empty() {
                    lines.push("Ranking empty. Be the first!".to_string());
                }
                for (i, entry) in entries.iter().enumerate() {
                    lines.push(format!("{:>2}. {:<15} {}", i + 1, entry.name, entry.score));
                }
                if let Err(e) = &self.submitted {
                    lines.push(format!("Note: could not confirm your score was saved ({e})."));
                }
            }
            Err(e) => {
                lines.push(format!("Could not load the ranking ({e})."));
                match &self.submitted {
                    Err(send) => lines.push(format!("Your score could not be saved either ({send}).")),
                    Ok(_) => lines.push("Your score was sent, but the ranking is unavailable right now.".to_string()),
                }
            }
        }

        lines
    }
}

/// Synchronous ranking backend
pub trait RankingService {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<String, RankingError>;
    fn leaderboard(&mut self) -> Result<Vec<RankingEntry>, RankingError>;

    /// Submit, then load the leaderboard regardless of the submit outcome
    fn report(&mut self, submission: &ScoreSubmission) -> RankingReport {
        let submitted = self.submit(submission);
        if let Err(e) = &submitted {
            log::warn!("Score submission failed: {e}");
        }
        let leaderboard = self.leaderboard();
        if let Err(e) = &leaderboard {
            log::warn!("Leaderboard load failed: {e}");
        }
        RankingReport { submitted, leaderboard }
    }
}

/// Leaderboard kept in the preference store, for offline play
#[derive(Debug, Clone, Default)]
pub struct LocalRanking<S> {
    store: S,
}

impl<S: PreferenceStore> LocalRanking<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn load(&self) -> Vec<RankingEntry> {
        let Some(json) = self.store.get(LOCAL_RANKING_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<Value>>(&json) {
            Ok(rows) => sanitize_rows(&rows),
            Err(e) => {
                log::warn!("Discarding unreadable local ranking: {e}");
                Vec::new()
            }
        }
    }

    fn save(&mut self, entries: &[RankingEntry]) -> Result<(), RankingError> {
        let json = serde_json::to_string(entries)?;
        self.store.set(LOCAL_RANKING_KEY, &json);
        Ok(())
    }
}

impl<S: PreferenceStore> RankingService for LocalRanking<S> {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<String, RankingError> {
        let mut entries = self.load();

        // Sorted descending; ties keep the earlier entry first
        let pos = entries.iter().position(|e| submission.score > e.score);
        let rank = match pos {
            Some(i) => {
                entries.insert(i, RankingEntry {
                    name: submission.name.clone(),
                    score: submission.score,
                });
                i + 1
            }
            None => {
                entries.push(RankingEntry {
                    name: submission.name.clone(),
                    score: submission.score,
                });
                entries.len()
            }
        };
        entries.truncate(RANKING_TOP_N);
        self.save(&entries)?;

        if rank <= RANKING_TOP_N {
            Ok(format!("Score saved. You placed #{rank}."))
        } else {
            Ok("Score saved.".to_string())
        }
    }

    fn leaderboard(&mut self) -> Result<Vec<RankingEntry>, RankingError> {
        Ok(self.load())
    }
}
