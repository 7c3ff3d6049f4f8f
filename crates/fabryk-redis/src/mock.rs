//! In-memory command executor for testing.
//!
//! [`MockExecutor`] understands just enough of the search module to drive a
//! store end to end: `FT.INFO`, `FT.CREATE`, `FT.DROPINDEX`, `HSET` and a
//! simplified `FT.SEARCH`. Every command is recorded so tests can assert on
//! the exact wire traffic.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::executor::{CommandExecutor, Reply};

/// Mock executor backed by in-memory maps.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Index name to its key prefixes.
    indexes: HashMap<String, Vec<String>>,
    hashes: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    failing_keys: HashSet<String>,
    search_reply: Option<Reply>,
    unreachable: bool,
    log: Vec<Command>,
}

impl MockExecutor {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock where the named indexes already exist (no prefixes).
    pub fn with_indexes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = MockState {
            indexes: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make every `HSET` to `key` fail with a server error.
    pub async fn fail_key(&self, key: impl Into<String>) {
        self.state.lock().await.failing_keys.insert(key.into());
    }

    /// Answer every `FT.SEARCH` with `reply`.
    pub async fn set_search_reply(&self, reply: Reply) {
        self.state.lock().await.search_reply = Some(reply);
    }

    /// Fail every command with a connection error.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    /// All commands received so far.
    pub async fn commands(&self) -> Vec<Command> {
        self.state.lock().await.log.clone()
    }

    /// Verbs of the commands received so far.
    pub async fn command_names(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .log
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Number of received commands with the given verb.
    pub async fn count(&self, name: &str) -> usize {
        self.state
            .lock()
            .await
            .log
            .iter()
            .filter(|c| c.name().eq_ignore_ascii_case(name))
            .count()
    }

    /// Whether the index exists.
    pub async fn has_index(&self, name: &str) -> bool {
        self.state.lock().await.indexes.contains_key(name)
    }

    /// Stored hash at `key`.
    pub async fn hash(&self, key: &str) -> Option<BTreeMap<String, Vec<u8>>> {
        self.state.lock().await.hashes.get(key).cloned()
    }

    /// Keys of all stored hashes, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.state.lock().await.hashes.keys().cloned().collect()
    }
}

impl MockState {
    fn apply(&mut self, command: &Command) -> Result<Reply> {
        let name = command.name().to_ascii_uppercase();
        let arg = |i: usize| command.arg_str(i).unwrap_or_default().to_string();

        match name.as_str() {
            "FT.INFO" => {
                let index = arg(0);
                if self.indexes.contains_key(&index) {
                    Ok(Reply::Array(vec![Reply::bulk("index_name"), Reply::bulk(index)]))
                } else {
                    Err(Error::command("FT.INFO", "Unknown index name"))
                }
            }
            "FT.CREATE" => {
                let index = arg(0);
                if self.indexes.contains_key(&index) {
                    return Err(Error::command("FT.CREATE", "Index already exists"));
                }
                self.indexes.insert(index, parse_prefixes(command));
                Ok(Reply::Okay)
            }
            "FT.DROPINDEX" => {
                let index = arg(0);
                let Some(prefixes) = self.indexes.remove(&index) else {
                    return Err(Error::command("FT.DROPINDEX", "Unknown index name"));
                };
                if arg(1).eq_ignore_ascii_case("DD") {
                    self.hashes
                        .retain(|key, _| !prefixes.iter().any(|p| key.starts_with(p.as_str())));
                }
                Ok(Reply::Okay)
            }
            "HSET" => {
                let key = arg(0);
                if self.failing_keys.contains(&key) {
                    return Err(Error::command(
                        "HSET",
                        "OOM command not allowed when used memory > 'maxmemory'",
                    ));
                }
                let args = command.args();
                if args.len() < 3 || args.len() % 2 == 0 {
                    return Err(Error::command(
                        "HSET",
                        "wrong number of arguments for 'hset' command",
                    ));
                }
                let hash = self.hashes.entry(key).or_default();
                let mut added = 0;
                for pair in args[1..].chunks(2) {
                    let field = String::from_utf8_lossy(&pair[0]).into_owned();
                    if hash.insert(field, pair[1].clone()).is_none() {
                        added += 1;
                    }
                }
                Ok(Reply::Int(added))
            }
            "FT.SEARCH" => self.search(command),
            other => Err(Error::command(other, "unknown command")),
        }
    }

    /// Canned reply, or every hash under the index prefixes with distance 0.
    fn search(&self, command: &Command) -> Result<Reply> {
        let index = command.arg_str(0).unwrap_or_default();
        let Some(prefixes) = self.indexes.get(index) else {
            return Err(Error::command("FT.SEARCH", "Unknown index name"));
        };
        if let Some(reply) = &self.search_reply {
            return Ok(reply.clone());
        }

        let tokens = command.tokens();
        let returns: Option<Vec<String>> = tokens.iter().position(|t| t == "RETURN").map(|at| {
            let n: usize = tokens.get(at + 1).and_then(|n| n.parse().ok()).unwrap_or(0);
            tokens.iter().skip(at + 2).take(n).cloned().collect()
        });
        let (offset, limit) = match tokens.iter().position(|t| t == "LIMIT") {
            Some(at) => (
                tokens.get(at + 1).and_then(|n| n.parse().ok()).unwrap_or(0),
                tokens.get(at + 2).and_then(|n| n.parse().ok()).unwrap_or(10),
            ),
            None => (0, 10),
        };

        let matching: Vec<(&String, &BTreeMap<String, Vec<u8>>)> = self
            .hashes
            .iter()
            .filter(|(key, _)| prefixes.is_empty() || prefixes.iter().any(|p| key.starts_with(p.as_str())))
            .collect();

        let mut items = vec![Reply::Int(matching.len() as i64)];
        for (key, hash) in matching.into_iter().skip(offset).take(limit) {
            items.push(Reply::bulk(key.as_str()));
            let mut fields = Vec::new();
            for (field, value) in hash {
                if returns.as_ref().is_none_or(|r| r.contains(field)) {
                    fields.push(Reply::bulk(field.as_str()));
                    fields.push(Reply::Bulk(value.clone()));
                }
            }
            fields.push(Reply::bulk("distance"));
            fields.push(Reply::bulk("0"));
            items.push(Reply::Array(fields));
        }
        Ok(Reply::Array(items))
    }
}

fn parse_prefixes(command: &Command) -> Vec<String> {
    let tokens = command.tokens();
    let Some(at) = tokens.iter().position(|t| t == "PREFIX") else {
        return Vec::new();
    };
    let n: usize = tokens.get(at + 1).and_then(|n| n.parse().ok()).unwrap_or(0);
    tokens.iter().skip(at + 2).take(n).cloned().collect()
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, command: Command) -> Result<Reply> {
        let mut state = self.state.lock().await;
        state.log.push(command.clone());
        if state.unreachable {
            return Err(Error::connection(format!("{}: connection refused", command.name())));
        }
        state.apply(&command)
    }

    async fn execute_pipeline(&self, commands: Vec<Command>) -> Result<Vec<Result<Reply>>> {
        let mut state = self.state.lock().await;
        state.log.extend(commands.iter().cloned());
        if state.unreachable {
            return Err(Error::connection(format!(
                "pipeline of {} commands: connection refused",
                commands.len()
            )));
        }
        Ok(commands.iter().map(|c| state.apply(c)).collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hset(key: &str) -> Command {
        Command::new("HSET").arg(key).arg("content").arg("x")
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let mock = MockExecutor::new();
        let info = Command::new("FT.INFO").arg("idx");

        let err = mock.execute(info.clone()).await.unwrap_err();
        assert!(err.is_unknown_index());

        let create = Command::new("FT.CREATE")
            .arg("idx")
            .arg("ON")
            .arg("HASH")
            .arg("PREFIX")
            .arg("1")
            .arg("doc:idx");
        assert_eq!(mock.execute(create.clone()).await.unwrap(), Reply::Okay);
        assert!(mock.execute(info.clone()).await.is_ok());
        assert!(mock.execute(create).await.unwrap_err().is_index_exists());

        mock.execute(hset("doc:idx:1")).await.unwrap();
        mock.execute(hset("other:1")).await.unwrap();
        mock.execute(Command::new("FT.DROPINDEX").arg("idx").arg("DD"))
            .await
            .unwrap();
        assert!(!mock.has_index("idx").await);
        assert_eq!(mock.keys().await, vec!["other:1".to_string()]);
        assert_eq!(mock.count("FT.INFO").await, 2);
    }

    #[tokio::test]
    async fn test_pipeline_isolates_failures() {
        let mock = MockExecutor::new();
        mock.fail_key("b").await;

        let replies = mock
            .execute_pipeline(vec![hset("a"), hset("b"), hset("c")])
            .await
            .unwrap();
        assert!(replies[0].is_ok());
        assert!(matches!(replies[1], Err(Error::Command { .. })));
        assert!(replies[2].is_ok());
        assert_eq!(mock.keys().await, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let mock = MockExecutor::new();
        mock.set_unreachable(true).await;
        assert!(matches!(
            mock.execute(hset("a")).await,
            Err(Error::Connection(_))
        ));
        assert!(mock.execute_pipeline(vec![hset("a")]).await.is_err());
    }

    #[tokio::test]
    async fn test_search_returns_stored_hashes() {
        let mock = MockExecutor::with_indexes(["idx"]);
        mock.execute(hset("k1")).await.unwrap();
        mock.execute(hset("k2")).await.unwrap();

        let search = Command::new("FT.SEARCH")
            .arg("idx")
            .arg("(*)")
            .arg("LIMIT")
            .arg("0")
            .arg("1");
        let Reply::Array(items) = mock.execute(search).await.unwrap() else {
            unreachable!("expected array reply");
        };
        assert_eq!(items[0], Reply::Int(2));
        assert_eq!(items[1], Reply::bulk("k1"));
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_canned_search_reply() {
        let mock = MockExecutor::with_indexes(["idx"]);
        mock.set_search_reply(Reply::Array(vec![Reply::Int(0)])).await;
        let reply = mock
            .execute(Command::new("FT.SEARCH").arg("idx"))
            .await
            .unwrap();
        assert_eq!(reply, Reply::Array(vec![Reply::Int(0)]));
    }
}
