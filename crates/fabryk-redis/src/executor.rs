//! Command executor trait and the redis-rs implementation.
//!
//! The store never talks to the network directly. It hands [`Command`]s to a
//! [`CommandExecutor`] and reads back protocol-neutral [`Reply`] values.
//!
//! # Implementations
//!
//! - [`RedisExecutor`]: redis-rs `ConnectionManager` (reconnects on its own)
//! - [`MockExecutor`](crate::mock::MockExecutor): in-memory engine for tests

use async_trait::async_trait;

use crate::command::Command;
use crate::error::{Error, Result};

// ============================================================================
// Reply
// ============================================================================

/// A protocol-neutral reply value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nil / absent.
    Nil,
    /// `+OK`.
    Okay,
    /// Integer reply.
    Int(i64),
    /// Double reply (RESP3).
    Double(f64),
    /// Boolean reply (RESP3).
    Bool(bool),
    /// Simple status string.
    Status(String),
    /// Binary-safe bulk string.
    Bulk(Vec<u8>),
    /// Array or set.
    Array(Vec<Reply>),
    /// Map (RESP3).
    Map(Vec<(Reply, Reply)>),
}

impl Reply {
    /// Bulk or status string as UTF-8 (lossy).
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Bulk(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::Status(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Double(d) => Some(d.to_string()),
            Self::Okay => Some("OK".to_string()),
            _ => None,
        }
    }

    /// Integer value, parsing bulk strings if needed.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bulk(_) | Self::Status(_) => self.as_string().and_then(|s| s.parse().ok()),
            _ => None,
        }
    }

    /// Shorthand for a UTF-8 bulk reply.
    pub fn bulk(s: impl Into<Vec<u8>>) -> Self {
        Self::Bulk(s.into())
    }
}

// ============================================================================
// Executor trait
// ============================================================================

/// Capability to run commands against the search engine.
///
/// Implementations must be `Send + Sync`; the store shares one executor
/// across concurrent calls.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute a single command.
    ///
    /// A server error reply becomes [`Error::Command`].
    async fn execute(&self, command: Command) -> Result<Reply>;

    /// Execute commands as one pipelined round trip.
    ///
    /// The outer `Result` fails only when the round trip itself fails; each
    /// inner `Result` carries that command's own reply or error, so one
    /// failing command never hides the others.
    async fn execute_pipeline(&self, commands: Vec<Command>) -> Result<Vec<Result<Reply>>> {
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            replies.push(self.execute(command).await);
        }
        Ok(replies)
    }

    /// Executor name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// redis-rs implementation
// ============================================================================

/// Executor backed by a redis-rs connection manager.
#[derive(Clone)]
pub struct RedisExecutor {
    connection: redis::aio::ConnectionManager,
}

impl RedisExecutor {
    /// Connect to `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::connection(format!("invalid redis URL '{url}': {e}")))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::connection(format!("failed to connect to {url}: {e}")))?;
        log::debug!("Connected to redis at {url}");
        Ok(Self { connection })
    }

    /// Wrap an existing connection manager.
    pub fn from_connection(connection: redis::aio::ConnectionManager) -> Self {
        Self { connection }
    }

    fn to_redis_cmd(command: &Command) -> redis::Cmd {
        let mut cmd = redis::cmd(command.name());
        for arg in command.args() {
            cmd.arg(arg.as_slice());
        }
        cmd
    }
}

#[async_trait]
impl CommandExecutor for RedisExecutor {
    async fn execute(&self, command: Command) -> Result<Reply> {
        let mut conn = self.connection.clone();
        let value: redis::Value = Self::to_redis_cmd(&command)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(command.name(), e))?;
        convert_value(command.name(), value)
    }

    async fn execute_pipeline(&self, commands: Vec<Command>) -> Result<Vec<Result<Reply>>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        pipe.ignore_errors();
        for command in &commands {
            pipe.add_command(Self::to_redis_cmd(command));
        }

        let mut conn = self.connection.clone();
        let values: Vec<redis::Value> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::connection(format!("pipeline of {} commands failed: {e}", commands.len())))?;

        if values.len() != commands.len() {
            return Err(Error::invalid_data(format!(
                "pipeline returned {} replies for {} commands",
                values.len(),
                commands.len()
            )));
        }

        Ok(commands
            .iter()
            .zip(values)
            .map(|(command, value)| convert_value(command.name(), value))
            .collect())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

impl std::fmt::Debug for RedisExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisExecutor").finish_non_exhaustive()
    }
}

fn map_redis_error(command: &str, err: redis::RedisError) -> Error {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        Error::connection(format!("{command}: {err}"))
    } else {
        Error::command(command, err.to_string())
    }
}

/// Convert a redis-rs value, turning server error replies into errors.
fn convert_value(command: &str, value: redis::Value) -> Result<Reply> {
    use redis::Value;

    Ok(match value {
        Value::Nil => Reply::Nil,
        Value::Okay => Reply::Okay,
        Value::Int(i) => Reply::Int(i),
        Value::Double(d) => Reply::Double(d),
        Value::Boolean(b) => Reply::Bool(b),
        Value::SimpleString(s) => Reply::Status(s),
        Value::BulkString(bytes) => Reply::Bulk(bytes),
        Value::VerbatimString { text, .. } => Reply::Bulk(text.into_bytes()),
        Value::Array(items) | Value::Set(items) => Reply::Array(
            items
                .into_iter()
                .map(|item| convert_value(command, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(pairs) => Reply::Map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((convert_value(command, k)?, convert_value(command, v)?)))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Attribute { data, .. } => convert_value(command, *data)?,
        Value::ServerError(err) => {
            return Err(Error::command(command, redis::RedisError::from(err).to_string()));
        }
        other => Reply::Status(format!("{other:?}")),
    })
}
