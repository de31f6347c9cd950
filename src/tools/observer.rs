//! Turn observer trait and implementations.

use crate::protocol::{ToolCall, TurnResult};

/// Observer for turn progress.
///
/// Implementations receive a callback for every tool line the agent prints
/// and for every completed turn. This is for observation only; the agent
/// runs its tools by itself.
///
/// # Implementation Notes
///
/// - Implementations must be lightweight; blocking delays line processing.
/// - Methods have default empty implementations for selective observation.
/// - Observers are called synchronously while the output is parsed.
///
/// # Example
///
/// ```ignore
/// use libagent::{ToolCall, TurnObserver};
///
/// struct MetricsObserver {
///     tool_calls: std::sync::atomic::AtomicUsize,
/// }
///
/// impl TurnObserver for MetricsObserver {
///     fn on_tool_call(&self, _call: &ToolCall) {
///         self.tool_calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///     }
/// }
/// ```
pub trait TurnObserver: Send + Sync {
    /// Called as soon as a `tool:` line has been parsed, before the turn ends.
    fn on_tool_call(&self, call: &ToolCall) {
        let _ = call;
    }

    /// Called when the closing prompt completes a turn.
    fn on_turn_complete(&self, turn: &TurnResult) {
        let _ = turn;
    }
}

/// Simple logging observer that logs turn events using tracing.
///
/// # Example
///
/// ```ignore
/// use libagent::{AgentSession, LoggingObserver};
/// use std::sync::Arc;
///
/// let session = AgentSession::builder()
///     .bin_path("./agent")
///     .api_key("sk-ant-...")
///     .observer(Arc::new(LoggingObserver::new()))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    level: LogLevel,
}

/// Log level for LoggingObserver.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at trace level.
    Trace,
    /// Log at debug level (default).
    #[default]
    Debug,
    /// Log at info level.
    Info,
}

impl LoggingObserver {
    /// Create a new logging observer with debug level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging observer with a specific level.
    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

impl TurnObserver for LoggingObserver {
    fn on_tool_call(&self, call: &ToolCall) {
        let input = call.input.as_deref().map(truncate).unwrap_or_default();
        match self.level {
            LogLevel::Trace => {
                tracing::trace!(tool_name = %call.name, input = %input, "tool_call");
            }
            LogLevel::Debug => {
                tracing::debug!(tool_name = %call.name, input = %input, "tool_call");
            }
            LogLevel::Info => {
                tracing::info!(tool_name = %call.name, input = %input, "tool_call");
            }
        }
    }

    fn on_turn_complete(&self, turn: &TurnResult) {
        let messages = turn.messages().count();
        let tool_calls = turn.tool_calls().count();
        match self.level {
            LogLevel::Trace => tracing::trace!(messages, tool_calls, "turn_complete"),
            LogLevel::Debug => tracing::debug!(messages, tool_calls, "turn_complete"),
            LogLevel::Info => tracing::info!(messages, tool_calls, "turn_complete"),
        }
    }
}

/// Shorten tool input for logging, on a char boundary.
fn truncate(input: &str) -> String {
    const LIMIT: usize = 200;
    match input.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}... ({} bytes total)", &input[..cut], input.len()),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn turn_observer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TurnObserver>();
        assert_send_sync::<LoggingObserver>();
    }

    #[test]
    fn logging_observer_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<LoggingObserver>();
    }

    struct CountingObserver {
        tool_calls: AtomicUsize,
        turns: AtomicUsize,
    }

    impl CountingObserver {
        fn new() -> Self {
            Self {
                tool_calls: AtomicUsize::new(0),
                turns: AtomicUsize::new(0),
            }
        }
    }

    impl TurnObserver for CountingObserver {
        fn on_tool_call(&self, _call: &ToolCall) {
            self.tool_calls.fetch_add(1, Ordering::Relaxed);
        }

        fn on_turn_complete(&self, _turn: &TurnResult) {
            self.turns.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn counting_observer_tracks_calls() {
        let observer = CountingObserver::new();

        observer.on_tool_call(&ToolCall::with_input("read_file", "main.go"));
        observer.on_tool_call(&ToolCall::new("list_files"));
        observer.on_turn_complete(&TurnResult::default());

        assert_eq!(observer.tool_calls.load(Ordering::Relaxed), 2);
        assert_eq!(observer.turns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn default_trait_methods_are_no_ops() {
        struct EmptyObserver;
        impl TurnObserver for EmptyObserver {}

        let observer = EmptyObserver;
        observer.on_tool_call(&ToolCall::new("ping"));
        observer.on_turn_complete(&TurnResult::default());
    }

    #[test]
    fn logging_observer_all_levels() {
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Info] {
            let observer = LoggingObserver::with_level(level);
            observer.on_tool_call(&ToolCall::with_input("calc", "1 + 2"));
            observer.on_turn_complete(&TurnResult::default());
        }
    }

    #[test]
    fn truncate_long_input() {
        let long = "é".repeat(300);
        let short = truncate(&long);
        assert!(short.starts_with(&"é".repeat(200)));
        assert!(short.ends_with("(600 bytes total)"));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn arc_observer_works() {
        let observer: Arc<dyn TurnObserver> = Arc::new(CountingObserver::new());
        observer.on_tool_call(&ToolCall::new("ping"));
    }
}
