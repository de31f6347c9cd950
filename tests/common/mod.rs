//! Test utilities for libagent integration tests.
//!
//! Scenarios are small `sh` programs that speak the agent's REPL protocol:
//! print a banner, print `You: ` without a newline, read a line, reply, and
//! prompt again.

#![allow(dead_code)]

use std::time::Duration;

use libagent::{AgentSession, SessionBuilder};

/// Builder for scripted agent replies.
///
/// Every step is run once per request, in order, with the request text in
/// `$line`.
pub struct ScenarioBuilder {
    banner: Option<String>,
    colored_prompt: bool,
    steps: Vec<String>,
}

impl ScenarioBuilder {
    /// Create a new scenario with the usual banner.
    pub fn new() -> Self {
        Self {
            banner: Some("Chat with the agent (use 'ctrl-c' to quit)".to_string()),
            colored_prompt: false,
            steps: Vec::new(),
        }
    }

    /// Print the prompt wrapped in color codes.
    pub fn colored_prompt(mut self) -> Self {
        self.colored_prompt = true;
        self
    }

    /// Reply with a fixed message line.
    pub fn message(self, text: &str) -> Self {
        self.raw_line(&format!("Agent: {text}"))
    }

    /// Reply with the request text.
    pub fn echo(mut self) -> Self {
        self.steps.push("printf 'Agent: %s\\n' \"$line\"".to_string());
        self
    }

    /// Reply with a message wrapped in color codes the way the agent prints it.
    pub fn colored_message(mut self, text: &str) -> Self {
        self.steps.push(format!(
            "printf '\\033[93mAgent\\033[0m: %s\\n' {}",
            quote(text)
        ));
        self
    }

    /// Report a tool invocation.
    pub fn tool(self, name: &str, input: &str) -> Self {
        self.raw_line(&format!("tool: {name}({input})"))
    }

    /// Report a tool invocation wrapped in color codes.
    pub fn colored_tool(mut self, name: &str, input: &str) -> Self {
        self.steps.push(format!(
            "printf '\\033[92mtool\\033[0m: %s\\n' {}",
            quote(&format!("{name}({input})"))
        ));
        self
    }

    /// Print a line verbatim.
    pub fn raw_line(mut self, text: &str) -> Self {
        self.steps.push(format!("printf '%s\\n' {}", quote(text)));
        self
    }

    /// Reply with the value of an environment variable.
    pub fn env_message(mut self, var: &str) -> Self {
        self.steps
            .push(format!("printf 'Agent: %s\\n' \"${{{var}}}\""));
        self
    }

    /// Reply with the working directory.
    pub fn pwd_message(mut self) -> Self {
        self.steps.push("printf 'Agent: %s\\n' \"$(pwd)\"".to_string());
        self
    }

    /// Pause before the next step.
    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps
            .push(format!("sleep {:.3}", duration.as_secs_f64()));
        self
    }

    /// Block on stdin without replying further.
    ///
    /// Uses the shell's own `read`, so killing the agent closes its stdout.
    pub fn hang(mut self) -> Self {
        self.steps.push("IFS= read -r _".to_string());
        self
    }

    /// Exit the agent at this point of the reply.
    pub fn exit(mut self) -> Self {
        self.steps.push("exit 0".to_string());
        self
    }

    /// Render the scenario as an `sh -c` program.
    pub fn script(&self) -> String {
        let prompt = if self.colored_prompt {
            "printf '\\033[94mYou\\033[0m: '"
        } else {
            "printf 'You: '"
        };

        let mut script = String::new();
        if let Some(banner) = &self.banner {
            script.push_str(&format!("printf '%s\\n\\n' {}\n", quote(banner)));
        }
        script.push_str(prompt);
        script.push('\n');
        script.push_str("while IFS= read -r line; do\n");
        for step in &self.steps {
            script.push_str("  ");
            script.push_str(step);
            script.push('\n');
        }
        script.push_str("  ");
        script.push_str(prompt);
        script.push_str("\ndone\n");
        script
    }

    /// Session builder running this scenario.
    pub fn builder(&self) -> SessionBuilder {
        AgentSession::builder()
            .api_key("test-key")
            .bin_path("sh")
            .args(["-c".to_string(), self.script()])
            .working_directory(std::env::temp_dir())
    }

    /// Build a stopped session running this scenario.
    pub fn build(&self) -> AgentSession {
        self.builder().build().expect("scenario config is valid")
    }

    /// Build and start a session running this scenario.
    pub fn start(&self) -> AgentSession {
        let session = self.build();
        session.start();
        assert!(session.is_running(), "scenario agent should be running");
        session
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a string for `sh`.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

/// Wait until the session reports its agent as stopped.
pub async fn wait_until_stopped(session: &AgentSession) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("agent should stop");
}
