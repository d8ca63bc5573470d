use std::process::{Command, Stdio};

/// Runtime environment wrapper for wrapped tool invocations.  The
/// orchestration treats this as opaque: it hands over an argument vector
/// and receives the vector to actually execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvWrapper {
    /// Run inside a named conda environment via `conda run`
    Conda { env: String },
    /// Run the command as given
    Direct,
}

impl EnvWrapper {
    pub fn conda(env: &str) -> Self {
        Self::Conda {
            env: env.to_owned(),
        }
    }

    /// Prefix the argument vector with whatever is needed to run inside
    /// the environment
    pub fn wrap(&self, argv: Vec<String>) -> Vec<String> {
        match self {
            Self::Conda { env } => {
                let mut v = vec![
                    String::from("conda"),
                    String::from("run"),
                    String::from("-n"),
                    env.clone(),
                ];
                v.extend(argv);
                v
            }
            Self::Direct => argv,
        }
    }

    /// Check whether an external tool resolves inside the environment
    pub fn tool_exists(&self, tool: &str) -> bool {
        let argv = self.wrap(vec![
            String::from("sh"),
            String::from("-c"),
            format!("command -v {} >/dev/null 2>&1", tool),
        ]);
        Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Warn about wrapped tools that cannot be found.  Jobs are still
    /// allowed to run; a missing tool shows up as a launch failure in the
    /// job log.
    pub fn check_tools(&self, tools: &[&str]) {
        for t in tools {
            if !self.tool_exists(t) {
                match self {
                    Self::Conda { env } => {
                        warn!("Tool {} not found in conda environment {}", t, env)
                    }
                    Self::Direct => warn!("Tool {} not found on PATH", t),
                }
            }
        }
    }
}
