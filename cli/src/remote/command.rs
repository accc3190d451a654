//! Remote command representation

/// A single remote invocation: program and arguments.
///
/// The ssh client concatenates its trailing arguments into one shell line on
/// the far side, so the command renders itself with every token quoted.
/// Privileged commands are prefixed with `sudo -n` when the session's login
/// user is not root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
    privileged: bool,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Mark the command as requiring root on the remote host
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Render the shell line sent as the ssh remote command
    pub fn shell_line(&self, needs_sudo: bool) -> String {
        let mut tokens: Vec<String> = Vec::with_capacity(self.args.len() + 3);
        if self.privileged && needs_sudo {
            tokens.push("sudo".to_string());
            tokens.push("-n".to_string());
        }
        tokens.push(shell_quote(&self.program));
        tokens.extend(self.args.iter().map(|a| shell_quote(a)));
        tokens.join(" ")
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shell_line(false))
    }
}

/// One step of a stage's remote plan
#[derive(Debug, Clone)]
pub struct PlannedStep {
    /// What the step does, used in log and warning lines
    pub label: String,

    /// The command to run
    pub command: RemoteCommand,

    /// Tolerated steps downgrade failure to a stage warning
    pub tolerated: bool,
}

impl PlannedStep {
    /// A step whose failure aborts the stage
    pub fn required(label: impl Into<String>, command: RemoteCommand) -> Self {
        Self {
            label: label.into(),
            command,
            tolerated: false,
        }
    }

    /// A step whose failure is logged and skipped over
    pub fn tolerated(label: impl Into<String>, command: RemoteCommand) -> Self {
        Self {
            label: label.into(),
            command,
            tolerated: true,
        }
    }
}

/// Quote a token for the remote shell
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/' | b':' | b'=' | b'@' | b',')
        })
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tokens_are_not_quoted() {
        assert_eq!(shell_quote("docker"), "docker");
        assert_eq!(shell_quote("/opt/widget-api"), "/opt/widget-api");
        assert_eq!(shell_quote("8080:8080"), "8080:8080");
    }

    #[test]
    fn unsafe_tokens_are_single_quoted() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("$(reboot)"), "'$(reboot)'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn shell_line_quotes_every_token() {
        let cmd = RemoteCommand::new("docker")
            .args(["run", "-d", "--name"])
            .arg("widget api");
        assert_eq!(cmd.shell_line(false), "docker run -d --name 'widget api'");
    }

    #[test]
    fn privileged_commands_gain_sudo_for_non_root() {
        let cmd = RemoteCommand::new("systemctl")
            .args(["reload", "nginx"])
            .privileged();
        assert_eq!(cmd.shell_line(true), "sudo -n systemctl reload nginx");
        assert_eq!(cmd.shell_line(false), "systemctl reload nginx");
    }

    #[test]
    fn unprivileged_commands_never_gain_sudo() {
        let cmd = RemoteCommand::new("true");
        assert_eq!(cmd.shell_line(true), "true");
    }
}
