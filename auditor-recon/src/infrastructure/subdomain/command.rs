//! Enumerators backed by external binaries (subfinder, amass, sublist3r)

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, error, instrument};

use auditor_core::domain::scan::ScanOptions;

use crate::domain::{AdapterError, SubdomainCandidates, ToolAdapter, normalize_hostname};
use crate::infrastructure::classify_spawn_error;

const DOMAIN_PLACEHOLDER: &str = "{domain}";

/// Runs an enumeration binary and reads one hostname per stdout line
pub struct CommandSource {
    name: String,
    executable: String,
    /// Arguments; `{domain}` is replaced with the target domain
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(name: impl Into<String>, executable: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            args,
        }
    }

    /// `subfinder -d <domain> -silent`
    pub fn subfinder(executable: impl Into<String>) -> Self {
        Self::new(
            "subfinder",
            executable,
            vec!["-d".into(), DOMAIN_PLACEHOLDER.into(), "-silent".into()],
        )
    }

    /// `amass enum -passive -d <domain>`
    pub fn amass(executable: impl Into<String>) -> Self {
        Self::new(
            "amass",
            executable,
            vec![
                "enum".into(),
                "-passive".into(),
                "-d".into(),
                DOMAIN_PLACEHOLDER.into(),
            ],
        )
    }

    /// `sublist3r -d <domain> -o /dev/stdout`
    ///
    /// Banner and progress lines are not hostnames and are dropped.
    pub fn sublist3r(executable: impl Into<String>) -> Self {
        Self::new(
            "sublist3r",
            executable,
            vec![
                "-d".into(),
                DOMAIN_PLACEHOLDER.into(),
                "-o".into(),
                "/dev/stdout".into(),
            ],
        )
    }
}

#[async_trait]
impl ToolAdapter for CommandSource {
    type Output = SubdomainCandidates;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(adapter = %self.name, domain = %domain))]
    async fn run(
        &self,
        domain: &str,
        _options: &ScanOptions,
        deadline: Instant,
    ) -> Result<SubdomainCandidates, AdapterError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args.iter().map(|arg| arg.replace(DOMAIN_PLACEHOLDER, domain)))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(command = ?cmd, "Executing enumerator");

        let output = tokio::time::timeout_at(deadline, cmd.output())
            .await
            .map_err(|_| AdapterError::timeout(&self.name))?
            .map_err(|e| classify_spawn_error(&self.executable, &e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                exit_code = output.status.code(),
                stderr = %stderr.trim(),
                "Enumerator exited with failure"
            );
            return Err(AdapterError::unknown(format!(
                "{} exited with {}",
                self.name, output.status
            )));
        }

        let names: SubdomainCandidates = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(normalize_hostname)
            .collect();
        debug!(count = names.len(), "Enumerator candidates");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::AdapterErrorKind;

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let source = CommandSource::subfinder("definitely-not-installed-subfinder");
        let deadline = Instant::now() + Duration::from_secs(5);

        let err = source
            .run("example.com", &ScanOptions::default(), deadline)
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::ToolUnavailable);
    }

    #[test]
    fn test_sublist3r_writes_results_to_stdout() {
        let source = CommandSource::sublist3r("sublist3r");
        assert_eq!(source.name(), "sublist3r");
        assert_eq!(source.args, vec!["-d", "{domain}", "-o", "/dev/stdout"]);
    }

    #[tokio::test]
    async fn test_stdout_lines_become_candidates() {
        let source = CommandSource::new(
            "echo",
            "echo",
            vec!["WWW.{domain}".to_string()],
        );
        let deadline = Instant::now() + Duration::from_secs(5);

        let names = source
            .run("example.com", &ScanOptions::default(), deadline)
            .await
            .unwrap();
        assert!(names.contains("www.example.com"));
    }
}
