//! SSH-backed remote execution.
//!
//! The node runs the same `scanlaunch` binary this controller runs: the
//! setup computation is serialized to JSON, piped into `scanlaunch
//! setup-task` on the node, and the resulting token list is read back from
//! its stdout. The launch itself goes through the node's shell with every
//! token quoted, so the process receives exactly the assembled argv.

use crate::cancel::CancellationToken;
use crate::config::RemoteConfig;
use crate::environment::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::os::OsFamily;
use crate::remote::retry::{diagnose_ssh_error, retry_with_backoff, RetryConfig};
use crate::remote::{RemoteExecutor, SetupTask};
use log::{debug, info, warn};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

pub struct SshExecutor {
    config: RemoteConfig,
    retry_config: RetryConfig,
    cancel: CancellationToken,
}

impl SshExecutor {
    pub fn new(config: RemoteConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            retry_config: RetryConfig::default(),
            cancel,
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn connect(&self) -> Result<Session> {
        info!("Connecting to {}", self.config.connection_string());

        let connection_str = format!(
            "SSH connection to {}:{}",
            self.config.host, self.config.port
        );

        let result = retry_with_backoff(
            &self.retry_config,
            &self.cancel,
            || self.connect_once(),
            &connection_str,
        );

        match result {
            Err(e @ Error::Interrupted(_)) => Err(e),
            Err(e) => Err(Error::Remote(diagnose_ssh_error(
                &e,
                &self.config.host,
                self.config.port,
                self.config.ssh_key.as_deref(),
            ))),
            ok => ok,
        }
    }

    fn connect_once(&self) -> Result<Session> {
        use std::net::ToSocketAddrs;

        debug!(
            "Attempting SSH connection to {}:{}",
            self.config.host, self.config.port
        );

        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| {
                Error::Remote(format!("Failed to resolve host '{}': {}", self.config.host, e))
            })?
            .next()
            .ok_or_else(|| {
                Error::Remote(format!("No addresses found for host '{}'", self.config.host))
            })?;

        let timeout = Duration::from_secs(self.config.timeout);
        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| self.cancel.classify_io("SSH connection", e))?;
        tcp.set_read_timeout(Some(timeout)).map_err(Error::Io)?;
        tcp.set_write_timeout(Some(timeout)).map_err(Error::Io)?;

        let mut sess = Session::new()
            .map_err(|e| Error::Remote(format!("Failed to create SSH session: {e}")))?;
        sess.set_tcp_stream(tcp);
        sess.handshake()
            .map_err(|e| Error::Remote(format!("SSH handshake failed: {e}")))?;

        self.authenticate(&mut sess)?;
        Ok(sess)
    }

    fn authenticate(&self, sess: &mut Session) -> Result<()> {
        debug!("Authenticating as user: {}", self.config.user);

        if let Some(key_path) = self.config.expanded_ssh_key() {
            match sess.userauth_pubkey_file(&self.config.user, None, &key_path, None) {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Public key authentication failed: {e}"),
            }
        }

        match sess.userauth_agent(&self.config.user) {
            Ok(_) => return Ok(()),
            Err(e) => warn!("Agent authentication failed: {e}"),
        }

        Err(Error::Remote(format!(
            "SSH authentication failed for user {}. Tried: {}, agent",
            self.config.user,
            self.config.ssh_key.as_deref().unwrap_or("no key specified")
        )))
    }

    /// Quotes one token for a POSIX shell.
    fn shell_quote(token: &str) -> String {
        if !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_./=:".contains(c))
        {
            return token.to_string();
        }
        format!("'{}'", token.replace('\'', "'\\''"))
    }

    /// Renders argv plus environment into one shell command for the node.
    fn render_command(os_family: OsFamily, argv: &[String], env: &EnvironmentSnapshot) -> String {
        match os_family {
            OsFamily::Posix => {
                let mut parts = Vec::new();
                if !env.is_empty() {
                    parts.push("env".to_string());
                    for (name, value) in env.iter() {
                        parts.push(Self::shell_quote(&format!("{name}={value}")));
                    }
                }
                parts.extend(argv.iter().map(|t| Self::shell_quote(t)));
                parts.join(" ")
            }
            OsFamily::Windows => {
                // cmd.exe quoting: pre-quoted composite tokens pass through.
                let mut command = String::new();
                for (name, value) in env.iter() {
                    command.push_str(&format!("set \"{name}={value}\" && "));
                }
                let rendered: Vec<String> = argv
                    .iter()
                    .map(|t| {
                        if t.starts_with('"') || !t.contains(' ') {
                            t.clone()
                        } else {
                            format!("\"{t}\"")
                        }
                    })
                    .collect();
                command.push_str(&rendered.join(" "));
                command
            }
        }
    }
}

impl RemoteExecutor for SshExecutor {
    fn os_family(&self) -> OsFamily {
        self.config.os_family
    }

    fn setup(&self, task: &SetupTask) -> Result<Vec<String>> {
        self.cancel.check("remote setup")?;

        let payload = serde_json::to_string(task)
            .map_err(|e| Error::Remote(format!("Failed to encode setup task: {e}")))?;

        let sess = self.connect()?;
        let mut channel = sess
            .channel_session()
            .map_err(|e| Error::Remote(format!("Failed to open channel: {e}")))?;

        let command = format!("{} setup-task", self.config.scanlaunch_path);
        debug!("Executing remote setup: {command}");
        channel
            .exec(&command)
            .map_err(|e| Error::Remote(format!("Failed to execute setup command: {e}")))?;

        channel
            .write_all(payload.as_bytes())
            .map_err(|e| self.cancel.classify_io("remote setup", e))?;
        channel
            .send_eof()
            .map_err(|e| Error::Remote(format!("Failed to close setup stdin: {e}")))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| self.cancel.classify_io("remote setup", e))?;

        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(Error::Io)?;
        for line in stderr.lines() {
            debug!("[{}] {}", self.config.host, line);
        }

        channel
            .wait_close()
            .map_err(|e| Error::Remote(format!("Failed to close channel: {e}")))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| Error::Remote(format!("Failed to get exit status: {e}")))?;

        self.cancel.check("remote setup")?;

        if exit_code != 0 {
            return Err(Error::Remote(format!(
                "Remote setup on {} failed with exit code {}: {}",
                self.config.host,
                exit_code,
                stderr.trim()
            )));
        }

        let tokens_line = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| {
                Error::Remote(format!(
                    "Remote setup on {} produced no output",
                    self.config.host
                ))
            })?;

        serde_json::from_str(tokens_line).map_err(|e| {
            Error::Remote(format!("Failed to decode remote setup response: {e}"))
        })
    }

    fn launch(&self, argv: &[String], env: &EnvironmentSnapshot) -> Result<i32> {
        self.cancel.check("scanner launch")?;

        let command = Self::render_command(self.config.os_family, argv, env);
        info!("Launching scanner on {}: {}", self.config.host, command);

        let sess = self.connect()?;
        let mut channel = sess
            .channel_session()
            .map_err(|e| Error::Remote(format!("Failed to open channel: {e}")))?;
        channel
            .exec(&command)
            .map_err(|e| Error::Remote(format!("Failed to launch scanner: {e}")))?;

        // Stream scanner output as it arrives.
        let mut buffer = [0u8; 4096];
        loop {
            self.cancel.check("scanner launch")?;
            match channel.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    let mut out = std::io::stdout();
                    let _ = out.write_all(&buffer[..n]);
                    let _ = out.flush();
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(self.cancel.classify_io("scanner launch", e)),
            }
        }

        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(Error::Io)?;
        if !stderr.is_empty() {
            eprint!("{stderr}");
        }

        channel
            .wait_close()
            .map_err(|e| Error::Remote(format!("Failed to close channel: {e}")))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| Error::Remote(format!("Failed to get exit status: {e}")))?;

        self.cancel.check("scanner launch")?;
        debug!("Scanner exit code: {exit_code}");
        Ok(exit_code)
    }
}
