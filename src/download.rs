//! Fetching the scanner bootstrap script into the workspace tools directory.
//!
//! Downloads are cached by file name: if the script already exists under the
//! install directory it is reused without touching the network. A transfer
//! streams into a `.part` file and is renamed into place only on success, so
//! an interrupted download can never satisfy a later cache check.

use crate::cancel::CancellationToken;
use crate::config::ProxyDescriptor;
use crate::error::{Error, Result};
use crate::strategy::script::INSTALL_SUBDIRECTORY;
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed transfer timeout; deliberately generous and not user-tunable.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Downloads bootstrap scripts into `<tools_dir>/Detect_Installation/`.
pub struct ScriptFetcher {
    tools_dir: PathBuf,
    proxy: Option<ProxyDescriptor>,
}

impl ScriptFetcher {
    pub fn new(tools_dir: PathBuf, proxy: Option<ProxyDescriptor>) -> Self {
        Self { tools_dir, proxy }
    }

    /// Returns the local path of the script for `url`, downloading it if it
    /// is not already cached.
    pub fn ensure_script(&self, url: &str, cancel: &CancellationToken) -> Result<PathBuf> {
        let file_name = url
            .rsplit('/')
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!("Could not derive a script file name from {url}"))
            })?;

        let install_dir = self.tools_dir.join(INSTALL_SUBDIRECTORY);
        let target = install_dir.join(file_name);

        if target.exists() {
            info!("Running already installed script {}", target.display());
            return Ok(target);
        }

        fs::create_dir_all(&install_dir).map_err(|e| Error::Download {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        cancel.check("script download")?;
        info!("Downloading script from {} to {}", url, target.display());

        let part = install_dir.join(format!("{file_name}.part"));
        if let Err(e) = self.transfer(url, &part, cancel) {
            let _ = fs::remove_file(&part);
            return Err(e);
        }

        fs::rename(&part, &target).map_err(|e| Error::Download {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        cancel.check("script download")?;
        debug!("Script downloaded to {}", target.display());
        Ok(target)
    }

    fn transfer(&self, url: &str, part: &PathBuf, cancel: &CancellationToken) -> Result<()> {
        let download_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::Download {
            url: url.to_string(),
            source,
        };

        let mut builder = reqwest::blocking::Client::builder().timeout(DOWNLOAD_TIMEOUT);
        if let Some(proxy) = &self.proxy {
            let mut proxy_config =
                reqwest::Proxy::all(format!("http://{}:{}", proxy.host, proxy.port))
                    .map_err(|e| download_error(Box::new(e)))?;
            if let Some(username) = &proxy.username {
                proxy_config = proxy_config
                    .basic_auth(username, proxy.password.as_deref().unwrap_or_default());
            }
            builder = builder.proxy(proxy_config);
        }
        let client = builder.build().map_err(|e| download_error(Box::new(e)))?;

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| download_error(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(download_error(
                format!("unexpected HTTP status {}", response.status()).into(),
            ));
        }

        let mut file = File::create(part).map_err(|e| download_error(Box::new(e)))?;
        io::copy(&mut response, &mut file).map_err(|e| {
            if e.kind() == io::ErrorKind::Interrupted {
                cancel.cancel();
                Error::Interrupted("script download was interrupted".to_string())
            } else {
                download_error(Box::new(e))
            }
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::script::SHELL_SCRIPT_URL;

    #[test]
    fn test_cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join(INSTALL_SUBDIRECTORY);
        fs::create_dir_all(&install_dir).unwrap();
        fs::write(install_dir.join("detect.sh"), "#!/bin/sh\n").unwrap();

        // The URL's host does not resolve; a network attempt would fail.
        let fetcher = ScriptFetcher::new(dir.path().to_path_buf(), None);
        let path = fetcher
            .ensure_script("https://scanner.invalid/detect.sh", &CancellationToken::new())
            .unwrap();

        assert_eq!(path, install_dir.join("detect.sh"));
    }

    #[test]
    fn test_unreachable_host_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ScriptFetcher::new(dir.path().to_path_buf(), None);

        let err = fetcher
            .ensure_script("http://127.0.0.1:9/detect.sh", &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, Error::Download { .. }), "got: {err}");
        let install_dir = dir.path().join(INSTALL_SUBDIRECTORY);
        assert!(
            !install_dir.join("detect.sh.part").exists(),
            "no partial file may be left behind"
        );
    }

    #[test]
    fn test_cancelled_token_interrupts_before_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ScriptFetcher::new(dir.path().to_path_buf(), None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher.ensure_script(SHELL_SCRIPT_URL, &cancel).unwrap_err();
        assert!(matches!(err, Error::Interrupted(_)), "got: {err}");
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_url_without_file_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ScriptFetcher::new(dir.path().to_path_buf(), None);

        let err = fetcher
            .ensure_script("https://scanner.invalid/", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_file_name_derived_from_last_segment() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join(INSTALL_SUBDIRECTORY);
        fs::create_dir_all(&install_dir).unwrap();
        fs::write(install_dir.join("detect.ps1"), "").unwrap();

        let fetcher = ScriptFetcher::new(dir.path().to_path_buf(), None);
        let path = fetcher
            .ensure_script("https://scanner.invalid/path/to/detect.ps1", &CancellationToken::new())
            .unwrap();
        assert!(path.ends_with("detect.ps1"));
    }
}
