//! SFTP transport
//!
//! Every call opens its own session: connect, handshake, authenticate, open the
//! SFTP channel. The session is disconnected when the call returns.

use super::{filter_listing, validate_file_name, FileTransport};
use crate::config::SourceSection;
use fileshipper_common::{Result, ShipperError};
use regex::Regex;
use ssh2::{Session, Sftp};
use std::collections::BTreeSet;
use std::fs::File;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the session authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum SftpAuth {
    /// Private key file, optionally protected by a passphrase
    PrivateKey {
        keyfile: PathBuf,
        passphrase: Option<String>,
    },
    Password(String),
}

impl std::fmt::Debug for SftpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SftpAuth::PrivateKey { keyfile, .. } => f
                .debug_struct("PrivateKey")
                .field("keyfile", keyfile)
                .finish_non_exhaustive(),
            SftpAuth::Password(_) => f.write_str("Password(..)"),
        }
    }
}

/// Validated connection parameters of a remote section
#[derive(Debug, Clone)]
pub struct SftpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SftpAuth,
    pub remotedir: String,
    pub basedir: PathBuf,
    pub filter: Regex,
    pub timeout: Duration,
}

impl SftpSettings {
    pub fn from_section(section: &SourceSection) -> Result<Self> {
        let required = |value: &Option<String>, key: &str| -> Result<String> {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(ShipperError::config(format!(
                    "The {} is missing in section [{}] of the imports configuration",
                    key, section.name
                ))),
            }
        };

        let host = required(&section.host, "host")?;
        let username = required(&section.username, "username")?;
        let remotedir = required(&section.remotedir, "remotedir")?;

        let auth = match section.privkey_path() {
            Some(keyfile) => SftpAuth::PrivateKey {
                keyfile,
                passphrase: section.passphrase.clone().filter(|p| !p.is_empty()),
            },
            None => match &section.password {
                Some(password) => SftpAuth::Password(password.clone()),
                None => {
                    return Err(ShipperError::config(format!(
                        "Neither privkeyfile nor password is set in section [{}]",
                        section.name
                    )))
                },
            },
        };

        Ok(Self {
            host,
            port: section.port,
            username,
            auth,
            remotedir,
            basedir: section.basedir_path()?,
            filter: section.filter_regex()?,
            timeout: section.timeout(),
        })
    }

    fn remote_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.remotedir).join(file_name)
    }
}

/// An authenticated session with its SFTP channel
struct SftpSession {
    sftp: Sftp,
    session: Session,
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "fileshipper done", None) {
            warn!("Failed to disconnect SFTP session cleanly: {}", e);
        }
    }
}

/// Lists and downloads files from an SFTP server
#[derive(Debug, Clone)]
pub struct SftpTransport {
    settings: SftpSettings,
}

impl SftpTransport {
    pub fn new(settings: SftpSettings) -> Self {
        Self { settings }
    }

    fn connect(&self) -> Result<SftpSession> {
        let settings = &self.settings;
        debug!("Connecting to SFTP server: {}:{}", settings.host, settings.port);

        let address = (settings.host.as_str(), settings.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                ShipperError::config(format!("Unable to resolve host '{}'", settings.host))
            })?;

        let tcp = TcpStream::connect_timeout(&address, settings.timeout)?;
        tcp.set_read_timeout(Some(settings.timeout))?;
        tcp.set_write_timeout(Some(settings.timeout))?;

        let mut session = Session::new().map_err(ssh_error)?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(settings.timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().map_err(ssh_error)?;

        match &settings.auth {
            SftpAuth::PrivateKey { keyfile, passphrase } => {
                if !keyfile.is_file() {
                    return Err(ShipperError::config(format!(
                        "The privkeyfile '{}' does not exist",
                        keyfile.display()
                    )));
                }
                session
                    .userauth_pubkey_file(&settings.username, None, keyfile, passphrase.as_deref())
                    .map_err(|e| {
                        ShipperError::authentication(format!(
                            "Unable to authenticate as '{}' with privkeyfile and passphrase: {}",
                            settings.username, e
                        ))
                    })?;
            },
            SftpAuth::Password(password) => {
                session
                    .userauth_password(&settings.username, password)
                    .map_err(|e| {
                        ShipperError::authentication(format!(
                            "Unable to authenticate as '{}' with username and password: {}",
                            settings.username, e
                        ))
                    })?;
            },
        }

        if !session.authenticated() {
            return Err(ShipperError::authentication(format!(
                "Server {} did not accept the credentials of '{}'",
                settings.host, settings.username
            )));
        }

        let sftp = session.sftp().map_err(ssh_error)?;
        debug!("Successfully connected to SFTP server");
        Ok(SftpSession { sftp, session })
    }
}

impl FileTransport for SftpTransport {
    fn list_files(&self) -> Result<BTreeSet<String>> {
        let settings = &self.settings;
        let connection = self.connect()?;

        let entries = connection
            .sftp
            .readdir(Path::new(&settings.remotedir))
            .map_err(|e| ShipperError::io_at(&settings.remotedir, e.into()))?;

        let names = entries
            .into_iter()
            .filter(|(_, stat)| !stat.is_dir())
            .filter_map(|(path, _)| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            });

        let files = filter_listing(names, &settings.filter);
        info!(
            "Found {} files in {}:{}",
            files.len(),
            settings.host,
            settings.remotedir
        );
        Ok(files)
    }

    fn download(&self, file_name: &str) -> Result<()> {
        validate_file_name(file_name)?;

        let settings = &self.settings;
        let remote_path = settings.remote_path(file_name);
        let local_path = settings.basedir.join(file_name);
        // hidden while partial so local listings never see it
        let partial_path = settings.basedir.join(format!(".{}.part", file_name));

        let connection = self.connect()?;
        info!("Downloading {} to {}", remote_path.display(), local_path.display());

        let mut remote = connection
            .sftp
            .open(&remote_path)
            .map_err(|e| ShipperError::io_at(&remote_path, e.into()))?;

        std::fs::create_dir_all(&settings.basedir)
            .map_err(|e| ShipperError::io_at(&settings.basedir, e))?;

        let mut local =
            File::create(&partial_path).map_err(|e| ShipperError::io_at(&partial_path, e))?;
        let copied = std::io::copy(&mut remote, &mut local).map_err(|e| {
            let _ = std::fs::remove_file(&partial_path);
            ShipperError::io_at(&remote_path, e)
        })?;
        drop(local);

        std::fs::rename(&partial_path, &local_path)
            .map_err(|e| ShipperError::io_at(&local_path, e))?;

        debug!(bytes = copied, file = %file_name, "Download complete");
        Ok(())
    }
}

fn ssh_error(err: ssh2::Error) -> ShipperError {
    ShipperError::Io(err.into())
}
