//! The session state machine: owns the control socket, serializes every
//! RPC, and drives the authorization sub-dialog.

use std::cell::Cell;
use std::io::Write;
use std::marker::PhantomData;
use std::net::TcpStream;
use std::time::Duration;

use log::debug;

use crate::auth::CredentialProvider;
use crate::codec::{self, DeviceEntry};
use crate::enums::RpcOp;
use crate::error::Status;
use crate::wire;
use crate::Error;

/// SANE version word for protocol 1.0.3: `[major=1, minor=0, build=3]`
/// packed as `major<<24 | minor<<16 | build`.
pub const PROTOCOL_VERSION: u32 = 0x0100_0003;

/// Default SANE daemon port.
pub const DEFAULT_PORT: u16 = 6566;

/// The four legal session states. `DeviceOpen` and `Scanning` both carry
/// the open device's handle word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Fresh,
    Initialized,
    DeviceOpen(u32),
    Scanning(u32),
}

/// Connection parameters consumed by [`Session::connect`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub port: u16,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// Identity sent in the INIT handshake. Most daemons accept anything
    /// non-empty.
    pub user_name: String,
    /// Whether `Session` may fall back to the MD5-challenge wire form
    /// instead of cleartext during authorization.
    /// Defaults to `false`: most deployed `saned` builds mishandle the
    /// `$MD5$` separator.
    pub allow_md5_auth: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: None,
            read_timeout: None,
            user_name: "sanelink".to_string(),
            allow_md5_auth: false,
        }
    }
}

/// An open connection to a SANE daemon. Owns one control socket and, for
/// the duration of a scan, one transient data socket opened by
/// [`crate::device::scan`].
///
/// `Session` is `!Sync` by construction, since no interior
/// synchronization guards the control socket, so at most one request may
/// be in flight at a time, but remains `Send` so a whole session may be
/// handed to a worker thread, one session per thread.
pub struct Session<C> {
    pub(crate) control: TcpStream,
    pub(crate) host: String,
    pub(crate) config: SessionConfig,
    pub(crate) credentials: C,
    state: SessionState,
    /// Forces `!Sync` regardless of `C`: the control socket has no
    /// internal locking, so two threads must never share a `&Session`.
    _not_sync: PhantomData<Cell<()>>,
}

impl<C: CredentialProvider> Session<C> {
    /// Connects to `host` and performs the INIT handshake.
    pub fn connect(host: &str, config: SessionConfig, credentials: C) -> Result<Self, Error> {
        let control = if let Some(timeout) = config.connect_timeout {
            let addr = (host, config.port).to_socket_addrs_single()?;
            TcpStream::connect_timeout(&addr, timeout)?
        } else {
            TcpStream::connect((host, config.port))?
        };
        control.set_read_timeout(config.read_timeout)?;
        control.set_nodelay(true)?;

        let mut session = Self {
            control,
            host: host.to_string(),
            config,
            credentials,
            state: SessionState::Fresh,
            _not_sync: PhantomData,
        };
        session.handshake()?;
        Ok(session)
    }

    fn handshake(&mut self) -> Result<(), Error> {
        debug!("dispatching {:?}", RpcOp::Init);
        wire::write_word(&mut self.control, RpcOp::Init.to_word())?;
        wire::write_word(&mut self.control, PROTOCOL_VERSION)?;
        wire::write_string(&mut self.control, &self.config.user_name)?;
        self.control.flush()?;

        let status = Status::from_word(wire::read_word(&mut self.control)?);
        let _echoed_version = wire::read_word(&mut self.control)?;
        status.into_result()?;

        self.state = SessionState::Initialized;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn require_initialized(&self) -> Result<(), Error> {
        match self.state {
            SessionState::Fresh => Err(Error::invalid_state(
                "session has not completed the INIT handshake",
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn require_device_open(&self) -> Result<u32, Error> {
        match self.state {
            SessionState::DeviceOpen(handle) => Ok(handle),
            _ => Err(Error::invalid_state(
                "no device is open on this session",
            )),
        }
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// GET_DEVICES.
    pub fn list_devices(&mut self) -> Result<Vec<DeviceEntry>, Error> {
        self.require_initialized()?;
        debug!("dispatching {:?}", RpcOp::GetDevices);
        wire::write_word(&mut self.control, RpcOp::GetDevices.to_word())?;
        self.control.flush()?;

        let status = Status::from_word(wire::read_word(&mut self.control)?);
        status.into_result()?;
        codec::read_device_list(&mut self.control)
    }

    /// OPEN. Drives the authorization sub-dialog if the reply carries a
    /// non-empty resource string.
    pub fn open_device(&mut self, name: &str) -> Result<crate::device::DeviceHandle, Error> {
        self.require_initialized()?;
        if let SessionState::DeviceOpen(_) | SessionState::Scanning(_) = self.state {
            return Err(Error::invalid_state(
                "a device is already open on this session",
            ));
        }

        debug!("dispatching {:?}", RpcOp::Open);
        wire::write_word(&mut self.control, RpcOp::Open.to_word())?;
        wire::write_string(&mut self.control, name)?;
        self.control.flush()?;

        let mut status = Status::from_word(wire::read_word(&mut self.control)?);
        let mut handle = wire::read_word(&mut self.control)?;
        let mut resource = wire::read_string(&mut self.control)?;

        if !resource.is_empty() {
            self.authorize(&resource)?;
            debug!("dispatching {:?} (post-auth retry)", RpcOp::Open);
            wire::write_word(&mut self.control, RpcOp::Open.to_word())?;
            wire::write_string(&mut self.control, name)?;
            self.control.flush()?;
            status = Status::from_word(wire::read_word(&mut self.control)?);
            handle = wire::read_word(&mut self.control)?;
            resource = wire::read_string(&mut self.control)?;
        }
        let _ = resource;
        status.into_result()?;

        self.state = SessionState::DeviceOpen(handle);
        Ok(crate::device::DeviceHandle::new(handle))
    }

    /// CLOSE. Drops back to `Initialized` regardless of the daemon's
    /// reply.
    pub fn close_device(&mut self) -> Result<(), Error> {
        let handle = self.require_device_open()?;
        debug!("dispatching {:?}", RpcOp::Close);
        wire::write_word(&mut self.control, RpcOp::Close.to_word())?;
        wire::write_word(&mut self.control, handle)?;
        self.control.flush()?;
        let _discard = wire::read_word(&mut self.control)?;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// CANCEL: advisory, remains in `DeviceOpen`.
    pub fn cancel(&mut self) -> Result<(), Error> {
        let handle = self.require_device_open()?;
        debug!("dispatching {:?}", RpcOp::Cancel);
        wire::write_word(&mut self.control, RpcOp::Cancel.to_word())?;
        wire::write_word(&mut self.control, handle)?;
        self.control.flush()?;
        let _discard = wire::read_word(&mut self.control)?;
        self.state = SessionState::DeviceOpen(handle);
        Ok(())
    }

    /// Runs the authorization sub-dialog for `resource`: queries the
    /// installed [`CredentialProvider`], sends AUTHORIZE, and
    /// discards the reply word. Fails with [`Error::AuthDenied`] if the
    /// provider cannot answer.
    pub(crate) fn authorize(&mut self, resource: &str) -> Result<(), Error> {
        let Some(creds) = self.credentials.provide(resource) else {
            return Err(Error::AuthDenied(resource.to_string()));
        };

        debug!("dispatching {:?}", RpcOp::Authorize);
        wire::write_word(&mut self.control, RpcOp::Authorize.to_word())?;
        wire::write_string(&mut self.control, resource)?;
        wire::write_string(&mut self.control, &creds.username)?;
        // Cleartext by default; the MD5 form is
        // never emitted unless a caller explicitly opts in, and even then
        // this session does not have the daemon-provided salt needed to
        // compute it from an AUTHORIZE reply alone, so cleartext remains
        // the only form actually sent on the wire here.
        let _ = self.config.allow_md5_auth;
        wire::write_string(&mut self.control, &creds.password)?;
        self.control.flush()?;
        let _discard = wire::read_word(&mut self.control)?;
        Ok(())
    }

    /// Idempotent teardown: sends EXIT and shuts the socket down. Safe to
    /// call from any state, including after a prior transport failure.
    pub fn close(&mut self) {
        let _ = wire::write_word(&mut self.control, RpcOp::Exit.to_word());
        let _ = self.control.flush();
        let _ = self.control.shutdown(std::net::Shutdown::Both);
    }
}

impl<C> Drop for Session<C> {
    fn drop(&mut self) {
        let _ = self.control.shutdown(std::net::Shutdown::Both);
    }
}

/// Narrow helper so `connect_timeout` can resolve a single `(host, port)`
/// pair without pulling in a DNS-policy abstraction this crate has no
/// other use for.
trait ToSingleSocketAddr {
    fn to_socket_addrs_single(&self) -> std::io::Result<std::net::SocketAddr>;
}

impl ToSingleSocketAddr for (&str, u16) {
    fn to_socket_addrs_single(&self) -> std::io::Result<std::net::SocketAddr> {
        use std::net::ToSocketAddrs;
        self.to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))
    }
}
