//! Raw TCP connection to a single node

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::control_plane::ControlPlane;
use crate::utils::{ConnectionError, RespDecoder, RespEncoder, RespValue};

/// Blocking TCP connection with separate buffered reader/writer halves
pub struct RawConnection {
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
    encoder: RespEncoder,
}

impl RawConnection {
    /// Create new TCP connection
    pub fn connect_tcp(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let connect_failed = |source: io::Error| ConnectionError::ConnectFailed {
            host: host.to_string(),
            port,
            source,
        };

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(connect_failed)?
            .next()
            .ok_or_else(|| {
                connect_failed(io::Error::new(io::ErrorKind::NotFound, "No addresses found"))
            })?;

        let stream = TcpStream::connect_timeout(&addr, connect_timeout).map_err(connect_failed)?;
        stream.set_nodelay(true).ok();

        let writer = BufWriter::with_capacity(4096, stream.try_clone().map_err(connect_failed)?);
        let reader = BufReader::with_capacity(16384, stream);

        Ok(Self {
            writer,
            reader,
            encoder: RespEncoder::with_capacity(256),
        })
    }

    /// Set read and write timeouts on the underlying socket
    pub fn set_timeouts(&mut self, timeout: Duration) -> io::Result<()> {
        self.reader.get_ref().set_read_timeout(Some(timeout))?;
        self.writer.get_ref().set_write_timeout(Some(timeout))
    }

    /// Send AUTH command
    ///
    /// A server without any password configured answers AUTH with an
    /// error; that case is accepted since there is nothing to authenticate.
    pub fn authenticate(
        &mut self,
        password: &str,
        username: Option<&str>,
    ) -> Result<(), ConnectionError> {
        let response = match username {
            Some(user) => self.execute(&["AUTH", user, password]),
            None => self.execute(&["AUTH", password]),
        }
        .map_err(ConnectionError::from)?;

        match response {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            RespValue::Error(e) if e.contains("without any password configured") => Ok(()),
            RespValue::Error(e) => Err(ConnectionError::AuthFailed(e)),
            other => Err(ConnectionError::AuthFailed(format!(
                "Unexpected response: {}",
                other.describe()
            ))),
        }
    }
}

impl ControlPlane for RawConnection {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        self.encoder.clear();
        self.encoder.encode_command_str(args);
        self.writer.write_all(self.encoder.as_bytes())?;
        self.writer.flush()?;
        RespDecoder::new(&mut self.reader).decode()
    }
}
