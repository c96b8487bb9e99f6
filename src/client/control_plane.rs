//! Control Plane trait for server communication
//!
//! `ControlPlane` is the lowest seam of the client stack: it sends one
//! command and returns the raw reply. `RawConnection` implements it over
//! TCP; tests implement it over an in-memory server.

use std::io;

use crate::utils::{ConnectionError, ProtocolError, RespValue};

/// Execute a single command and return its raw reply
pub trait ControlPlane: Send {
    /// Execute a command with string arguments
    ///
    /// # Example
    /// ```ignore
    /// let response = conn.execute(&["PING"])?;
    /// let response = conn.execute(&["SET", "key", "value", "EX", "1"])?;
    /// ```
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue>;
}

/// Map a reply into a `ConnectionError` when it is a server error
///
/// Authentication rejections become `AuthFailed`, cluster redirects become
/// `ProtocolError::Redirect`, everything else `ProtocolError::ServerError`.
pub fn check_reply(reply: RespValue) -> Result<RespValue, ConnectionError> {
    if reply.is_auth_error() {
        if let RespValue::Error(e) = reply {
            return Err(ConnectionError::AuthFailed(e));
        }
    }
    if let Some((kind, slot, host, port)) = reply.parse_redirect() {
        return Err(ProtocolError::Redirect {
            kind,
            slot,
            host,
            port,
        }
        .into());
    }
    match reply {
        RespValue::Error(e) => Err(ProtocolError::ServerError(e).into()),
        other => Ok(other),
    }
}

/// Expect `+OK` from a command
pub fn expect_ok(command: &str, reply: RespValue) -> Result<(), ConnectionError> {
    match check_reply(reply)? {
        RespValue::SimpleString(s) if s == "OK" => Ok(()),
        other => Err(unexpected(command, "+OK", &other)),
    }
}

/// Expect a UTF-8 bulk string from a command
pub fn expect_text(command: &str, reply: RespValue) -> Result<String, ConnectionError> {
    match check_reply(reply)? {
        RespValue::BulkString(data) => String::from_utf8(data)
            .map_err(|e| ProtocolError::Parse(format!("{} reply is not UTF-8: {}", command, e)).into()),
        RespValue::SimpleString(s) => Ok(s),
        other => Err(unexpected(command, "bulk string", &other)),
    }
}

pub fn unexpected(command: &str, expected: &str, actual: &RespValue) -> ConnectionError {
    ProtocolError::UnexpectedResponse {
        expected: format!("{} for {}", expected, command),
        actual: actual.describe(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::resp::RedirectKind;

    #[test]
    fn test_check_reply_auth() {
        let err = check_reply(RespValue::Error("NOAUTH Authentication required.".into()))
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn test_check_reply_redirect() {
        let err = check_reply(RespValue::Error("MOVED 866 10.0.0.2:7001".into())).unwrap_err();
        match err {
            ConnectionError::Protocol(ProtocolError::Redirect {
                kind, slot, host, port,
            }) => {
                assert_eq!(kind, RedirectKind::Moved);
                assert_eq!(slot, 866);
                assert_eq!(host, "10.0.0.2");
                assert_eq!(port, 7001);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_expect_ok() {
        assert!(expect_ok("SET", RespValue::SimpleString("OK".into())).is_ok());
        assert!(expect_ok("SET", RespValue::Null).is_err());
        assert!(expect_ok("SET", RespValue::Error("ERR oom".into())).is_err());
    }

    #[test]
    fn test_expect_text() {
        assert_eq!(
            expect_text("INFO", RespValue::BulkString(b"role:master".to_vec())).unwrap(),
            "role:master"
        );
        assert!(expect_text("INFO", RespValue::Integer(1)).is_err());
    }
}
