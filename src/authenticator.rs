//! Pluggable client-side authentication mechanisms for AUTHENTICATE.

/// A client-side SASL mechanism.
///
/// [`Client::authenticate`](crate::Client::authenticate) decodes each
/// base64 server challenge, passes the raw bytes to
/// [`process`](Authenticator::process), and sends the response back
/// base64-encoded on a continuation line.
pub trait Authenticator {
    /// The raw response bytes produced for one challenge.
    type Response: AsRef<[u8]>;

    /// Answer one server challenge.
    fn process(&self, challenge: &[u8]) -> Self::Response;
}

/// The PLAIN mechanism ([RFC 4616](https://tools.ietf.org/html/rfc4616)):
/// a single `\0username\0password` response, to be used only over an
/// encrypted transport.
pub struct Plain {
    username: String,
    password: String,
}

impl Plain {
    /// A PLAIN authenticator for the given credentials.
    pub fn new(username: &str, password: &str) -> Plain {
        Plain {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl Authenticator for Plain {
    type Response = Vec<u8>;

    fn process(&self, _challenge: &[u8]) -> Vec<u8> {
        let mut response = Vec::new();
        response.push(0);
        response.extend_from_slice(self.username.as_bytes());
        response.push(0);
        response.extend_from_slice(self.password.as_bytes());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_response_shape() {
        let auth = Plain::new("tim", "tanstaaftanstaaf");
        assert_eq!(auth.process(b""), b"\0tim\0tanstaaftanstaaf".to_vec());
    }
}
