use crate::error::OtsError;

/// Scheme of an endpoint URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn default_port(self) -> &'static str {
        match self {
            Protocol::Http => "80",
            Protocol::Https => "443",
        }
    }
}

/// Where a client points: the service URL and the instance it talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub endpoint: String,
    pub instance_name: String,
}

impl Endpoint {
    pub fn new(endpoint: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            instance_name: instance_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.endpoint.is_empty() {
            return Err(OtsError::parameter_invalid("Endpoint must be nonempty."));
        }
        if self.instance_name.is_empty() {
            return Err(OtsError::parameter_invalid("Instance name must be nonempty."));
        }
        ParsedEndpoint::parse(&self.endpoint).map(|_| ())
    }
}

/// Endpoint URL broken into its pieces.
///
/// Grammar: `("http"|"https") "://" host [":" port] ["/"]`. Anything after
/// the root path is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEndpoint {
    pub protocol: Protocol,
    pub host: String,
    pub port: String,
}

impl ParsedEndpoint {
    pub fn parse(url: &str) -> Result<Self, OtsError> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| OtsError::parameter_invalid("invalid syntax of endpoint."))?;
        let protocol = match scheme {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            _ => return Err(OtsError::parameter_invalid("unsupported protocol")),
        };
        let authority = match rest.split_once('/') {
            None => rest,
            Some((authority, "")) => authority,
            Some(_) => return Err(OtsError::parameter_invalid("invalid syntax of endpoint.")),
        };
        let (host, port) = match authority.split_once(':') {
            None => (authority, protocol.default_port().to_string()),
            Some((host, port)) => {
                if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(OtsError::parameter_invalid("invalid syntax of endpoint."));
                }
                (host, port.to_string())
            }
        };
        if host.is_empty() {
            return Err(OtsError::parameter_invalid("invalid syntax of endpoint."));
        }
        Ok(Self {
            protocol,
            host: host.to_string(),
            port,
        })
    }

    /// Rebuilds the root URL, always with an explicit port.
    pub fn base_url(&self) -> String {
        let scheme = match self.protocol {
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}
