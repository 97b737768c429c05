// ── Directive line ──
//
// On-disk format, one line per identity, no trailing newline:
//
//   ifconfig-push <address> <netmask>

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

pub const IFCONFIG_PUSH: &str = "ifconfig-push";

/// A parsed client directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub address: Ipv4Addr,
    /// Absent only when reading hand-edited files that omit it.
    pub netmask: Option<Ipv4Addr>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("expected at least 2 fields, found {0}")]
    TooFewFields(usize),
    #[error("'{0}' is not an IPv4 address")]
    BadAddress(String),
}

impl Directive {
    pub fn new(address: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            address,
            netmask: Some(netmask),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{IFCONFIG_PUSH} {}", self.address)?;
        if let Some(mask) = self.netmask {
            write!(f, " {mask}")?;
        }
        Ok(())
    }
}

impl FromStr for Directive {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [_, address, rest @ ..] = fields.as_slice() else {
            return Err(DirectiveError::TooFewFields(fields.len()));
        };
        let address = address
            .parse()
            .map_err(|_| DirectiveError::BadAddress((*address).to_owned()))?;
        let netmask = rest.first().and_then(|m| m.parse().ok());
        Ok(Self { address, netmask })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_bit_exact_line() {
        let d = Directive::new(Ipv4Addr::new(10, 43, 0, 2), Ipv4Addr::new(255, 255, 0, 0));
        assert_eq!(d.to_string(), "ifconfig-push 10.43.0.2 255.255.0.0");
    }

    #[test]
    fn parses_written_line_and_tolerates_trailing_newline() {
        let d: Directive = "ifconfig-push 10.43.0.9 255.255.255.248\n".parse().unwrap();
        assert_eq!(d.address, Ipv4Addr::new(10, 43, 0, 9));
        assert_eq!(d.netmask, Some(Ipv4Addr::new(255, 255, 255, 248)));
    }

    #[test]
    fn second_token_is_the_address() {
        let d: Directive = "push 192.168.1.5".parse().unwrap();
        assert_eq!(d.address, Ipv4Addr::new(192, 168, 1, 5));
        assert_eq!(d.netmask, None);
    }

    #[test]
    fn rejects_short_or_garbled_lines() {
        assert_eq!(
            "".parse::<Directive>().unwrap_err(),
            DirectiveError::TooFewFields(0)
        );
        assert_eq!(
            "ifconfig-push".parse::<Directive>().unwrap_err(),
            DirectiveError::TooFewFields(1)
        );
        assert!(matches!(
            "ifconfig-push nope 255.0.0.0".parse::<Directive>(),
            Err(DirectiveError::BadAddress(_))
        ));
    }
}
