// ── Config templates ──
//
// Plain placeholder substitution: `{{ .Field }}` is replaced verbatim
// with the named field of the serialized context. No conditionals, no
// loops, no escaping.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, Result};

pub const CLIENT_TEMPLATE: &str = "\
# Generated by {{ .Tool }} on {{ .Date }}
# Common name: {{ .CommonName }}
# Static address: {{ .Address }}
client
dev tun
proto udp
remote {{ .Host }} {{ .Port }}
resolv-retry infinite
nobind
persist-key
persist-tun
remote-cert-tls server
cipher AES-256-GCM
auth SHA256
verb 3

<ca>
{{ .Ca }}</ca>
<cert>
{{ .Cert }}</cert>
<key>
{{ .Key }}</key>
{{ .TlsCrypt }}";

pub const SERVER_TEMPLATE: &str = "\
# Generated by {{ .Tool }} on {{ .Date }}
# Common name: {{ .CommonName }}
port {{ .Port }}
proto udp
dev tun
topology subnet
server {{ .Network }} {{ .Netmask }}
client-config-dir ccd
crl-verify crl.pem
keepalive 10 120
persist-key
persist-tun
cipher AES-256-GCM
auth SHA256
dh none
verb 3

<ca>
{{ .Ca }}</ca>
<cert>
{{ .Cert }}</cert>
<key>
{{ .Key }}</key>
{{ .TlsCrypt }}";

/// Fill `template` from the fields of `context`.
pub fn render<T: Serialize>(template: &str, context: &T) -> Result<String> {
    let fields = match serde_json::to_value(context) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return Err(template_err("context must serialize to a record".into())),
        Err(e) => return Err(template_err(e.to_string())),
    };

    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let offset = template.len() - rest.len() + open;
        let close = after
            .find("}}")
            .ok_or_else(|| template_err(format!("unterminated placeholder at byte {offset}")))?;

        let placeholder = after[..close].trim();
        let name = placeholder.strip_prefix('.').ok_or_else(|| {
            template_err(format!("placeholder '{placeholder}' must start with '.'"))
        })?;
        match fields.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) => {}
            Some(other) => out.push_str(&other.to_string()),
            None => return Err(template_err(format!("unknown field '{name}'"))),
        }

        rest = &after[close + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn template_err(reason: String) -> CoreError {
    CoreError::Template { reason }
}
