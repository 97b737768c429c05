// ── Config export ──
//
// Certificate material + server data → `View` → rendered config text.

pub mod server_data;
pub mod template;
pub mod tls_crypt;
mod view;

pub use server_data::ServerData;
pub use template::{CLIENT_TEMPLATE, SERVER_TEMPLATE, render};
pub use view::{DATE_FORMAT, DEFAULT_PORT, TOOL_NAME, UNSPECIFIED_HOST, View};
