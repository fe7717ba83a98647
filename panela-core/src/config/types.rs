//! Compiler settings
//!
//! Every constant the emitted nginx configuration relies on lives here so it
//! can be overridden from a settings file instead of being hard-coded.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Root settings for a compiler run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Where the rendered nginx configuration is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Local address nginx proxies process-served endpoints to
    #[serde(default)]
    pub proxy: ProxySettings,

    /// `client_max_body_size` value for every server block
    #[serde(default = "default_body_size")]
    pub client_max_body_size: String,

    /// `index` value for every nginx-served location
    #[serde(default = "default_index")]
    pub index: String,

    /// Hosts-file handling
    #[serde(default)]
    pub hosts_file: HostsFileSettings,

    /// Maximum route nesting depth accepted by the traversal
    #[serde(default = "default_max_route_depth")]
    pub max_route_depth: usize,

    /// Fixed directives emitted at the top of the file
    #[serde(default)]
    pub boilerplate: Boilerplate,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            proxy: ProxySettings::default(),
            client_max_body_size: default_body_size(),
            index: default_index(),
            hosts_file: HostsFileSettings::default(),
            max_route_depth: default_max_route_depth(),
            boilerplate: Boilerplate::default(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./panela-nginx.conf")
}

fn default_body_size() -> String {
    "50M".to_string()
}

fn default_index() -> String {
    "index.html".to_string()
}

fn default_max_route_depth() -> usize {
    64
}

/// Process-handler server address
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxySettings {
    #[serde(default = "default_proxy_address")]
    pub address: IpAddr,

    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

impl ProxySettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Target used in `proxy_pass`
    pub fn upstream_url(&self) -> String {
        format!("http://{}", self.socket_addr())
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            address: default_proxy_address(),
            port: default_proxy_port(),
        }
    }
}

fn default_proxy_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_proxy_port() -> u16 {
    3000
}

/// Hosts-file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostsFileSettings {
    /// Append a loopback alias per declared hostname
    #[serde(default = "default_bool_true")]
    pub manage: bool,

    #[serde(default = "default_hosts_path")]
    pub path: PathBuf,
}

impl Default for HostsFileSettings {
    fn default() -> Self {
        Self {
            manage: true,
            path: default_hosts_path(),
        }
    }
}

fn default_hosts_path() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

fn default_bool_true() -> bool {
    true
}

/// Process and `http` level tuning directives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Boilerplate {
    /// `user` directive, omitted when unset
    pub user: Option<String>,
    pub worker_processes: String,
    pub pid: PathBuf,
    pub worker_connections: u32,
    pub sendfile: bool,
    pub tcp_nopush: bool,
    pub tcp_nodelay: bool,
    pub keepalive_timeout: u32,
    pub types_hash_max_size: u32,
    pub mime_types: PathBuf,
    pub default_type: String,
    pub access_log: PathBuf,
    pub error_log: PathBuf,
    pub gzip: bool,
    pub gzip_disable: Option<String>,
}

impl Default for Boilerplate {
    fn default() -> Self {
        Self {
            user: None,
            worker_processes: "4".to_string(),
            pid: PathBuf::from("/run/nginx.pid"),
            worker_connections: 768,
            sendfile: true,
            tcp_nopush: true,
            tcp_nodelay: true,
            keepalive_timeout: 65,
            types_hash_max_size: 2048,
            mime_types: PathBuf::from("/etc/nginx/mime.types"),
            default_type: "application/octet-stream".to_string(),
            access_log: PathBuf::from("/var/log/nginx/access.log"),
            error_log: PathBuf::from("/var/log/nginx/error.log"),
            gzip: true,
            gzip_disable: Some("msie6".to_string()),
        }
    }
}

/// Renders a flag the way nginx expects it
pub fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}
