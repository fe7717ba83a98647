//! Host-aware dispatch table
//!
//! Registered pathnames behave like nginx prefix locations: `/api` answers
//! `/api` and everything below `/api/`, the longest prefix wins. Pathnames
//! with `:name` segments match exactly through the radix tree and capture
//! their parameters.
//!
//! Hosts are keyed by hostname and declared port. nginx forwards the port of
//! the server block in [`PORT_HEADER`]; without it the first port declared for
//! the hostname answers.

use http::Method;
use matchit::Router as RadixRouter;
use panela_core::handler::{not_found, method_not_allowed, Flow, PathParams, Request, Response, SharedHandler};
use panela_core::model::VerbSet;
use panela_core::process::{Registration, PORT_HEADER};
use panela_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Entry {
    verbs: VerbSet,
    chain: Vec<SharedHandler>,
}

type Group = Vec<Arc<Entry>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    /// Radix tree pattern, `{name}` for parameters
    Exact(String),
    /// Literal path prefix
    Prefix(String),
}

/// Translate a registered pathname into the patterns it answers
fn translate(pathname: &str) -> Vec<Pattern> {
    if pathname.is_empty() || pathname == "*" || pathname == "/" {
        return vec![Pattern::Prefix("/".to_string())];
    }
    if let Some(prefix) = pathname.strip_suffix('*') {
        return vec![Pattern::Prefix(prefix.to_string())];
    }

    let has_params = pathname.split('/').any(|segment| segment.starts_with(':'));
    let exact = pathname
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => segment.replace('{', "{{").replace('}', "}}"),
        })
        .collect::<Vec<_>>()
        .join("/");

    if has_params {
        vec![Pattern::Exact(exact)]
    } else {
        let prefix = format!("{}/", pathname.trim_end_matches('/'));
        vec![Pattern::Exact(exact), Pattern::Prefix(prefix)]
    }
}

/// Lowercased host name without its port
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let name = if host.starts_with('[') {
        host.split_inclusive(']').next().unwrap_or(host)
    } else {
        host.rsplit_once(':').map_or(host, |(name, _)| name)
    };
    name.to_ascii_lowercase()
}

struct HostTable {
    exact: RadixRouter<Group>,
    /// Sorted longest first
    prefixes: Vec<(String, Group)>,
}

/// Outcome of looking up a request
#[derive(Debug)]
pub enum Dispatched<'a> {
    /// The chain to run and the captured path parameters
    Found {
        chain: &'a [SharedHandler],
        params: PathParams,
    },
    /// A pathname matched but none of its endpoints accepts the method
    MethodNotAllowed,
    NotFound,
}

/// Registrations indexed by host and port, then by path
#[derive(Default)]
pub struct DispatchTable {
    /// Tables per hostname, ports in declaration order
    hosts: HashMap<String, Vec<(u16, HostTable)>>,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hosts: Vec<String> = self
            .hosts
            .iter()
            .flat_map(|(name, tables)| tables.iter().map(move |(port, _)| format!("{}:{}", name, port)))
            .collect();
        f.debug_struct("DispatchTable").field("hosts", &hosts).finish()
    }
}

impl DispatchTable {
    /// Build the table, failing on patterns the radix tree cannot hold together
    pub fn build(registrations: &[Registration]) -> Result<Self> {
        let mut grouped: Vec<((String, u16), Vec<(Pattern, Group)>)> = Vec::new();
        for registration in registrations {
            let entry = Arc::new(Entry {
                verbs: registration.verbs.clone(),
                chain: registration.chain.clone(),
            });
            let key = (normalize_host(&registration.hostname), registration.port);
            let index = match grouped.iter().position(|(existing, _)| *existing == key) {
                Some(index) => index,
                None => {
                    grouped.push((key, Vec::new()));
                    grouped.len() - 1
                }
            };
            let patterns = &mut grouped[index].1;
            for pattern in translate(&registration.pathname) {
                match patterns.iter_mut().find(|(existing, _)| *existing == pattern) {
                    Some((_, group)) => group.push(entry.clone()),
                    None => patterns.push((pattern, vec![entry.clone()])),
                }
            }
        }

        let mut hosts: HashMap<String, Vec<(u16, HostTable)>> = HashMap::new();
        for ((hostname, port), patterns) in grouped {
            let mut table = HostTable {
                exact: RadixRouter::new(),
                prefixes: Vec::new(),
            };
            for (pattern, group) in patterns {
                match pattern {
                    Pattern::Exact(path) => {
                        table.exact.insert(path.as_str(), group).map_err(|e| {
                            Error::Server(format!("Conflicting route {} on host {}:{}: {}", path, hostname, port, e))
                        })?;
                    }
                    Pattern::Prefix(prefix) => table.prefixes.push((prefix, group)),
                }
            }
            table.prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            tracing::debug!("Dispatch table for {}:{} holds {} prefixes", hostname, port, table.prefixes.len());
            hosts.entry(hostname).or_default().push((port, table));
        }
        Ok(Self { hosts })
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Find the chain answering a request.
    ///
    /// `port` is the port of the nginx server block that proxied the request.
    pub fn lookup(&self, host: &str, port: Option<u16>, method: &Method, path: &str) -> Dispatched<'_> {
        let Some(tables) = self.hosts.get(&normalize_host(host)) else {
            return Dispatched::NotFound;
        };
        let table = match port {
            Some(port) => tables.iter().find(|(declared, _)| *declared == port),
            None => tables.first(),
        };
        let Some((_, table)) = table else {
            return Dispatched::NotFound;
        };

        let mut path_matched = false;

        if let Ok(matched) = table.exact.at(path) {
            path_matched = true;
            if let Some(entry) = matched.value.iter().find(|entry| entry.verbs.allows(method)) {
                let params = matched
                    .params
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                return Dispatched::Found {
                    chain: &entry.chain,
                    params: PathParams::new(params),
                };
            }
        }

        for (prefix, group) in &table.prefixes {
            if !path.starts_with(prefix.as_str()) {
                continue;
            }
            path_matched = true;
            if let Some(entry) = group.iter().find(|entry| entry.verbs.allows(method)) {
                return Dispatched::Found {
                    chain: &entry.chain,
                    params: PathParams::default(),
                };
            }
        }

        if path_matched {
            Dispatched::MethodNotAllowed
        } else {
            Dispatched::NotFound
        }
    }

    /// Run the chain answering a request
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let host = req
            .headers()
            .get(http::header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| req.uri().host().map(str::to_string))
            .unwrap_or_default();
        let port = req
            .headers()
            .get(PORT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u16>().ok());
        let path = req.uri().path().to_string();

        match self.lookup(&host, port, req.method(), &path) {
            Dispatched::Found { chain, params } => {
                req.extensions_mut().insert(params);
                run_chain(chain, req).await
            }
            Dispatched::MethodNotAllowed => method_not_allowed(),
            Dispatched::NotFound => not_found(),
        }
    }
}

/// Pass the request along the chain until a handler responds
async fn run_chain(chain: &[SharedHandler], mut req: Request) -> Response {
    for handler in chain {
        match handler.handle(req).await {
            Flow::Next(next) => req = next,
            Flow::Respond(response) => return response,
        }
    }
    not_found()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use panela_core::handler::{handler, respond};
    use panela_core::model::Verb;

    fn answer(body: &'static str) -> SharedHandler {
        handler(move |_req: Request| async move { Flow::Respond(respond(200, body)) })
    }

    fn pass() -> SharedHandler {
        handler(|req: Request| async move { Flow::Next(req) })
    }

    fn registration(host: &str, path: &str, verb: Verb, chain: Vec<SharedHandler>) -> Registration {
        Registration {
            hostname: host.to_string(),
            port: 80,
            pathname: path.to_string(),
            verbs: VerbSet::single(verb),
            chain,
        }
    }

    fn request(method: Method, host: &str, path: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::HOST, host)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate("*"), vec![Pattern::Prefix("/".to_string())]);
        assert_eq!(translate("/api*"), vec![Pattern::Prefix("/api".to_string())]);
        assert_eq!(translate("/users/:id"), vec![Pattern::Exact("/users/{id}".to_string())]);
        assert_eq!(
            translate("/api"),
            vec![
                Pattern::Exact("/api".to_string()),
                Pattern::Prefix("/api/".to_string())
            ]
        );
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Example.Test:8080"), "example.test");
        assert_eq!(normalize_host("example.test"), "example.test");
        assert_eq!(normalize_host("[::1]:3000"), "[::1]");
    }

    #[tokio::test]
    async fn test_dispatch_by_host_and_path() {
        let table = DispatchTable::build(&[
            registration("a.test", "/api", Verb::Get, vec![answer("a-api")]),
            registration("b.test", "/api", Verb::Get, vec![answer("b-api")]),
            registration("a.test", "/api/users", Verb::Get, vec![answer("a-users")]),
        ])
        .unwrap();

        let resp = table.dispatch(request(Method::GET, "a.test:80", "/api")).await;
        assert_eq!(resp.body().as_ref(), b"a-api");

        let resp = table.dispatch(request(Method::GET, "b.test", "/api/anything")).await;
        assert_eq!(resp.body().as_ref(), b"b-api");

        let resp = table.dispatch(request(Method::GET, "a.test", "/api/users/42")).await;
        assert_eq!(resp.body().as_ref(), b"a-users");

        let resp = table.dispatch(request(Method::GET, "c.test", "/api")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = table.dispatch(request(Method::GET, "a.test", "/apix")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_same_hostname_on_two_ports() {
        let mut alt = registration("a.test", "/api", Verb::Get, vec![answer("port-8080")]);
        alt.port = 8080;
        let table = DispatchTable::build(&[
            registration("a.test", "/api", Verb::Get, vec![answer("port-80")]),
            alt,
        ])
        .unwrap();

        let via = |port: &str| {
            let mut req = request(Method::GET, "a.test", "/api");
            req.headers_mut().insert(PORT_HEADER, port.parse().unwrap());
            req
        };
        let resp = table.dispatch(via("8080")).await;
        assert_eq!(resp.body().as_ref(), b"port-8080");
        let resp = table.dispatch(via("80")).await;
        assert_eq!(resp.body().as_ref(), b"port-80");
        let resp = table.dispatch(via("9000")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // No forwarded port: the first declared port answers
        let resp = table.dispatch(request(Method::GET, "a.test", "/api")).await;
        assert_eq!(resp.body().as_ref(), b"port-80");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let table = DispatchTable::build(&[registration("a.test", "/form", Verb::Post, vec![answer("posted")])]).unwrap();

        let resp = table.dispatch(request(Method::GET, "a.test", "/form")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = table.dispatch(request(Method::POST, "a.test", "/form")).await;
        assert_eq!(resp.body().as_ref(), b"posted");
    }

    #[tokio::test]
    async fn test_same_path_different_verbs() {
        let table = DispatchTable::build(&[
            registration("a.test", "/items", Verb::Get, vec![answer("list")]),
            registration("a.test", "/items", Verb::Post, vec![answer("create")]),
        ])
        .unwrap();

        let resp = table.dispatch(request(Method::POST, "a.test", "/items")).await;
        assert_eq!(resp.body().as_ref(), b"create");
        let resp = table.dispatch(request(Method::GET, "a.test", "/items")).await;
        assert_eq!(resp.body().as_ref(), b"list");
    }

    #[tokio::test]
    async fn test_path_params_reach_handler() {
        let echo = handler(|req: Request| async move {
            let id = req
                .extensions()
                .get::<PathParams>()
                .and_then(|params| params.get("id"))
                .unwrap_or("none")
                .to_string();
            Flow::Respond(respond(200, id))
        });
        let table = DispatchTable::build(&[registration("a.test", "/users/:id", Verb::Get, vec![echo])]).unwrap();

        let resp = table.dispatch(request(Method::GET, "a.test", "/users/7")).await;
        assert_eq!(resp.body().as_ref(), b"7");
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let table = DispatchTable::build(&[
            registration("a.test", "/chain", Verb::Get, vec![pass(), pass(), answer("end")]),
            registration("a.test", "/exhausted", Verb::Get, vec![pass()]),
        ])
        .unwrap();

        let resp = table.dispatch(request(Method::GET, "a.test", "/chain")).await;
        assert_eq!(resp.body().as_ref(), b"end");

        let resp = table.dispatch(request(Method::GET, "a.test", "/exhausted")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_catch_all_is_shortest_prefix() {
        let table = DispatchTable::build(&[
            registration("a.test", "*", Verb::Get, vec![answer("fallback")]),
            registration("a.test", "/docs", Verb::Get, vec![answer("docs")]),
        ])
        .unwrap();

        let resp = table.dispatch(request(Method::GET, "a.test", "/docs/intro")).await;
        assert_eq!(resp.body().as_ref(), b"docs");
        let resp = table.dispatch(request(Method::GET, "a.test", "/elsewhere")).await;
        assert_eq!(resp.body().as_ref(), b"fallback");
    }

    #[test]
    fn test_conflicting_params_rejected() {
        let result = DispatchTable::build(&[
            registration("a.test", "/u/:id", Verb::Get, vec![answer("id")]),
            registration("a.test", "/u/:name", Verb::Get, vec![answer("name")]),
        ]);
        assert!(matches!(result, Err(Error::Server(_))));
    }
}
