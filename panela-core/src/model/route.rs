//! Routes and the declaration API shared by routes and hosts

use crate::error::DeclarationError;
use crate::handler::SharedHandler;
use crate::model::endpoint::{Endpoint, EndpointHandler, Middleware};
use crate::model::verb::{Verb, VerbSet};

/// Pathname used when a declaration omits one
pub const ANY_PATH: &str = "*";

/// Entry of a route, in declaration order
#[derive(Debug)]
pub enum RouteEntry {
    Endpoint(Endpoint),
    Middleware(Middleware),
    Route(Route),
}

/// One argument of a variadic endpoint declaration
#[derive(Debug, Clone)]
pub enum Arg {
    Text(String),
    Callable(SharedHandler),
}

impl From<&str> for Arg {
    fn from(text: &str) -> Self {
        Arg::Text(text.to_string())
    }
}

impl From<SharedHandler> for Arg {
    fn from(handler: SharedHandler) -> Self {
        Arg::Callable(handler)
    }
}

/// Pathname and handlers of an endpoint declaration
#[derive(Debug, Clone)]
pub struct EndpointArgs {
    pub pathname: String,
    pub handlers: Vec<EndpointHandler>,
}

impl EndpointArgs {
    /// Split a variadic argument list.
    ///
    /// A leading text argument is the pathname; everything after it is a
    /// handler. Without a leading text argument the pathname is `*`.
    pub fn parse(args: impl IntoIterator<Item = Arg>) -> Result<Self, DeclarationError> {
        let mut args = args.into_iter().peekable();
        let pathname = match args.peek() {
            None => return Err(DeclarationError::MissingArguments),
            Some(Arg::Text(_)) => match args.next() {
                Some(Arg::Text(pathname)) => pathname,
                _ => return Err(DeclarationError::MissingArguments),
            },
            Some(Arg::Callable(_)) => ANY_PATH.to_string(),
        };
        let handlers = args
            .map(|arg| match arg {
                Arg::Text(path) => EndpointHandler::File(path),
                Arg::Callable(handler) => EndpointHandler::Process(handler),
            })
            .collect();
        Ok(Self { pathname, handlers })
    }
}

/// Conversion into endpoint arguments
pub trait IntoEndpointArgs {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError>;
}

impl IntoEndpointArgs for EndpointArgs {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError> {
        Ok(self)
    }
}

impl IntoEndpointArgs for Vec<Arg> {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError> {
        EndpointArgs::parse(self)
    }
}

impl IntoEndpointArgs for SharedHandler {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError> {
        EndpointArgs::parse([Arg::Callable(self)])
    }
}

impl IntoEndpointArgs for (&str, SharedHandler) {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError> {
        EndpointArgs::parse([Arg::from(self.0), Arg::Callable(self.1)])
    }
}

impl IntoEndpointArgs for (&str, &str) {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError> {
        EndpointArgs::parse([Arg::from(self.0), Arg::from(self.1)])
    }
}

impl IntoEndpointArgs for (&str, Vec<EndpointHandler>) {
    fn into_endpoint_args(self) -> Result<EndpointArgs, DeclarationError> {
        Ok(EndpointArgs {
            pathname: self.0.to_string(),
            handlers: self.1,
        })
    }
}

/// Declaration API shared by [`Route`] and [`Host`](crate::model::Host).
///
/// Every method validates before touching the entry list, so an `Err` leaves
/// the receiver exactly as it was.
pub trait Routable {
    /// Prefix prepended to every pathname declared on this receiver
    fn pathname(&self) -> &str;

    fn entries(&self) -> &[RouteEntry];

    fn push_entry(&mut self, entry: RouteEntry);

    /// Append an endpoint answering `verbs`
    fn endpoint(
        &mut self,
        verbs: VerbSet,
        args: impl IntoEndpointArgs,
    ) -> Result<&mut Self, DeclarationError> {
        let args = args.into_endpoint_args()?;
        let pathname = format!("{}{}", self.pathname(), args.pathname);
        let endpoint = Endpoint::new(pathname, verbs, args.handlers)?;
        self.push_entry(RouteEntry::Endpoint(endpoint));
        Ok(self)
    }

    /// Endpoint for every HTTP verb
    fn all(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::all(), args)
    }

    fn get(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Get), args)
    }

    fn head(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Head), args)
    }

    fn put(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Put), args)
    }

    fn patch(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Patch), args)
    }

    fn post(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Post), args)
    }

    fn delete(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Delete), args)
    }

    fn options(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        self.endpoint(VerbSet::single(Verb::Options), args)
    }

    /// Serve every file under `directory` through nginx
    fn static_dir(
        &mut self,
        pathname: &str,
        directory: impl Into<String>,
    ) -> Result<&mut Self, DeclarationError> {
        let args = EndpointArgs {
            pathname: pathname.to_string(),
            handlers: vec![EndpointHandler::File(directory.into())],
        };
        self.endpoint(VerbSet::single(Verb::Static), args)
    }

    /// Append a process-side middleware
    fn use_middleware(&mut self, args: impl IntoEndpointArgs) -> Result<&mut Self, DeclarationError> {
        let EndpointArgs {
            pathname,
            mut handlers,
        } = args.into_endpoint_args()?;
        let pathname = if pathname == ANY_PATH {
            pathname
        } else {
            format!("{}{}", self.pathname(), pathname)
        };
        let handler = match (handlers.pop(), handlers.is_empty()) {
            (Some(EndpointHandler::Process(handler)), true) => handler,
            _ => return Err(DeclarationError::MiddlewareRequiresCallable { pathname }),
        };
        self.push_entry(RouteEntry::Middleware(Middleware::new(pathname, handler)));
        Ok(self)
    }

    /// Declare a child route under `pathname() + suffix`.
    ///
    /// `build` runs on the child before it is linked; if it fails the child is
    /// dropped and nothing is linked.
    fn route<F>(&mut self, suffix: &str, build: F) -> Result<&mut Self, DeclarationError>
    where
        F: FnOnce(&mut Route) -> Result<(), DeclarationError>,
    {
        let mut child = Route::new(format!("{}{}", self.pathname(), suffix));
        build(&mut child)?;
        self.push_entry(RouteEntry::Route(child));
        Ok(self)
    }
}

/// An ordered, nestable container of endpoints, middleware and sub-routes
#[derive(Debug, Default)]
pub struct Route {
    pathname: String,
    entries: Vec<RouteEntry>,
}

impl Route {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            entries: Vec::new(),
        }
    }

    /// Name of the route, same as its pathname
    pub fn name(&self) -> &str {
        &self.pathname
    }

    /// Every endpoint reachable from this route, depth-first
    pub fn endpoints(&self) -> Vec<&Endpoint> {
        let mut found = Vec::new();
        collect_endpoints(&self.entries, &mut found);
        found
    }
}

fn collect_endpoints<'a>(entries: &'a [RouteEntry], found: &mut Vec<&'a Endpoint>) {
    for entry in entries {
        match entry {
            RouteEntry::Endpoint(endpoint) => found.push(endpoint),
            RouteEntry::Route(route) => collect_endpoints(&route.entries, found),
            RouteEntry::Middleware(_) => {}
        }
    }
}

impl Routable for Route {
    fn pathname(&self) -> &str {
        &self.pathname
    }

    fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    fn push_entry(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler, respond, Flow, Request};
    use crate::model::ServingMode;

    fn callable() -> SharedHandler {
        handler(|_req: Request| async { Flow::Respond(respond(200, "ok")) })
    }

    #[test]
    fn test_parse_args() {
        let args = EndpointArgs::parse(vec![Arg::from("/a"), Arg::from("/a.html")]).unwrap();
        assert_eq!(args.pathname, "/a");
        assert_eq!(args.handlers.len(), 1);

        let args = EndpointArgs::parse(vec![Arg::Callable(callable())]).unwrap();
        assert_eq!(args.pathname, "*");

        assert!(matches!(
            EndpointArgs::parse(Vec::new()),
            Err(DeclarationError::MissingArguments)
        ));
    }

    #[test]
    fn test_verbs_prefix_route_pathname() {
        let mut route = Route::new("/api");
        route
            .get(("/users", callable()))
            .unwrap()
            .post(("/users", callable()))
            .unwrap()
            .delete(callable())
            .unwrap();

        let paths: Vec<_> = route.endpoints().iter().map(|e| e.pathname().to_string()).collect();
        assert_eq!(paths, vec!["/api/users", "/api/users", "/api*"]);
    }

    #[test]
    fn test_failed_declaration_leaves_entries_untouched() {
        let mut route = Route::new("");
        route.get(("/ok", callable())).unwrap();

        let zero = route.get(vec![Arg::from("/nothing")]);
        assert!(matches!(zero, Err(DeclarationError::HandlerCount { count: 0, .. })));

        let two = route.post(vec![Arg::from("/two"), Arg::Callable(callable()), Arg::Callable(callable())]);
        assert!(matches!(two, Err(DeclarationError::HandlerCount { count: 2, .. })));

        assert_eq!(route.entries().len(), 1);
    }

    #[test]
    fn test_nested_routes_concatenate() {
        let mut root = Route::new("/v1");
        root.route("/admin", |admin| {
            admin.static_dir("/assets", "/srv/admin")?;
            admin.route("/users", |users| {
                users.get(("/list", "/users.html"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

        let endpoints = root.endpoints();
        assert_eq!(endpoints[0].pathname(), "/v1/admin/assets");
        assert_eq!(endpoints[0].mode(), ServingMode::StaticNginx);
        assert_eq!(endpoints[1].pathname(), "/v1/admin/users/list");
        assert_eq!(endpoints[1].mode(), ServingMode::FileNginx);
    }

    #[test]
    fn test_failed_child_route_is_not_linked() {
        let mut root = Route::new("");
        let result = root.route("/bad", |bad| {
            bad.get(("/fine", callable()))?;
            bad.get(vec![Arg::from("/broken")])?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(root.entries().is_empty());
    }

    #[test]
    fn test_use_middleware() {
        let mut route = Route::new("/api");
        route.use_middleware(callable()).unwrap();
        route.use_middleware(("/admin", callable())).unwrap();
        assert!(matches!(
            route.use_middleware(("/x", "/file.html")),
            Err(DeclarationError::MiddlewareRequiresCallable { .. })
        ));

        let scopes: Vec<_> = route
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                RouteEntry::Middleware(mw) => Some(mw.pathname().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(scopes, vec!["*", "/api/admin"]);
    }
}
