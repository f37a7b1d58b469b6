//! Wire-level constants of the Jet protocol.
//!
//! Keys and operation names appear on the wire exactly as spelled here; the
//! daemon is case sensitive.

/// Default TCP listening port of the jet daemon.
pub const JETD_TCP_PORT: u16 = 11122;
/// Default websocket listening port of the jet daemon (not spoken by this peer).
pub const JETD_WS_PORT: u16 = 11123;
/// Default unix domain socket endpoint of the jet daemon.
pub const JET_UNIX_DOMAIN_SOCKET: &str = "/var/run/jet.socket";

/// Maximum length in bytes of a single framed payload, single message or
/// batch. Applies to both directions: larger outbound payloads are rejected
/// before anything is written, larger inbound announcements close the
/// connection.
pub const MAX_MESSAGE_SIZE: usize = 262_144;

// JSON-RPC envelope keys
pub const JSONRPC: &str = "jsonrpc";
pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD: &str = "method";
pub const PARAMS: &str = "params";
pub const ID: &str = "id";
pub const RESULT: &str = "result";
pub const ERROR: &str = "error";
pub const CODE: &str = "code";
pub const MESSAGE: &str = "message";
pub const DATA: &str = "data";

// Request parameter keys
pub const NAME: &str = "name";
pub const DEBUG: &str = "debug";
pub const PATH: &str = "path";
pub const ARGS: &str = "args";
pub const VALUE: &str = "value";
pub const TIMEOUT: &str = "timeout";
pub const FETCH_ONLY: &str = "fetchOnly";
pub const VALUE_AS_RESULT: &str = "valueAsResult";
pub const EVENT: &str = "event";
pub const USER: &str = "user";
pub const PASSWORD: &str = "password";
pub const ACCESS: &str = "access";
pub const FETCH_GROUPS: &str = "fetchGroups";
pub const SET_GROUPS: &str = "setGroups";
pub const CALL_GROUPS: &str = "callGroups";
pub const WARNING: &str = "warning";

// Matcher predicate keys
pub const CONTAINS: &str = "contains";
pub const STARTS_WITH: &str = "startsWith";
pub const ENDS_WITH: &str = "endsWith";
pub const EQUALS: &str = "equals";
pub const EQUALS_NOT: &str = "equalsNot";
pub const CONTAINS_ALL_OF: &str = "containsAllOf";
pub const CASE_INSENSITIVE: &str = "caseInsensitive";

// Operation names (the `method` field of outbound requests)
pub const ADD: &str = "add";
pub const REMOVE: &str = "remove";
pub const FETCH: &str = "fetch";
pub const UNFETCH: &str = "unfetch";
pub const CALL: &str = "call";
pub const SET: &str = "set";
pub const GET: &str = "get";
pub const CONFIG: &str = "config";
pub const INFO: &str = "info";
pub const AUTHENTICATE: &str = "authenticate";
/// Change notification from the peer owning a state to the jet daemon.
pub const CHANGE: &str = "change";

// Fetch notification events
pub const EVENT_ADD: &str = "add";
pub const EVENT_CHANGE: &str = "change";
pub const EVENT_REMOVE: &str = "remove";
