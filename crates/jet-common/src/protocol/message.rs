//! Builders and accessors for the JSON-RPC 2.0 frames spoken by jet.
//!
//! Outbound requests carry `jsonrpc: "2.0"` and an `id` only when a response
//! is expected; requests without an id are notifications the daemon never
//! answers. Responses echo the request id and carry either `result` or
//! `error`, never both.

use serde_json::{json, Value};

use crate::protocol::consts;
use crate::protocol::error::RpcError;
use crate::protocol::handlers::Warning;

/// Build a request frame. With `id` absent this is a notification and the
/// daemon will not answer.
pub fn request(operation: &str, params: Value, id: Option<u64>) -> Value {
    let mut frame = json!({
        consts::JSONRPC: consts::JSONRPC_VERSION,
        consts::METHOD: operation,
        consts::PARAMS: params,
    });
    if let Some(id) = id {
        frame[consts::ID] = json!(id);
    }
    frame
}

/// Build the `change` notification a state owner sends when its value
/// changed. Never carries an id; the daemon will not answer, which makes
/// this the hot path for measurement values.
pub fn change_notification(path: &str, value: Value) -> Value {
    json!({
        consts::METHOD: consts::CHANGE,
        consts::PARAMS: {
            consts::PATH: path,
            consts::VALUE: value,
        },
    })
}

/// Build a success response to an inbound request. The inbound `id` is
/// echoed verbatim, whatever JSON type it is.
pub fn result_response(id: &Value, result: Value) -> Value {
    json!({
        consts::ID: id.clone(),
        consts::RESULT: result,
    })
}

/// Build an error response to an inbound request.
pub fn error_response(id: &Value, error: &RpcError) -> Value {
    json!({
        consts::ID: id.clone(),
        consts::ERROR: error.to_json(),
    })
}

/// The success result body: `{}` on clean success, `{warning: {..}}` when
/// the handler flagged an adaptation.
pub fn result_body(warning: Option<&Warning>) -> Value {
    match warning {
        None => json!({}),
        Some(warning) => {
            let mut body = json!({consts::WARNING: {consts::CODE: warning.code}});
            if let Some(message) = &warning.message {
                body[consts::WARNING][consts::MESSAGE] = json!(message.clone());
            }
            body
        }
    }
}

/// The `result` member of a response object, if present.
pub fn response_result(response: &Value) -> Option<&Value> {
    response.get(consts::RESULT)
}

/// The warning nested inside a successful response, if any.
pub fn response_warning(response: &Value) -> Option<Warning> {
    let warning = response.get(consts::RESULT)?.get(consts::WARNING)?;
    serde_json::from_value(warning.clone()).ok()
}

/// True when the response carries a non-null `error` member.
pub fn is_error(response: &Value) -> bool {
    response
        .get(consts::ERROR)
        .is_some_and(|error| !error.is_null())
}

/// Split a response into `Ok(result)` or `Err(error object)`.
pub fn into_result(response: &Value) -> Result<Value, RpcError> {
    if is_error(response) {
        let error = RpcError::from_response(response).unwrap_or_else(|| {
            RpcError::new(
                crate::protocol::error::LOCAL_ERROR,
                format!("malformed error object in response: {response}"),
            )
        });
        return Err(error);
    }
    Ok(response_result(response).cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_with_id() {
        let frame = request(consts::SET, json!({"path": "x", "value": 7}), Some(4));
        assert_eq!(
            frame,
            json!({
                "jsonrpc": "2.0",
                "method": "set",
                "params": {"path": "x", "value": 7},
                "id": 4,
            })
        );
    }

    #[test]
    fn test_request_without_id_is_notification() {
        let frame = request(consts::ADD, json!({"path": "x", "value": 1}), None);
        assert!(frame.get("id").is_none());
        assert_eq!(frame["jsonrpc"], "2.0");
    }

    #[test]
    fn test_change_notification_shape() {
        let frame = change_notification("x", json!(7));
        assert_eq!(
            frame,
            json!({"method": "change", "params": {"path": "x", "value": 7}})
        );
    }

    #[test]
    fn test_responses_echo_id_verbatim() {
        let id = json!("transaction-17");
        let success = result_response(&id, json!({}));
        assert_eq!(success["id"], json!("transaction-17"));

        let failure = error_response(&id, &RpcError::internal("state is read only!"));
        assert_eq!(failure["id"], json!("transaction-17"));
        assert_eq!(failure["error"]["code"], json!(-32603));
        assert!(failure.get("result").is_none());
    }

    #[test]
    fn test_result_body_with_warning() {
        assert_eq!(result_body(None), json!({}));
        assert_eq!(
            result_body(Some(&Warning::adapted())),
            json!({"warning": {"code": 1}})
        );
        assert_eq!(
            result_body(Some(&Warning::adapted_with("clamped"))),
            json!({"warning": {"code": 1, "message": "clamped"}})
        );
    }

    #[test]
    fn test_response_warning_extraction() {
        let response = json!({"id": 1, "result": {"warning": {"code": 1}}});
        assert_eq!(response_warning(&response), Some(Warning::adapted()));

        let clean = json!({"id": 1, "result": {}});
        assert_eq!(response_warning(&clean), None);
    }

    #[test]
    fn test_is_error() {
        assert!(is_error(&json!({"id": 1, "error": {"code": -1, "message": "x"}})));
        assert!(!is_error(&json!({"id": 1, "result": {}})));
        assert!(!is_error(&json!({"id": 1, "error": null})));
    }

    #[test]
    fn test_malformed_error_object_still_fails_the_request() {
        let response = json!({"id": 1, "error": "boom"});
        let error = into_result(&response).unwrap_err();
        assert_eq!(error.code, -1);
        assert!(error.message.contains("malformed error object"));
    }

    #[test]
    fn test_into_result() {
        let response = json!({"id": 1, "result": [{"path": "a", "value": 1}]});
        assert_eq!(into_result(&response).unwrap(), json!([{"path": "a", "value": 1}]));

        let failure = json!({"id": 1, "error": {"code": -32603, "message": "no"}});
        let error = into_result(&failure).unwrap_err();
        assert_eq!(error.code, -32603);
    }
}
