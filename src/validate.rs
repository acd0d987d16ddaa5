use std::{str::FromStr, sync::Arc};

use regex::bytes::Regex;
use serde_json::Value;

use crate::{
    endpoint::Expectation,
    error::{Error, Result},
    expression::{BodyHost, EvalError, ExpressionEngine},
    request::Outcome,
};

/// Body matching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Byte-for-byte equality with a string.
    Equal,
    /// Structural JSON equality.
    EqualJson,
    /// Regular expression matched anywhere in the body.
    Regex,
    /// Program in the embedded expression language yielding a boolean.
    Expression,
}

impl FromStr for BodyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equal" => Ok(BodyMode::Equal),
            "equal_json" => Ok(BodyMode::EqualJson),
            "reg" => Ok(BodyMode::Regex),
            "pcp" => Ok(BodyMode::Expression),
            other => Err(Error::config(format!(
                "unknown bodyExpectType '{other}', use 'equal', 'equal_json', 'reg' or 'pcp'"
            ))),
        }
    }
}

#[derive(Debug)]
enum BodyCheck {
    Equal(String),
    EqualJson(Value),
    /// Kept as a result: a bad pattern fails each request rather than the run.
    Regex(std::result::Result<Regex, String>),
    Expression(String),
}

/// Classifies responses against an [`Expectation`].
///
/// Built once per run. The mode tag and the shape of the expected value are
/// checked here so a misconfigured expectation stops the run before the first
/// request.
#[derive(Clone)]
pub struct ResponseValidator {
    endpoint: String,
    status: Vec<u16>,
    check: Arc<BodyCheck>,
    expected: String,
    log_body: bool,
    engine: Arc<dyn ExpressionEngine>,
}

impl ResponseValidator {
    pub fn new(
        endpoint: impl Into<String>,
        expectation: &Expectation,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Result<Self> {
        let mode: BodyMode = expectation
            .body_expect_type
            .as_deref()
            .ok_or_else(|| Error::config("missing bodyExpectType"))?
            .parse()?;

        let expected = &expectation.body_exp;
        let as_string = || {
            expected.as_str().map(str::to_owned).ok_or_else(|| {
                Error::config(format!("bodyExp for {mode:?} must be a string, got {expected}"))
            })
        };

        let check = match mode {
            BodyMode::Equal => BodyCheck::Equal(as_string()?),
            BodyMode::EqualJson => BodyCheck::EqualJson(expected.clone()),
            BodyMode::Regex => BodyCheck::Regex(Regex::new(&as_string()?).map_err(|e| e.to_string())),
            BodyMode::Expression => BodyCheck::Expression(as_string()?),
        };

        Ok(Self {
            endpoint: endpoint.into(),
            status: expectation.status.clone(),
            check: Arc::new(check),
            expected: match expected {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            log_body: expectation.log_body,
            engine,
        })
    }

    /// Checks transport, status and body, in that order.
    pub fn validate(&self, outcome: Outcome) -> Result<()> {
        let response = outcome?;

        if !self.status.contains(&response.status) {
            return Err(Error::Status {
                status: response.status,
                expected: self.status.clone(),
                body: response.body_text(),
            });
        }

        if self.log_body {
            tracing::info!(endpoint = %self.endpoint, body = %response.body_text(), "response body");
        }

        let body = &response.body[..];
        let matched = match self.check.as_ref() {
            BodyCheck::Equal(expected) => body == expected.as_bytes(),
            BodyCheck::EqualJson(expected) => {
                let actual: Value = serde_json::from_slice(body)?;
                deep_equal(&actual, expected)
            }
            BodyCheck::Regex(Ok(pattern)) => pattern.is_match(body),
            BodyCheck::Regex(Err(e)) => {
                return Err(Error::Body {
                    body: response.body_text(),
                    expected: format!("a match for malformed pattern {} ({e})", self.expected),
                });
            }
            BodyCheck::Expression(program) => {
                match self.engine.execute(program, &BodyHost::new(body))? {
                    Value::Bool(b) => b,
                    other => {
                        return Err(Error::Expression(EvalError::Type {
                            name: "result".to_owned(),
                            message: format!("program must return a boolean, got {other}"),
                        }));
                    }
                }
            }
        };

        if matched {
            Ok(())
        } else {
            Err(Error::Body {
                body: response.body_text(),
                expected: self.expected.clone(),
            })
        }
    }
}

/// Structural JSON equality. Object key order is irrelevant and numbers compare
/// by value (`1 == 1.0`); otherwise types must match exactly.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| deep_equal(v, other)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Mutex};

    use bytes::Bytes;
    use serde_json::json;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::{expression::PcpEngine, request::HttpResponse};

    fn validator(mode: &str, exp: Value) -> ResponseValidator {
        let expectation = Expectation::builder()
            .status(vec![200])
            .body_expect_type(mode)
            .body_exp(exp)
            .build();
        ResponseValidator::new("test", &expectation, Arc::new(PcpEngine)).unwrap()
    }

    fn ok(body: &str) -> Outcome {
        Ok(HttpResponse {
            status: 200,
            body: Bytes::from(body.to_owned()),
        })
    }

    #[test]
    fn equal_mode() {
        let v = validator("equal", json!("123"));
        assert!(v.validate(ok("123")).is_ok());
        assert!(matches!(v.validate(ok("1234")), Err(Error::Body { .. })));
        assert!(v.validate(ok("")).is_err());
    }

    #[test]
    fn equal_json_ignores_key_order() {
        let v = validator("equal_json", json!({"a": 1, "b": 2}));
        assert!(v.validate(ok(r#"{"a":1,"b":2}"#)).is_ok());
        assert!(v.validate(ok(r#"{"b":2,"a":1}"#)).is_ok());
        assert!(v.validate(ok(r#"{ "b" : 2.0, "a" : 1 }"#)).is_ok());
        assert!(v.validate(ok(r#"{"a":1,"b":"2"}"#)).is_err());
        assert!(v.validate(ok(r#"{"a":1}"#)).is_err());
        assert!(matches!(v.validate(ok("{oops")), Err(Error::Json(_))));
    }

    #[test]
    fn regex_mode() {
        assert!(validator("reg", json!("[0-9]+")).validate(ok("123")).is_ok());
        assert!(validator("reg", json!("^[0-9]+$")).validate(ok("a23")).is_err());
        assert!(validator("reg", json!("ok")).validate(ok("all ok here")).is_ok());
    }

    #[test]
    fn malformed_pattern_fails_each_request() {
        let v = validator("reg", json!("[0-9"));
        assert!(matches!(v.validate(ok("1")), Err(Error::Body { .. })));
    }

    #[test]
    fn expression_mode() {
        let v = validator("pcp", json!(r#"["==", ["prop", ["getJson"], "errno"], 0]"#));
        assert!(v.validate(ok(r#"{"errno":0}"#)).is_ok());
        assert!(matches!(v.validate(ok(r#"{"errno":1}"#)), Err(Error::Body { .. })));
        assert!(matches!(v.validate(ok("<html>")), Err(Error::Expression(_))));
    }

    #[test]
    fn expression_must_return_a_boolean() {
        let v = validator("pcp", json!(r#"["prop", ["getJson"], "errno"]"#));
        assert!(matches!(v.validate(ok(r#"{"errno":0}"#)), Err(Error::Expression(_))));
    }

    #[test]
    fn status_is_checked_before_the_body() {
        let v = validator("equal", json!("ok"));
        let wrong = Ok(HttpResponse {
            status: 500,
            body: Bytes::from_static(b"ok"),
        });
        match v.validate(wrong) {
            Err(e @ Error::Status { status: 500, .. }) => {
                let msg = e.to_string();
                assert!(msg.contains("500") && msg.contains("[200]") && msg.contains("ok"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let expectation = Expectation::builder()
            .status(vec![200, 204])
            .body_expect_type("reg")
            .body_exp(".*")
            .build();
        let v = ResponseValidator::new("test", &expectation, Arc::new(PcpEngine)).unwrap();
        let accepted = Ok(HttpResponse {
            status: 204,
            body: Bytes::new(),
        });
        assert!(v.validate(accepted).is_ok());
    }

    /// In-memory sink for formatted `tracing` output.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn logged<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, captured.text())
    }

    fn logging_validator() -> ResponseValidator {
        let expectation = Expectation::builder()
            .status(vec![200])
            .body_expect_type("equal")
            .body_exp("expected")
            .log_body(true)
            .build();
        ResponseValidator::new("users", &expectation, Arc::new(PcpEngine)).unwrap()
    }

    #[test]
    fn log_body_emits_the_body_before_the_body_check() {
        let v = logging_validator();
        let (verdict, logs) = logged(|| v.validate(ok("unexpected-payload")));

        assert!(matches!(verdict, Err(Error::Body { .. })));
        assert!(logs.contains("INFO"), "{logs}");
        assert!(logs.contains("endpoint=users"), "{logs}");
        assert!(logs.contains("unexpected-payload"), "{logs}");
    }

    #[test]
    fn log_body_is_skipped_when_the_status_check_fails() {
        let v = logging_validator();
        let wrong = Ok(HttpResponse {
            status: 500,
            body: Bytes::from_static(b"server-side-oops"),
        });
        let (verdict, logs) = logged(|| v.validate(wrong));

        assert!(matches!(verdict, Err(Error::Status { status: 500, .. })));
        assert!(!logs.contains("server-side-oops"), "{logs}");
    }

    #[test]
    fn body_is_not_logged_by_default() {
        let v = validator("equal", json!("quiet-body"));
        let (verdict, logs) = logged(|| v.validate(ok("quiet-body")));

        assert!(verdict.is_ok());
        assert!(!logs.contains("quiet-body"), "{logs}");
    }

    #[test]
    fn transport_errors_are_propagated() {
        let v = validator("equal", json!("ok"));
        let outcome = Err(Error::config("stand-in for a transport failure"));
        assert!(matches!(v.validate(outcome), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_or_missing_mode_is_a_config_error() {
        let unknown = Expectation::builder().body_expect_type("xml").build();
        let err = ResponseValidator::new("t", &unknown, Arc::new(PcpEngine)).err().unwrap();
        assert!(err.is_config());

        let missing = Expectation::default();
        let err = ResponseValidator::new("t", &missing, Arc::new(PcpEngine)).err().unwrap();
        assert!(err.is_config());

        let not_a_string = Expectation::builder()
            .body_expect_type("reg")
            .body_exp(json!(5))
            .build();
        let err = ResponseValidator::new("t", &not_a_string, Arc::new(PcpEngine)).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn deep_equal_is_type_exact() {
        assert!(deep_equal(&json!([1, {"x": null}]), &json!([1.0, {"x": null}])));
        assert!(!deep_equal(&json!(null), &json!(false)));
        assert!(!deep_equal(&json!("1"), &json!(1)));
        assert!(!deep_equal(&json!([1, 2]), &json!([2, 1])));
    }
}
