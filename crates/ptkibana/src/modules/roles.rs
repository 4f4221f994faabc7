use super::{KibanaModule, Module};
use crate::config::Config;
use crate::http::{HttpClient, HttpResponse};
use crate::report::{Node, ReportSink, Severity};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

const ROLE_ENDPOINT: &str = "api/security/role";
const ROLE_NODE_TYPE: &str = "kbnRole";
const MISSING_NAME: &str = "None";
const LINE_INDENT: usize = 4;

// region:        --- Module info

pub struct RoleEnumeration {}

impl RoleEnumeration {
    pub fn new() -> Self {
        Self {}
    }
}

impl Module for RoleEnumeration {
    fn name(&self) -> String {
        "roles".to_string()
    }
    fn description(&self) -> String {
        "Kibana role enumeration".to_string()
    }
}

// endregion:     --- Module info

// region:        --- Models

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub name: String,
}

impl RoleRecord {
    /// Never fails: anything without a usable `name` becomes `"None"`.
    fn from_entry(entry: &Value) -> Self {
        let name = match entry.get("name") {
            Some(Value::String(name)) => name.clone(),
            None | Some(Value::Null) => MISSING_NAME.to_string(),
            Some(other) => other.to_string(),
        };
        Self { name }
    }

    fn to_node(&self) -> Node {
        Node::new(
            ROLE_NODE_TYPE,
            [("name".to_string(), Value::String(self.name.clone()))],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointOutcome {
    Available(Vec<RoleRecord>),
    /// HTTP status and raw body of the refused request.
    Unavailable(u16, String),
}

/// Response body, parsed once.
enum Body {
    Array(Vec<Value>),
    Object(Map<String, Value>),
    Scalar,
    Malformed,
}

impl Body {
    fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(entries)) => Body::Array(entries),
            Ok(Value::Object(object)) => Body::Object(object),
            Ok(_) => Body::Scalar,
            Err(err) => {
                debug!("Body is not JSON: {}", err);
                Body::Malformed
            }
        }
    }
}

// endregion:     --- Models

// region:        --- Classification

pub fn classify(response: &HttpResponse) -> EndpointOutcome {
    let unavailable = || EndpointOutcome::Unavailable(response.status, response.body.clone());

    if response.status != StatusCode::OK.as_u16() {
        return unavailable();
    }

    match Body::parse(&response.body) {
        Body::Array(entries) => {
            EndpointOutcome::Available(entries.iter().map(RoleRecord::from_entry).collect())
        }
        Body::Object(object) if embedded_status_is_ok(&object) => {
            info!("Object body without role list ({} keys)", object.len());
            EndpointOutcome::Available(Vec::new())
        }
        Body::Object(_) | Body::Scalar | Body::Malformed => unavailable(),
    }
}

/// Kibana wraps errors in a `200` with a `status` field. A missing field is fine,
/// any other value than `200` (wrong type included) is not.
fn embedded_status_is_ok(object: &Map<String, Value>) -> bool {
    match object.get("status") {
        None => true,
        Some(status) => status.as_f64() == Some(f64::from(StatusCode::OK.as_u16())),
    }
}

// endregion:     --- Classification

#[async_trait]
impl KibanaModule for RoleEnumeration {
    #[instrument(name = "check", level = "info", fields(module = self.name()), skip_all)]
    async fn run(
        &self,
        config: &Config,
        http_client: &dyn HttpClient,
        report: &mut dyn ReportSink,
    ) -> Result<()> {
        let url = config.endpoint(ROLE_ENDPOINT)?;
        let res = http_client.send(&url, Method::GET, &config.headers).await?;

        match classify(&res) {
            EndpointOutcome::Unavailable(status, body) => {
                info!("Roles not available (status {})", status);
                debug!("Body: {}", body);
                report.print_line(
                    "Could not fetch roles",
                    Severity::Ok,
                    LINE_INDENT,
                    !config.json,
                )?;
                report.print_line(
                    &format!("Details: {}", body),
                    Severity::Additions,
                    LINE_INDENT,
                    config.verbose && !config.json,
                )?;
            }
            EndpointOutcome::Available(roles) => {
                info!("{} roles found", roles.len());
                for role in roles {
                    report.print_line(
                        &format!("Found role: {}", role.name),
                        Severity::Info,
                        LINE_INDENT,
                        !config.json,
                    )?;
                    report.add_node(role.to_node());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use reqwest::Url;
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    // region:        --- Test doubles

    struct ScriptedClient {
        response: Option<HttpResponse>,
        requests: Mutex<Vec<(String, Method, Vec<(String, String)>)>>,
    }

    impl ScriptedClient {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: Some(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn refusing() -> Self {
            Self {
                response: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn send(
            &self,
            url: &Url,
            method: Method,
            headers: &[(String, String)],
        ) -> Result<HttpResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), method, headers.to_vec()));
            match &self.response {
                Some(response) => Ok(response.clone()),
                None => Err(Error::File(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        nodes: Vec<Node>,
        lines: Vec<(String, Severity)>,
    }

    impl ReportSink for RecordingSink {
        fn add_node(&mut self, node: Node) {
            self.nodes.push(node);
        }

        fn print_line(
            &mut self,
            text: &str,
            severity: Severity,
            _indent: usize,
            visible: bool,
        ) -> Result<()> {
            if visible {
                self.lines.push((text.to_string(), severity));
            }
            Ok(())
        }
    }

    fn config(json: bool, verbose: bool) -> Config {
        Config {
            url: Url::parse("http://kibana.local:5601/").unwrap(),
            proxy: None,
            timeout: Duration::from_secs(10),
            redirects: false,
            headers: vec![
                ("User-Agent".to_string(), "Penterep Tools".to_string()),
                ("Cookie".to_string(), "sid=42".to_string()),
            ],
            json,
            verbose,
            log_dir: None,
        }
    }

    async fn enumerate_roles(status: u16, body: &str, config: &Config) -> RecordingSink {
        let client = ScriptedClient::new(status, body);
        let mut sink = RecordingSink::default();
        RoleEnumeration::new()
            .run(config, &client, &mut sink)
            .await
            .unwrap();
        sink
    }

    fn node_names(sink: &RecordingSink) -> Vec<&str> {
        sink.nodes
            .iter()
            .map(|node| node.properties["name"].as_str().unwrap())
            .collect()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    // endregion:     --- Test doubles

    #[test]
    fn non_ok_status_is_unavailable() {
        for status in [201, 204, 301, 401, 403, 404, 500] {
            assert_eq!(
                EndpointOutcome::Unavailable(status, "[]".to_string()),
                classify(&response(status, "[]"))
            );
        }
    }

    #[test]
    fn ok_array_is_available_whatever_it_holds() {
        let outcome = classify(&response(200, r#"[{"name":"a"}, 3, "b", {"id":1}]"#));
        let names: Vec<String> = match outcome {
            EndpointOutcome::Available(roles) => roles.into_iter().map(|r| r.name).collect(),
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(vec!["a", "None", "None", "None"], names);

        assert_eq!(
            EndpointOutcome::Available(Vec::new()),
            classify(&response(200, "[]"))
        );
    }

    #[test]
    fn ok_object_depends_on_embedded_status() {
        assert_eq!(
            EndpointOutcome::Available(Vec::new()),
            classify(&response(200, r#"{"message":"ok"}"#))
        );
        assert_eq!(
            EndpointOutcome::Available(Vec::new()),
            classify(&response(200, r#"{"status":200}"#))
        );
        assert_eq!(
            EndpointOutcome::Unavailable(200, r#"{"status":404}"#.to_string()),
            classify(&response(200, r#"{"status":404}"#))
        );
        assert!(matches!(
            classify(&response(200, r#"{"status":"200"}"#)),
            EndpointOutcome::Unavailable(..)
        ));
    }

    #[test]
    fn unparsable_body_is_unavailable() {
        for body in ["<html>Kibana</html>", "", "[{\"name\":", "\"superuser\"", "42"] {
            assert_eq!(
                EndpointOutcome::Unavailable(200, body.to_string()),
                classify(&response(200, body))
            );
        }
    }

    #[test]
    fn role_names_keep_their_text() {
        assert_eq!("None", RoleRecord::from_entry(&json!({})).name);
        assert_eq!("None", RoleRecord::from_entry(&json!({"name": null})).name);
        assert_eq!("7", RoleRecord::from_entry(&json!({"name": 7})).name);
        assert_eq!(
            "kibana_admin",
            RoleRecord::from_entry(&json!({"name": "kibana_admin", "elasticsearch": {}})).name
        );
    }

    #[tokio::test]
    async fn two_roles_are_reported_in_order() {
        let config = config(false, false);
        let sink = enumerate_roles(
            200,
            r#"[{"name":"superuser"},{"name":"kibana_admin"}]"#,
            &config,
        )
        .await;

        assert_eq!(vec!["superuser", "kibana_admin"], node_names(&sink));
        assert!(sink.nodes.iter().all(|node| node.node_type == "kbnRole"));
        assert_eq!(
            vec![
                ("Found role: superuser".to_string(), Severity::Info),
                ("Found role: kibana_admin".to_string(), Severity::Info),
            ],
            sink.lines
        );
    }

    #[tokio::test]
    async fn forbidden_gives_one_diagnostic() {
        let sink = enumerate_roles(403, r#"{"message":"Forbidden"}"#, &config(false, false)).await;

        assert!(sink.nodes.is_empty());
        assert_eq!(
            vec![("Could not fetch roles".to_string(), Severity::Ok)],
            sink.lines
        );
    }

    #[tokio::test]
    async fn embedded_not_found_gives_one_diagnostic() {
        let sink = enumerate_roles(200, r#"{"status":404}"#, &config(false, false)).await;

        assert!(sink.nodes.is_empty());
        assert_eq!(1, sink.lines.len());
        assert_eq!("Could not fetch roles", sink.lines[0].0);
    }

    #[tokio::test]
    async fn empty_list_is_a_valid_enumeration() {
        let sink = enumerate_roles(200, "[]", &config(false, false)).await;

        assert!(sink.nodes.is_empty());
        assert!(sink.lines.is_empty());
    }

    #[tokio::test]
    async fn entry_without_name_is_reported_as_none() {
        let sink = enumerate_roles(200, r#"[{"id":1}]"#, &config(false, false)).await;

        assert_eq!(vec!["None"], node_names(&sink));
        assert_eq!("Found role: None", sink.lines[0].0);
    }

    #[tokio::test]
    async fn duplicates_are_kept() {
        let sink = enumerate_roles(
            200,
            r#"[{"name":"viewer"},{"name":"viewer"},{}]"#,
            &config(false, false),
        )
        .await;

        assert_eq!(vec!["viewer", "viewer", "None"], node_names(&sink));
    }

    #[tokio::test]
    async fn details_only_in_verbose_mode() {
        let body = r#"{"statusCode":401,"error":"Unauthorized"}"#;
        let sink = enumerate_roles(401, body, &config(false, true)).await;

        assert_eq!(
            vec![
                ("Could not fetch roles".to_string(), Severity::Ok),
                (format!("Details: {}", body), Severity::Additions),
            ],
            sink.lines
        );
    }

    #[tokio::test]
    async fn json_mode_keeps_nodes_and_hides_lines() {
        let sink = enumerate_roles(200, r#"[{"name":"superuser"}]"#, &config(true, false)).await;

        assert_eq!(vec!["superuser"], node_names(&sink));
        assert!(sink.lines.is_empty());

        let sink = enumerate_roles(500, "oops", &config(true, false)).await;
        assert!(sink.nodes.is_empty());
        assert!(sink.lines.is_empty());
    }

    #[tokio::test]
    async fn json_mode_hides_details_even_when_verbose() {
        let sink = enumerate_roles(403, r#"{"message":"Forbidden"}"#, &config(true, true)).await;

        assert!(sink.nodes.is_empty());
        assert!(sink.lines.is_empty());
    }

    #[tokio::test]
    async fn same_response_gives_same_nodes() {
        let config = config(false, false);
        let body = r#"[{"name":"b"},{"name":"a"},{"name":"b"}]"#;

        let first = enumerate_roles(200, body, &config).await;
        let second = enumerate_roles(200, body, &config).await;

        assert_eq!(first.nodes, second.nodes);
        assert_eq!(vec!["b", "a", "b"], node_names(&second));
    }

    #[tokio::test]
    async fn one_get_with_forwarded_headers() {
        let config = config(false, false);
        let client = ScriptedClient::new(200, "[]");
        let mut sink = RecordingSink::default();

        RoleEnumeration::new()
            .run(&config, &client, &mut sink)
            .await
            .unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(1, requests.len());
        let (url, method, headers) = &requests[0];
        assert_eq!("http://kibana.local:5601/api/security/role", url);
        assert_eq!(Method::GET, *method);
        assert_eq!(&config.headers, headers);
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let client = ScriptedClient::refusing();
        let mut sink = RecordingSink::default();

        let res = RoleEnumeration::new()
            .run(&config(false, false), &client, &mut sink)
            .await;

        assert!(matches!(res, Err(Error::File(_))));
        assert!(sink.nodes.is_empty());
        assert!(sink.lines.is_empty());
    }
}
