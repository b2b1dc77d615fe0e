//! Blocking client for the on-demand VM API.
//!
//! # Design
//! `VmClient` owns a `UrlBuilder`, the customer's API token and a
//! `Transport`. Each operation validates its identifiers, builds an
//! `HttpRequest`, sends it, and turns the response into a normalized
//! `Envelope`. The only state that changes between calls is the last raw
//! response, kept for inspection; operations therefore take `&mut self`.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::VmConfig;
use crate::envelope::{check_response, synthesized, Envelope, ErrorCode, Shape};
use crate::error::VmError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::routes::{billing, instances, meetings, recordings, regions};
use crate::url_builder::{encode_query, UrlBuilder};
use crate::validate::{check_instance_name, check_recording_id};

pub const API_TOKEN_HEADER: &str = "APITOKEN";
pub const DEFAULT_MACHINE_SIZE: &str = "small";

#[derive(Debug)]
pub struct VmClient<T = UreqTransport> {
    urls: UrlBuilder,
    api_token: String,
    transport: T,
    last_response: Option<HttpResponse>,
}

impl VmClient<UreqTransport> {
    pub fn new(config: &VmConfig) -> Self {
        let transport = UreqTransport::new(config.accept_invalid_certs);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> VmClient<T> {
    pub fn with_transport(config: &VmConfig, transport: T) -> Self {
        Self {
            urls: UrlBuilder::new(&config.customer_id, &config.base_api_url),
            api_token: config.customer_api_token.clone(),
            transport,
            last_response: None,
        }
    }

    pub fn url_builder(&self) -> &UrlBuilder {
        &self.urls
    }

    /// The raw response behind the most recent call, if one was received.
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    // -----------------------------------------------------------------------
    // Billing
    // -----------------------------------------------------------------------

    pub fn billing_activity(&mut self) -> Envelope {
        let url = self.urls.build_url(billing::ACTIVITY, &[], None);
        self.exec(HttpMethod::Get, url, None, Shape::Item)
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    /// List instances, optionally filtered by query parameters.
    pub fn list_instances(&mut self, query: &[(&str, &str)]) -> Envelope {
        let query = encode_query(query);
        let url = self.urls.build_url(instances::LIST, &[], Some(&query));
        self.exec(HttpMethod::Get, url, None, Shape::Collection)
    }

    /// Create an instance. `params` is merged over `{"MachineSize": "small"}`.
    pub fn create_instance(&mut self, params: Map<String, Value>) -> Envelope {
        let mut payload = Map::new();
        payload.insert("MachineSize".to_string(), json!(DEFAULT_MACHINE_SIZE));
        payload.extend(params);

        let url = self.urls.build_url(instances::CREATE, &[], None);
        self.exec(HttpMethod::Post, url, Some(Value::Object(payload)), Shape::Item)
    }

    pub fn get_instance(&mut self, name: &str) -> Result<Envelope, VmError> {
        check_instance_name(name)?;
        let url = self.urls.build_url(instances::GET, &[("name", name)], None);
        Ok(self.exec(HttpMethod::Get, url, None, Shape::Item))
    }

    pub fn delete_instance(&mut self, name: &str) -> Result<Envelope, VmError> {
        check_instance_name(name)?;
        let url = self.urls.build_url(instances::DELETE, &[("name", name)], None);
        Ok(self.exec(HttpMethod::Delete, url, None, Shape::Item))
    }

    pub fn start_instance(&mut self, name: &str) -> Result<Envelope, VmError> {
        check_instance_name(name)?;
        let url = self.urls.build_url(instances::START, &[("name", name)], None);
        Ok(self.exec(HttpMethod::Patch, url, Some(json!({ "name": name })), Shape::Item))
    }

    pub fn stop_instance(&mut self, name: &str) -> Result<Envelope, VmError> {
        check_instance_name(name)?;
        let url = self.urls.build_url(instances::STOP, &[("name", name)], None);
        Ok(self.exec(HttpMethod::Put, url, Some(json!({ "name": name })), Shape::Item))
    }

    pub fn instance_history(&mut self, name: &str) -> Envelope {
        let url = self.urls.build_url(instances::HISTORY, &[("name", name)], None);
        self.exec(HttpMethod::Get, url, None, Shape::Item)
    }

    // -----------------------------------------------------------------------
    // Meetings
    // -----------------------------------------------------------------------

    pub fn list_meetings(&mut self) -> Envelope {
        let url = self.urls.build_url(meetings::LIST, &[], None);
        self.exec(HttpMethod::Get, url, None, Shape::Collection)
    }

    pub fn get_meeting(&mut self, meeting_id: &str) -> Envelope {
        let url = self.urls.build_url(meetings::GET, &[("meetingID", meeting_id)], None);
        self.exec(HttpMethod::Get, url, None, Shape::Item)
    }

    // -----------------------------------------------------------------------
    // Recordings
    // -----------------------------------------------------------------------

    pub fn list_recordings(&mut self) -> Envelope {
        let url = self.urls.build_url(recordings::LIST, &[], None);
        self.exec(HttpMethod::Get, url, None, Shape::Collection)
    }

    pub fn get_recording(&mut self, recording_id: &str) -> Result<Envelope, VmError> {
        check_recording_id(recording_id)?;
        let url = self.urls.build_url(recordings::GET, &[("recordingID", recording_id)], None);
        Ok(self.exec(HttpMethod::Get, url, None, Shape::Item))
    }

    pub fn publish_recording(&mut self, recording_id: &str) -> Result<Envelope, VmError> {
        check_recording_id(recording_id)?;
        let url = self.urls.build_url(recordings::PUBLISH, &[("recordingID", recording_id)], None);
        let body = json!({ "recordingID": recording_id });
        Ok(self.exec(HttpMethod::Put, url, Some(body), Shape::Item))
    }

    pub fn unpublish_recording(&mut self, recording_id: &str) -> Result<Envelope, VmError> {
        check_recording_id(recording_id)?;
        let url = self.urls.build_url(recordings::UNPUBLISH, &[("recordingID", recording_id)], None);
        let body = json!({ "recordingID": recording_id });
        Ok(self.exec(HttpMethod::Patch, url, Some(body), Shape::Item))
    }

    pub fn delete_recording(&mut self, recording_id: &str) -> Result<Envelope, VmError> {
        check_recording_id(recording_id)?;
        let url = self.urls.build_url(recordings::DELETE, &[("recordingID", recording_id)], None);
        Ok(self.exec(HttpMethod::Delete, url, None, Shape::Item))
    }

    // -----------------------------------------------------------------------
    // Regions
    // -----------------------------------------------------------------------

    pub fn list_regions(&mut self) -> Envelope {
        let url = self.urls.build_url(regions::LIST, &[], None);
        self.exec(HttpMethod::Get, url, None, Shape::Collection)
    }

    // -----------------------------------------------------------------------
    // Request execution
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, url: String, payload: Option<Value>) -> HttpRequest {
        let mut headers = vec![(API_TOKEN_HEADER.to_string(), self.api_token.clone())];
        let body = payload.map(|p| {
            headers.push(("content-type".to_string(), "application/json".to_string()));
            p.to_string()
        });
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    fn exec(&mut self, method: HttpMethod, url: String, payload: Option<Value>, shape: Shape) -> Envelope {
        let request = self.request(method, url, payload);
        debug!(method = %request.method, url = %request.url, "sending request");

        let envelope = match self.transport.send(&request) {
            Ok(response) => {
                debug!(status = response.status, "received response");
                let envelope = check_response(&response);
                self.last_response = Some(response);
                envelope
            }
            Err(err) => {
                self.last_response = None;
                synthesized(ErrorCode::Internal, &err.to_string())
            }
        };
        envelope.normalize(shape)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::envelope::Status;
    use crate::http::TransportError;

    const BASE: &str = "https://api.example.com/api/v1";
    const INSTANCE: &str = "bbb-0123456789abcdef";
    const RECORDING: &str = "6e35e3b2778883f5db637d7a5dba0a427f692e91-1546529412476";

    /// Replays canned results and records every request it is given.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn reply(self, status: u16, body: &str) -> Self {
            self.replies.borrow_mut().push_back(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
            self
        }

        fn fail(self, message: &str) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Err(TransportError(message.to_string())));
            self
        }

        fn last(&self) -> HttpRequest {
            self.sent.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("no scripted reply".to_string())))
        }
    }

    fn config() -> VmConfig {
        VmConfig::new("cust42", "secret-token", BASE)
    }

    fn client(transport: &ScriptedTransport) -> VmClient<&ScriptedTransport> {
        VmClient::with_transport(&config(), transport)
    }

    fn url(route: &str) -> String {
        format!("{BASE}/cust42/vm/{route}")
    }

    #[test]
    fn create_instance_defaults_machine_size() {
        let transport = ScriptedTransport::default()
            .reply(200, r#"{"status":"success","data":{"Name":"bbb-0123456789abcdef"}}"#);
        let envelope = client(&transport).create_instance(Map::new());

        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, url("instances"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"MachineSize": "small"}));
        assert!(envelope.is_success());
        assert_eq!(envelope.data, Some(json!({"Name": INSTANCE})));
    }

    #[test]
    fn create_instance_caller_params_win() {
        let transport = ScriptedTransport::default().reply(200, r#"{"status":"success","data":null}"#);
        let mut params = Map::new();
        params.insert("MachineSize".to_string(), json!("large"));
        params.insert("Region".to_string(), json!("eu-west-1"));
        let envelope = client(&transport).create_instance(params);

        let body: Value = serde_json::from_str(transport.last().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"MachineSize": "large", "Region": "eu-west-1"}));
        assert_eq!(envelope.data, Some(Value::Null));
    }

    #[test]
    fn every_request_carries_api_token() {
        let transport = ScriptedTransport::default().reply(200, r#"{"status":"success","data":[]}"#);
        client(&transport).list_regions();
        assert_eq!(transport.last().header(API_TOKEN_HEADER), Some("secret-token"));
    }

    #[test]
    fn list_instances_encodes_query_and_normalizes() {
        let transport = ScriptedTransport::default().reply(200, r#"{"status":"success","data":null}"#);
        let envelope = client(&transport).list_instances(&[("status", "running"), ("region", "us east")]);

        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{}?status=running&region=us+east", url("instances")));
        assert!(req.body.is_none());
        assert_eq!(envelope.data, Some(json!([])));
    }

    #[test]
    fn list_instances_without_query_has_no_question_mark() {
        let transport = ScriptedTransport::default().reply(200, r#"{"status":"success","data":[]}"#);
        client(&transport).list_instances(&[]);
        assert_eq!(transport.last().url, url("instances"));
    }

    #[test]
    fn instance_operations_use_name_routes_and_verbs() {
        let ok = r#"{"status":"success","data":""}"#;
        let transport = ScriptedTransport::default()
            .reply(200, ok)
            .reply(200, ok)
            .reply(200, ok)
            .reply(200, ok)
            .reply(200, ok);
        let mut c = client(&transport);

        let envelope = c.get_instance(INSTANCE).unwrap();
        assert_eq!(envelope.data, Some(Value::Null));
        c.delete_instance(INSTANCE).unwrap();
        c.start_instance(INSTANCE).unwrap();
        c.stop_instance(INSTANCE).unwrap();
        c.instance_history(INSTANCE);

        let sent = transport.sent.borrow();
        let calls: Vec<(HttpMethod, &str)> = sent.iter().map(|r| (r.method, r.url.as_str())).collect();
        let get = url(&format!("instances/{INSTANCE}"));
        let start = url(&format!("instances/{INSTANCE}/start"));
        let stop = url(&format!("instances/{INSTANCE}/stop"));
        let history = url(&format!("instances/{INSTANCE}/history"));
        assert_eq!(
            calls,
            vec![
                (HttpMethod::Get, get.as_str()),
                (HttpMethod::Delete, get.as_str()),
                (HttpMethod::Patch, start.as_str()),
                (HttpMethod::Put, stop.as_str()),
                (HttpMethod::Get, history.as_str()),
            ]
        );
        let start_body: Value = serde_json::from_str(sent[2].body.as_deref().unwrap()).unwrap();
        assert_eq!(start_body, json!({"name": INSTANCE}));
    }

    #[test]
    fn invalid_instance_name_sends_nothing() {
        let transport = ScriptedTransport::default();
        let mut c = client(&transport);

        assert!(matches!(c.get_instance("BBB-0123456789ABCDEF"), Err(VmError::InvalidArgument(_))));
        assert!(matches!(c.start_instance("short"), Err(VmError::InvalidArgument(_))));
        assert!(matches!(c.stop_instance(""), Err(VmError::InvalidArgument(_))));
        assert!(matches!(c.delete_instance(&"a".repeat(23)), Err(VmError::InvalidArgument(_))));
        assert!(transport.sent.borrow().is_empty());
        assert!(c.last_response().is_none());
    }

    #[test]
    fn recording_operations_use_verbs_and_bodies() {
        let ok = r#"{"status":"success","data":null}"#;
        let transport = ScriptedTransport::default()
            .reply(200, ok)
            .reply(200, ok)
            .reply(200, ok)
            .reply(200, ok);
        let mut c = client(&transport);

        c.get_recording(RECORDING).unwrap();
        c.publish_recording(RECORDING).unwrap();
        c.unpublish_recording(RECORDING).unwrap();
        c.delete_recording(RECORDING).unwrap();

        let sent = transport.sent.borrow();
        let target = url(&format!("recordings/{RECORDING}"));
        assert!(sent.iter().all(|r| r.url == target));
        let methods: Vec<HttpMethod> = sent.iter().map(|r| r.method).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Put, HttpMethod::Patch, HttpMethod::Delete]
        );
        let body: Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"recordingID": RECORDING}));
        assert!(sent[3].body.is_none());
    }

    #[test]
    fn invalid_recording_id_sends_nothing() {
        let transport = ScriptedTransport::default();
        let mut c = client(&transport);
        assert!(c.publish_recording("abc").is_err());
        assert!(c.unpublish_recording(&RECORDING.to_uppercase()).is_err());
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn meeting_id_is_escaped() {
        let transport = ScriptedTransport::default().reply(200, r#"{"status":"success","data":{}}"#);
        client(&transport).get_meeting("room 1/a");
        assert_eq!(transport.last().url, url("meetings/room%201%2Fa"));
    }

    #[test]
    fn collection_routes() {
        let ok = r#"{"status":"success","data":""}"#;
        let transport = ScriptedTransport::default().reply(200, ok).reply(200, ok).reply(200, ok);
        let mut c = client(&transport);

        assert_eq!(c.list_meetings().data, Some(json!([])));
        assert_eq!(c.list_recordings().data, Some(json!([])));
        assert_eq!(c.list_regions().data, Some(json!([])));

        let urls: Vec<String> = transport.sent.borrow().iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls, vec![url("meetings"), url("recordings"), url("regions")]);
    }

    #[test]
    fn billing_activity_is_single_item() {
        let transport = ScriptedTransport::default().reply(200, r#"{"status":"success","data":null}"#);
        let envelope = client(&transport).billing_activity();
        assert_eq!(transport.last().url, url("billing/activity"));
        assert_eq!(envelope.data, Some(Value::Null));
    }

    #[test]
    fn transport_failure_is_internal_error() {
        let transport = ScriptedTransport::default().fail("connection refused");
        let mut c = client(&transport);
        let envelope = c.list_regions();

        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.message_text(), Some("[ERR:3] connection refused"));
        assert_eq!(envelope.data, Some(Value::Null));
        assert!(c.last_response().is_none());
    }

    #[test]
    fn last_response_tracks_most_recent_call() {
        let transport = ScriptedTransport::default()
            .reply(404, r#"{"status":"fail","data":null,"message":"no such instance"}"#)
            .reply(200, r#"{"status":"success","data":[]}"#);
        let mut c = client(&transport);

        let envelope = c.get_instance(INSTANCE).unwrap();
        assert_eq!(envelope.status, Status::Fail);
        assert_eq!(envelope.message_text(), Some("no such instance"));
        assert_eq!(c.last_response().unwrap().status, 404);

        c.list_meetings();
        assert_eq!(c.last_response().unwrap().status, 200);
    }

    #[test]
    fn error_envelope_is_not_normalized() {
        let transport = ScriptedTransport::default().reply(200, "");
        let envelope = client(&transport).list_instances(&[]);
        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.data, Some(Value::Null));
    }
}
