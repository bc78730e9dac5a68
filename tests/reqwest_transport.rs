//! End-to-end tests of the HTTP transport against a mock Redfish service.

#![cfg(feature = "http-client")]

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use mockito::Matcher;
use serde_json::json;

use tacklebox::client::{ReqwestTransport, TracingTransport, Transport};
use tacklebox::registry::{MessageResolver, ServiceRegistrySource};
use tacklebox::{Error, Outcome, ResponseVerifier, ServiceConfig, TaskMonitor, TaskState};

const MONITOR: &str = "/redfish/v1/TaskService/TaskMonitors/9";

mod requests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_basic_auth_from_config() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/redfish/v1/Systems/1")
            .match_header("authorization", "Basic cm9vdDpjYWx2aW4=")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Id": "1", "PowerState": "On"}"#)
            .create_async()
            .await;

        let mut config = ServiceConfig::new(server.url());
        config.username = Some("root".into());
        config.password = Some("calvin".into());
        let transport = ReqwestTransport::from_config(&config).unwrap();

        let response = transport.get("/redfish/v1/Systems/1").await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().unwrap().unwrap()["PowerState"], "On");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_session_token_and_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/redfish/v1/Managers/1")
            .match_header("x-auth-token", "abc123")
            .match_body(Matcher::Json(json!({"DateTime": "2024-05-01T00:00:00Z"})))
            .with_status(204)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(&server.url())
            .unwrap()
            .with_session_token("abc123");
        let response = transport
            .patch("/redfish/v1/Managers/1", &json!({"DateTime": "2024-05-01T00:00:00Z"}))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.has_empty_body());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_a_response_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/redfish/v1/AccountService/Accounts/1")
            .with_status(405)
            .with_body(r#"{"error": {"@Message.ExtendedInfo": [{"MessageId": "Base.1.8.ActionNotSupported", "MessageArgs": ["Delete"]}]}}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(&server.url()).unwrap();
        let response = transport
            .delete("/redfish/v1/AccountService/Accounts/1")
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

        let result = ResponseVerifier::new(MessageResolver::bundled())
            .verify(&response)
            .await;
        assert_eq!(result.outcome, Outcome::Failure);
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let transport = ReqwestTransport::new("http://127.0.0.1:1").unwrap();
        let err = transport.get("/redfish/v1").await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }
}

mod long_running_operations {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_simple_update_through_task_monitor() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate")
            .with_status(202)
            .with_header("location", MONITOR)
            .with_header("content-type", "application/json")
            .with_body(r##"{"@odata.type": "#Task.v1_7_0.Task", "Id": "9", "TaskState": "New"}"##)
            .create_async()
            .await;
        let running = server
            .mock("GET", MONITOR)
            .with_status(202)
            .with_header("retry-after", "0")
            .with_body(r##"{"@odata.type": "#Task.v1_7_0.Task", "Id": "9", "TaskState": "Running", "PercentComplete": 40}"##)
            .expect(1)
            .create_async()
            .await;
        let completed = server
            .mock("GET", MONITOR)
            .with_status(200)
            .with_body(
                json!({
                    "@odata.type": "#Task.v1_7_0.Task",
                    "Id": "9",
                    "TaskState": "Completed",
                    "PercentComplete": 100,
                    "Messages": [{"MessageId": "TaskEvent.1.0.TaskCompletedOK", "MessageArgs": ["9"]}]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let http = ReqwestTransport::new(&server.url()).unwrap();
        let accepted = http
            .post(
                "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
                &json!({"ImageURI": "http://files.example/bmc.bin"}),
            )
            .await
            .unwrap();
        assert_eq!(accepted.status, StatusCode::ACCEPTED);

        let transport = Arc::new(TracingTransport::new(http).with_headers(true));
        let states = Arc::new(std::sync::Mutex::new(Vec::new()));
        let observed = Arc::clone(&states);
        let monitor = TaskMonitor::new(Arc::clone(&transport))
            .with_poll_interval(Duration::from_millis(10))
            .with_max_wait(Duration::from_secs(10))
            .with_progress(move |snapshot: &tacklebox::TaskSnapshot| {
                observed.lock().unwrap().push(snapshot.state);
            });
        let verifier = ResponseVerifier::new(MessageResolver::new(ServiceRegistrySource::new(
            Arc::clone(&transport),
        )));

        let result = monitor.run_and_verify(accepted, &verifier).await.unwrap();

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.summary(), "The task with Id '9' has completed.");
        assert_eq!(*states.lock().unwrap(), vec![Some(TaskState::Running)]);
        running.assert_async().await;
        completed.assert_async().await;
    }
}
