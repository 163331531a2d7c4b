//! Integration tests for the Redfish client using wiremock
//!
//! These tests verify the HTTP transport and graph navigation against
//! mocked services, including status handling, conditional writes and
//! session authentication.

use rfnav::redfish::{format_redfish_error, ClientOptions, RedfishClient};
use rfnav::{Created, Error, Transport};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RedfishClient {
    RedfishClient::new(ClientOptions::new(&server.uri())).expect("client should build")
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Test module for raw transport verbs
mod transport_tests {
    use super::*;

    /// Test successful GET request returns parsed JSON
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/redfish/v1/Systems/1"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Id": "1", "PowerState": "On"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let doc = client.get("/redfish/v1/Systems/1").await.unwrap();
        assert_eq!(doc["PowerState"], "On");

        // Absolute addresses are used verbatim
        let absolute = format!("{}/redfish/v1/Systems/1", server.uri());
        assert_eq!(client.get(&absolute).await.unwrap()["Id"], "1");
    }

    /// Test empty GET body reads as an empty object
    #[tokio::test]
    async fn test_get_empty_body_is_empty_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/redfish/v1/Empty"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.get("/redfish/v1/Empty").await.unwrap(), json!({}));
    }

    /// Test non-JSON GET body is a transport error
    #[tokio::test]
    async fn test_get_non_json_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/redfish/v1/Broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get("/redfish/v1/Broken").await.unwrap_err();
        assert!(matches!(err, Error::Malformed { method: "GET", .. }));
        assert!(err.is_transport());
    }

    /// Test error statuses carry method, URL and status
    #[tokio::test]
    async fn test_404_returns_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/redfish/v1/Systems/404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "Base.1.0.ResourceMissingAtURI"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get("/redfish/v1/Systems/404").await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        let message = err.to_string();
        assert!(message.contains("GET"));
        assert!(message.contains("/redfish/v1/Systems/404"));
        assert_eq!(format_redfish_error(&err), "Resource not found.");
    }

    /// Test POST returns a body only on 200/201
    #[tokio::test]
    async fn test_post_body_depends_on_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/redfish/v1/Accepted"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/redfish/v1/Created"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "new"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/redfish/v1/Garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.post("/redfish/v1/Accepted", None).await.unwrap(), None);
        assert_eq!(
            client.post("/redfish/v1/Created", None).await.unwrap(),
            Some(json!({"Id": "new"}))
        );
        assert_eq!(client.post("/redfish/v1/Garbage", None).await.unwrap(), None);
    }

    /// Test PATCH sends If-Match when a version token is given
    #[tokio::test]
    async fn test_patch_sends_if_match() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/redfish/v1/Systems/1"))
            .and(header("if-match", "W/\"abc\""))
            .and(body_json(json!({"AssetTag": "rack-7"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .patch("/redfish/v1/Systems/1", &json!({"AssetTag": "rack-7"}), Some("W/\"abc\""))
            .await
            .unwrap();
    }

    /// Test 412 on a stale version token
    #[tokio::test]
    async fn test_patch_precondition_failed() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/redfish/v1/Systems/1"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .patch("/redfish/v1/Systems/1", &json!({"AssetTag": "x"}), Some("W/\"old\""))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(412));
        assert!(format_redfish_error(&err).contains("ETag"));
    }

    /// Test DELETE accepts any 2xx
    #[tokio::test]
    async fn test_delete_success() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/redfish/v1/AccountService/Accounts/3"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete("/redfish/v1/AccountService/Accounts/3").await.unwrap();
    }
}

/// Test module for authentication
mod auth_tests {
    use super::*;

    /// Test session login, token use and logout
    #[tokio::test]
    async fn test_session_login_and_logout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/redfish/v1/SessionService/Sessions"))
            .and(body_json(json!({"UserName": "admin", "Password": "secret"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Auth-Token", "tok-123")
                    .insert_header("Location", "/redfish/v1/SessionService/Sessions/9"),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/redfish/v1"))
            .and(header("x-auth-token", "tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "@odata.id": "/redfish/v1",
                "Id": "RootService"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/redfish/v1/SessionService/Sessions/9"))
            .and(header("x-auth-token", "tok-123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = RedfishClient::new(
            ClientOptions::new(&server.uri()).with_credentials("admin", "secret"),
        )
        .unwrap();

        let mut root = client.connect().await.unwrap();
        assert!(client.is_logged_in().await);
        assert_eq!(root.identity().await.unwrap(), "RootService");

        // Cached: no second GET
        assert_eq!(client.attr("Id").await.unwrap(), "RootService");

        client.logout().await.unwrap();
        assert!(!client.is_logged_in().await);
    }

    /// Test rejected credentials surface as a login error
    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/redfish/v1/SessionService/Sessions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = RedfishClient::new(
            ClientOptions::new(&server.uri()).with_credentials("admin", "wrong"),
        )
        .unwrap();

        assert!(matches!(client.connect().await, Err(Error::Login(_))));
        assert!(!client.is_logged_in().await);
    }

    /// Test HTTP Basic auth when sessions are disabled
    #[tokio::test]
    async fn test_basic_auth_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/redfish/v1"))
            .and(header("authorization", "Basic dTpw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": "RootService"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = RedfishClient::new(
            ClientOptions::new(&server.uri())
                .with_credentials("u", "p")
                .with_basic_auth(),
        )
        .unwrap();

        client.connect().await.unwrap();
        assert!(!client.is_logged_in().await);
    }
}

/// Test module for graph navigation over HTTP
mod navigation_tests {
    use super::*;

    async fn mount_service(server: &MockServer) {
        let documents = [
            (
                "/redfish/v1",
                json!({
                    "@odata.id": "/redfish/v1",
                    "@odata.type": "#ServiceRoot.v1_5_0.ServiceRoot",
                    "Id": "RootService",
                    "Systems": {"@odata.id": "/redfish/v1/Systems"}
                }),
            ),
            (
                "/redfish/v1/Systems",
                json!({
                    "@odata.id": "/redfish/v1/Systems",
                    "Members": [{"@odata.id": "/redfish/v1/Systems/1"}],
                    "Members@odata.count": 1
                }),
            ),
            (
                "/redfish/v1/Systems/1",
                json!({
                    "@odata.id": "/redfish/v1/Systems/1",
                    "@odata.type": "#ComputerSystem.v1_10_0.ComputerSystem",
                    "@odata.etag": "W/\"abc\"",
                    "Id": "1",
                    "AssetTag": "rack-1",
                    "PowerState": "On",
                    "Status": {"State": "Enabled", "Health": "OK"},
                    "Actions": {
                        "#ComputerSystem.Reset": {
                            "target": "/redfish/v1/Systems/1/Actions/ComputerSystem.Reset",
                            "@Redfish.ActionInfo": "/redfish/v1/Systems/1/ResetActionInfo"
                        }
                    }
                }),
            ),
            (
                "/redfish/v1/Systems/1/ResetActionInfo",
                json!({
                    "Parameters": [{
                        "Name": "ResetType",
                        "Required": true,
                        "DataType": "String",
                        "AllowableValues": ["On", "ForceOff"]
                    }]
                }),
            ),
        ];

        for (address, document) in documents {
            Mock::given(method("GET"))
                .and(path(address))
                .respond_with(ResponseTemplate::new(200).set_body_json(document))
                .mount(server)
                .await;
        }
    }

    /// Test root -> singular System -> nested object
    #[tokio::test]
    async fn test_navigate_to_single_system() {
        let server = MockServer::start().await;
        mount_service(&server).await;

        let client = client_for(&server);
        let mut system = client
            .attr("System")
            .await
            .unwrap()
            .into_resource()
            .expect("System should be a resource");

        assert!(system.is_materialized());
        assert_eq!(system.attr("PowerState").await.unwrap(), "On");
        assert_eq!(system.child("Status").await.unwrap().attr("Health").await.unwrap(), "OK");
        assert_eq!(system.action_names().await.unwrap(), vec!["Reset".to_string()]);
        assert_eq!(
            system.to_string(),
            "<Resource #ComputerSystem.v1_10_0.ComputerSystem (1)>"
        );
    }

    /// Test invalid action arguments never reach the service
    #[tokio::test]
    async fn test_invalid_action_arguments_send_nothing() {
        let server = MockServer::start().await;
        mount_service(&server).await;

        Mock::given(method("POST"))
            .and(path("/redfish/v1/Systems/1/Actions/ComputerSystem.Reset"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut system = client.fetch("/redfish/v1/Systems/1").await.unwrap();

        let err = system.invoke("Reset", Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = system
            .invoke("Reset", args(json!({"ResetType": "Sideways"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Sideways"));
    }

    /// Test a valid invocation posts the arguments to the target
    #[tokio::test]
    async fn test_invoke_posts_to_target() {
        let server = MockServer::start().await;
        mount_service(&server).await;

        Mock::given(method("POST"))
            .and(path("/redfish/v1/Systems/1/Actions/ComputerSystem.Reset"))
            .and(body_json(json!({"ResetType": "ForceOff"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut system = client.fetch("/redfish/v1/Systems/1").await.unwrap();
        let response = system
            .invoke("Reset", args(json!({"ResetType": "ForceOff"})))
            .await
            .unwrap();
        assert_eq!(response, None);
    }

    /// Test setting a simple field PATCHes it with the ETag
    #[tokio::test]
    async fn test_set_attribute_patches_with_etag() {
        let server = MockServer::start().await;
        mount_service(&server).await;

        Mock::given(method("PATCH"))
            .and(path("/redfish/v1/Systems/1"))
            .and(header("if-match", "W/\"abc\""))
            .and(body_json(json!({"AssetTag": "rack-2"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut system = client.fetch("/redfish/v1/Systems/1").await.unwrap();
        system.set_attr("AssetTag", json!("rack-2")).await.unwrap();
        assert_eq!(system.attr("AssetTag").await.unwrap(), "rack-2");
    }

    /// Test create returns the new member from the response body
    #[tokio::test]
    async fn test_create_member() {
        let server = MockServer::start().await;
        mount_service(&server).await;

        Mock::given(method("POST"))
            .and(path("/redfish/v1/Systems"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "@odata.id": "/redfish/v1/Systems/2",
                "Id": "2"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut systems = client.fetch("/redfish/v1/Systems").await.unwrap();
        assert_eq!(systems.len().await.unwrap(), 1);

        match systems.create(&json!({"Name": "new"})).await.unwrap() {
            Created::Member(member) => assert_eq!(member.address(), Some("/redfish/v1/Systems/2")),
            Created::Refreshed => panic!("expected the created member"),
        }
    }
}
