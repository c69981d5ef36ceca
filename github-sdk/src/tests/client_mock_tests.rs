//! Mock-based tests for the GitHub client
//!
//! These tests run the typed endpoint groups against a wiremock server and
//! check request shapes, decoding and error mapping.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::{GitHubClient, DIFF_MEDIA_TYPE};
    use crate::error::ServiceError;
    use crate::models::RepoRef;

    fn repo() -> RepoRef {
        RepoRef::new("octo", "widgets")
    }

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::builder()
            .base_url(server.uri())
            .token("test-token")
            .build()
            .expect("client should build")
    }

    fn pull_json(number: u64, title: &str) -> serde_json::Value {
        json!({
            "number": number,
            "title": title,
            "body": null,
            "state": "closed",
            "user": {"login": "alice", "type": "User"},
            "created_at": "2024-03-01T10:00:00Z",
            "closed_at": "2024-03-02T10:00:00Z",
            "merged_at": "2024-03-02T10:00:00Z",
            "html_url": format!("https://github.com/octo/widgets/pull/{}", number),
            "head": {"ref": "feature", "sha": "abc"},
            "base": {"ref": "main", "sha": "def"}
        })
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = GitHubClient::builder().build().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = GitHubClient::builder().token("   ").build().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_closed_pulls_sends_expected_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .and(query_param("state", "closed"))
            .and(query_param("sort", "updated"))
            .and(query_param("direction", "desc"))
            .and(query_param("per_page", "50"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([pull_json(7, "Fix crash"), pull_json(8, "Add flag")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let pulls = client_for(&server).list_closed_pulls(&repo(), 50, 1).await.unwrap();

        assert_eq!(pulls.len(), 2);
        assert_eq!(pulls[0].number, 7);
        assert!(pulls[0].is_merged());
        assert_eq!(pulls[0].body_text(), "");
        assert_eq!(pulls[1].base.name, "main");
    }

    #[tokio::test]
    async fn test_pull_diff_uses_diff_media_type() {
        let server = MockServer::start().await;
        let diff = "diff --git a/src/lib.rs b/src/lib.rs\n-old\n+new\n";

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/7"))
            .and(header("accept", DIFF_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string(diff))
            .mount(&server)
            .await;

        let text = client_for(&server).get_pull_diff(&repo(), 7).await.unwrap();
        assert_eq!(text, diff);
    }

    #[tokio::test]
    async fn test_not_found_is_mapped_with_context() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/contents/go.mod"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_file(&repo(), "go.mod").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.endpoint(), Some("repos/octo/widgets/contents/go.mod"));
    }

    #[tokio::test]
    async fn test_rate_limited_forbidden_is_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/issues"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "API rate limit exceeded for installation"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_closed_issues_raw(&repo(), 100)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), ServiceError::RateLimit(_)));
    }

    #[tokio::test]
    async fn test_pull_files_follow_pagination() {
        let server = MockServer::start().await;
        let full_page: Vec<_> = (0..100)
            .map(|i| json!({"filename": format!("src/file_{}.rs", i), "patch": "+x"}))
            .collect();

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/9/files"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(full_page)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/9/files"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"filename": "README.md"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let files = client_for(&server).list_pull_files(&repo(), 9).await.unwrap();

        assert_eq!(files.len(), 101);
        assert_eq!(files[100].filename, "README.md");
        assert!(files[100].patch.is_none());
    }

    #[tokio::test]
    async fn test_file_content_is_decoded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/contents/README.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "README.md",
                "path": "README.md",
                "type": "file",
                "size": 11,
                "content": "aGVsbG8g\nd29ybGQ=\n",
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let item = client_for(&server).get_file(&repo(), "README.md").await.unwrap();
        assert!(item.is_file());
        assert_eq!(item.decoded_content().unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_empty_file_path_is_rejected_locally() {
        let server = MockServer::start().await;
        let err = client_for(&server).get_file(&repo(), "/").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_root_listing_and_job_logs() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "src", "path": "src", "type": "dir"},
                {"name": "Cargo.toml", "path": "Cargo.toml", "type": "file", "size": 120}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/actions/jobs/55/logs"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"line one\nline two\n".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let listing = client.list_directory(&repo(), "").await.unwrap();
        assert_eq!(listing.len(), 2);
        assert!(!listing[0].is_file());
        assert!(listing[1].is_file());

        let log = client.download_job_logs(&repo(), 55).await.unwrap();
        assert_eq!(log, b"line one\nline two\n".to_vec());
    }

    #[tokio::test]
    async fn test_failed_runs_and_jobs() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/actions/runs"))
            .and(query_param("status", "failure"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "workflow_runs": [{
                    "id": 99,
                    "name": "CI",
                    "html_url": "https://github.com/octo/widgets/actions/runs/99",
                    "created_at": "2024-03-01T10:00:00Z",
                    "head_branch": "main",
                    "head_sha": "abc123",
                    "pull_requests": [{"number": 4}]
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/actions/runs/99/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [
                    {"id": 1, "name": "lint", "conclusion": "success"},
                    {"id": 2, "name": "test", "conclusion": "failure"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let runs = client.list_failed_runs(&repo(), 40).await.unwrap();
        assert_eq!(runs.workflow_runs.len(), 1);
        assert_eq!(runs.workflow_runs[0].pull_requests[0].number, 4);

        let jobs = client.list_run_jobs(&repo(), 99).await.unwrap();
        let failed: Vec<_> = jobs.jobs.iter().filter(|j| j.failed()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, 2);
    }
}
