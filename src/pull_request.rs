//! Pull request compliance: the title or body must reference a work item.
//!
//! This check never creates work item links itself; linking is driven by
//! commit messages only. Its one mutation is the status comment.

use tracing::{debug, info};

use crate::ci;
use crate::cli::Inputs;
use crate::comment;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::refs::{self, WorkItemRef};

/// Single-shot check over the PR title and body.
pub async fn check_pull_request(gh: &GitHubClient, ctx: &Context, inputs: &Inputs) -> Result<()> {
    let pr = gh.pull_request(ctx.pull_number).await?;
    let title = pr.title.unwrap_or_default();
    let body = pr.body.unwrap_or_default();
    let text = format!("{} {}", title, body);

    if !refs::has_reference(&text) {
        let message = format!(
            "The pull request #{} is not linked to any work item(s)",
            ctx.pull_number
        );
        ci::error(&format!("Pull Request not linked to work item(s): {}", message));

        if inputs.comment_on_failure {
            comment::upsert(gh, ctx, &comment::pr_failure_body(), comment::PR_FAILURE_TEXT)
                .await?;
        }

        return Err(Error::MissingReference(message));
    }

    for reference in distinct_refs(&text) {
        info!(
            work_item_id = reference.id,
            token = %reference.raw,
            "pull request linked to work item"
        );
    }

    // A failure comment from an earlier run is rewritten to the success
    // text; if none exists the success path stays silent.
    if comment::update_if_present(gh, ctx, comment::PR_SUCCESS_TEXT, comment::PR_FAILURE_TEXT)
        .await?
    {
        info!("updated failure comment to success");
    } else {
        debug!("no failure comment to update");
    }

    Ok(())
}

/// Distinct references by raw token, first-seen order. Tokens differing
/// only in case count as distinct.
fn distinct_refs(text: &str) -> Vec<WorkItemRef> {
    let mut distinct: Vec<WorkItemRef> = Vec::new();
    for reference in refs::find_all(text) {
        if !distinct.iter().any(|seen| seen.raw == reference.raw) {
            distinct.push(reference);
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> Context {
        Context {
            owner: "octo".to_string(),
            repo: "demo".to_string(),
            pull_number: 7,
            server_url: "https://github.com".to_string(),
            api_url: "https://api.github.com".to_string(),
            run_id: "99".to_string(),
            repository_url: "https://github.com/octo/demo".to_string(),
        }
    }

    fn gh(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&server.uri(), "octo", "demo", "gh-token").unwrap()
    }

    async fn mount_pull_request(server: &MockServer, title: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/pulls/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": title,
                "body": body
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_distinct_refs_dedup_is_case_sensitive() {
        let distinct = distinct_refs("AB#5 ab#5 AB#5 AB#6");
        let tokens: Vec<&str> = distinct.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(tokens, vec!["AB#5", "ab#5", "AB#6"]);
    }

    #[tokio::test]
    async fn linked_pr_updates_a_prior_failure_comment() {
        let server = MockServer::start().await;
        mount_pull_request(&server, "Fix bug", "Closes AB#42").await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 5, "body": format!("{} Please update the title", comment::PR_FAILURE_TEXT) }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octo/demo/issues/comments/5"))
            .and(body_string_contains(":white_check_mark:"))
            .and(body_string_contains("(last ran: "))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 5 })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        check_pull_request(&gh(&server), &ctx(), &Inputs::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn linked_pr_without_prior_comment_stays_silent() {
        let server = MockServer::start().await;
        mount_pull_request(&server, "Fix bug", "Closes AB#42").await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        check_pull_request(&gh(&server), &ctx(), &Inputs::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unlinked_pr_fails_and_comments_when_enabled() {
        let server = MockServer::start().await;
        mount_pull_request(&server, "Fix bug", "no reference anywhere").await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .and(body_string_contains(":x: This pull request is not linked"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 1 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let inputs = Inputs {
            comment_on_failure: true,
            ..Inputs::default()
        };
        let err = check_pull_request(&gh(&server), &ctx(), &inputs)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingReference(ref m) if m.contains("#7")));
    }

    #[tokio::test]
    async fn unlinked_pr_fails_without_commenting_when_disabled() {
        let server = MockServer::start().await;
        mount_pull_request(&server, "Fix bug", "no reference anywhere").await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = check_pull_request(&gh(&server), &ctx(), &Inputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingReference(_)));
    }

    #[tokio::test]
    async fn reference_in_title_alone_passes() {
        let server = MockServer::start().await;
        mount_pull_request(&server, "AB#9 fix the build", "").await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/issues/7/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        check_pull_request(&gh(&server), &ctx(), &Inputs::default())
            .await
            .unwrap();
    }
}
