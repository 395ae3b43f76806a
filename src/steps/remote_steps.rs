use super::{Step, StepContext, StepError};
use crate::client::{ActionRequest, RejectRequest, SubmitRequest};
use crate::task_thread;
use async_trait::async_trait;

pub struct SubmitToServer;

#[async_trait]
impl Step for SubmitToServer {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let commits_count = ctx
            .repo
            .get_status()
            .await
            .map(|s| s.commits_ahead)
            .unwrap_or(0);

        ctx.client
            .submit_task(
                &ctx.task.id,
                &SubmitRequest {
                    pr_url: ctx.task.pr_url.clone(),
                    commits_count,
                    turns_used: ctx.task.turns_used.unwrap_or(0),
                },
            )
            .await?;
        Ok(())
    }
}

pub struct RejectWithFeedback;

#[async_trait]
impl Step for RejectWithFeedback {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let reason = ctx
            .result
            .comment
            .clone()
            .or_else(|| ctx.result.message.clone())
            .unwrap_or_else(|| "rejected without comment".to_string());

        let threads_dir = ctx
            .task_dir
            .parent()
            .and_then(|p| p.parent())
            .map(|root| root.join("shared").join("threads"))
            .unwrap_or_else(|| ctx.task_dir.join("threads"));
        task_thread::post_message(&threads_dir, &ctx.task.id, "rejection", &reason, None)?;

        ctx.client
            .reject_task(
                &ctx.task.id,
                &RejectRequest {
                    reason,
                    rejected_by: ctx.task.role.clone(),
                },
            )
            .await?;
        Ok(())
    }
}

pub struct PostReviewComment;

#[async_trait]
impl Step for PostReviewComment {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let Some(comment) = ctx.result.comment.clone() else {
            return Ok(());
        };
        ctx.client
            .create_action(&ActionRequest {
                entity_type: "task".to_string(),
                entity_id: ctx.task.id.clone(),
                action_type: "review_comment".to_string(),
                label: "Review comment".to_string(),
                description: Some(comment),
                action_data: None,
            })
            .await?;
        Ok(())
    }
}
